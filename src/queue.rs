// SPDX-License-Identifier: Apache-2.0

//! [`SegmentQueue`], the ordered run of [`Segment`]s backing one [`Buffer`].
//!
//! Segments are kept in a [`VecDeque`] rather than an intrusive linked list:
//! `push_back`/`pop_front` are O(1), which is all the segmented-transfer
//! algorithms in [`crate::buffer`] need, without requiring unsafe pointer
//! splicing to get there.

use std::collections::VecDeque;
use crate::pool;
use crate::segment::{Segment, SIZE};

/// A queue of segments composing one buffer's storage, with an externally
/// observable `size` equal to the sum of each segment's defined byte range.
#[derive(Default)]
pub(crate) struct SegmentQueue {
	segments: VecDeque<Segment>,
	size: usize,
}

impl SegmentQueue {
	pub(crate) fn new() -> Self { Self::default() }

	/// Total number of defined bytes across all segments.
	pub(crate) fn size(&self) -> usize { self.size }

	pub(crate) fn is_empty(&self) -> bool { self.size == 0 }

	pub(crate) fn iter(&self) -> impl Iterator<Item = &Segment> { self.segments.iter() }

	pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Segment> { self.segments.iter_mut() }

	pub(crate) fn front(&self) -> Option<&Segment> { self.segments.front() }

	pub(crate) fn front_mut(&mut self) -> Option<&mut Segment> { self.segments.front_mut() }

	pub(crate) fn back(&self) -> Option<&Segment> { self.segments.back() }

	/// Returns the tail segment, claiming a fresh one from the pool first if
	/// there isn't one or the current tail has no room left (including because
	/// it's shared).
	pub(crate) fn writable_tail(&mut self) -> &mut Segment {
		if self.segments.back().map_or(true, Segment::is_full) {
			self.segments.push_back(pool::take());
		}
		self.segments.back_mut().expect("just pushed a tail segment")
	}

	/// Records that `n` bytes were written directly into the tail returned by
	/// [`Self::writable_tail`].
	pub(crate) fn grew_tail(&mut self, n: usize) { self.size += n; }

	/// Removes and returns the whole head segment, e.g. to move it directly
	/// into another queue's tail by ownership reassignment.
	pub(crate) fn pop_front_whole(&mut self) -> Option<Segment> {
		let seg = self.segments.pop_front()?;
		self.size -= seg.len();
		Some(seg)
	}

	/// Removes the head segment, recycling it and shrinking `size`.
	fn drop_front(&mut self) {
		if let Some(seg) = self.segments.pop_front() {
			self.size -= seg.len();
			pool::recycle(seg);
		}
	}

	/// Consumes up to `count` bytes from the head of the queue, recycling any
	/// segment that becomes empty. Returns the number of bytes consumed.
	pub(crate) fn consume(&mut self, mut count: usize) -> usize {
		let mut consumed = 0;
		while count > 0 {
			let Some(seg) = self.segments.front_mut() else { break };
			let n = seg.consume(count);
			if n == 0 { break }
			consumed += n;
			count -= n;
			if seg.is_empty() { self.drop_front() } else { break }
		}
		self.size -= consumed;
		consumed
	}

	/// Discards all segments, recycling each.
	pub(crate) fn clear(&mut self) {
		while !self.segments.is_empty() { self.drop_front() }
	}

	/// Pushes `seg` to the back of the queue. Empty segments are recycled
	/// immediately. A non-empty, unshared segment is first offered to the
	/// current tail via [`Segment::compact_into`], coalescing small transferred
	/// segments instead of letting them linger as their own queue entries.
	pub(crate) fn push_back(&mut self, mut seg: Segment) {
		let len = seg.len();
		if len == 0 {
			pool::recycle(seg);
			return
		}

		if !seg.is_shared() {
			if let Some(prev) = self.segments.back_mut() {
				if !prev.is_shared() && seg.compact_into(prev) {
					self.size += len;
					pool::recycle(seg);
					return
				}
			}
		}

		self.size += len;
		self.segments.push_back(seg);
	}

	/// Pushes `seg` to the front of the queue, e.g. to return a segment taken
	/// from the front that turned out not to be fully consumable.
	pub(crate) fn push_front(&mut self, seg: Segment) {
		self.size += seg.len();
		self.segments.push_front(seg);
	}

	/// Finds the segment containing absolute byte offset `offset`, along with
	/// that segment's local offset. Walks from the head; not intended for
	/// repeated random access.
	pub(crate) fn locate(&self, mut offset: usize) -> Option<(&Segment, usize)> {
		for seg in &self.segments {
			let len = seg.len();
			if offset < len {
				return Some((seg, offset))
			}
			offset -= len;
		}
		None
	}

	/// As [`Self::locate`], but mutable — for [`crate::cursor::UnsafeCursor`].
	pub(crate) fn locate_mut(&mut self, mut offset: usize) -> Option<(&mut Segment, usize)> {
		for seg in self.segments.iter_mut() {
			let len = seg.len();
			if offset < len {
				return Some((seg, offset))
			}
			offset -= len;
		}
		None
	}

	/// Appends a single fresh segment with `n` bytes of claimed (uninitialized)
	/// capacity, without attempting compaction with the previous tail — used
	/// by [`crate::cursor::UnsafeCursor::expand_buffer`], which must land the
	/// cursor on a specific, newly added segment.
	pub(crate) fn append_claimed(&mut self, n: usize) {
		let mut seg = pool::take();
		seg.claim(n);
		self.size += n;
		self.segments.push_back(seg);
	}

	/// Grows the queue to `new_size` by claiming fresh, uninitialized capacity
	/// at the tail.
	///
	/// # Panics
	/// Panics if `new_size < self.size()`.
	pub(crate) fn grow_to(&mut self, new_size: usize) {
		assert!(new_size >= self.size, "grow_to requires a larger size");
		while self.size < new_size {
			let claim = (new_size - self.size).min(SIZE);
			self.append_claimed(claim);
		}
	}

	/// Shrinks the queue to `new_size`, recycling whole segments from the
	/// tail and truncating the last remaining one as needed.
	///
	/// # Panics
	/// Panics if `new_size > self.size()`.
	pub(crate) fn shrink_to(&mut self, new_size: usize) {
		assert!(new_size <= self.size, "shrink_to requires a smaller size");
		let mut excess = self.size - new_size;
		while excess > 0 {
			let back_len = self.segments.back().map_or(0, Segment::len);
			if back_len <= excess {
				let seg = self.segments.pop_back().expect("excess implies a tail segment exists");
				excess -= back_len;
				pool::recycle(seg);
			} else {
				let seg = self.segments.back_mut().expect("excess implies a tail segment exists");
				seg.truncate(back_len - excess);
				excess = 0;
			}
		}
		self.size = new_size;
	}
}

impl Drop for SegmentQueue {
	fn drop(&mut self) { self.clear() }
}

#[cfg(test)]
mod test {
	use std::sync::Arc;
	use crate::segment::{Segment, SIZE};
	use super::SegmentQueue;

	#[test]
	fn push_and_consume_round_trip() {
		let mut q = SegmentQueue::new();
		q.writable_tail().write(b"hello");
		q.grew_tail(5);
		assert_eq!(q.size(), 5);
		assert_eq!(q.consume(3), 3);
		assert_eq!(q.size(), 2);
		assert_eq!(q.consume(10), 2);
		assert!(q.is_empty());
	}

	#[test]
	fn push_back_compacts_small_segments() {
		let mut q = SegmentQueue::new();
		q.writable_tail().write(b"abc");
		q.grew_tail(3);

		let mut extra = Segment::new(Arc::new([0; SIZE]));
		extra.write(b"def");
		q.push_back(extra);

		assert_eq!(q.size(), 6);
		let (seg, off) = q.locate(0).unwrap();
		assert_eq!(off, 0);
		assert_eq!(seg.as_slice(), b"abcdef");
	}
}
