// SPDX-License-Identifier: Apache-2.0

//! [`UnsafeCursor`], a transient handle exposing one segment's internal
//! `(data, pos, limit)` at a time for in-place inspection or direct writes.
//!
//! Unlike the cursor this is modeled on, which hands out a raw pointer so a
//! single cursor instance can outlive the borrow checker's view of the
//! buffer, this cursor borrows its [`SegmentQueue`] for its entire lifetime.
//! That borrow is exactly the invariant the original contract asks the
//! caller to uphold by convention ("do not touch the buffer through any path
//! other than the cursor while it's open") — here it's enforced by the type
//! system instead of documentation, with no unsafe code required to get the
//! same zero-copy segment access.

use crate::error::{Error, Result};
use crate::queue::SegmentQueue;
use crate::segment::SIZE;

/// A handle onto one segment of a [`Buffer`](crate::Buffer)'s storage at a
/// time. See the module documentation for how this diverges from a literal
/// unsafe-pointer cursor while preserving its access pattern.
pub struct UnsafeCursor<'a> {
	queue: &'a mut SegmentQueue,
	/// Absolute offset where the currently addressed segment begins, or
	/// `None` before the first [`Self::seek`]/past the last segment.
	segment_start: Option<usize>,
}

impl<'a> UnsafeCursor<'a> {
	pub(crate) fn new(queue: &'a mut SegmentQueue) -> Self {
		Self { queue, segment_start: None }
	}

	/// Repositions the cursor to the segment containing `offset`, returning
	/// the number of bytes readable from `offset` to that segment's end (at
	/// least 1), or `-1` if `offset` is the buffer's size (no more data).
	///
	/// # Errors
	/// Returns an invalid-argument failure if `offset` is out of `[0, size]`.
	pub fn seek(&mut self, offset: usize) -> Result<isize> {
		let size = self.queue.size();
		if offset > size {
			return Err(Error::invalid_argument("cursor seek"))
		}
		if offset == size {
			self.segment_start = None;
			return Ok(-1)
		}

		let local = self.queue.locate(offset).map(|(_, local)| local)
			.expect("offset < size implies a containing segment");
		self.segment_start = Some(offset - local);
		let readable = self.current_len() - local;
		Ok(readable as isize)
	}

	/// Advances to the segment following the one currently addressed,
	/// returning the number of bytes readable there, or `-1` once the tail
	/// is passed. Returns `-1` on every call thereafter until the next
	/// [`Self::seek`] (one-shot, not auto-resetting).
	pub fn next(&mut self) -> isize {
		let Some(start) = self.segment_start else { return -1 };
		let next_start = start + self.current_len();
		match self.seek(next_start) {
			Ok(n) => n,
			Err(_) => -1,
		}
	}

	fn current_len(&self) -> usize {
		let start = self.segment_start.expect("no segment currently addressed");
		self.queue.locate(start).map(|(seg, _)| seg.len())
			.expect("segment_start always names a live segment")
	}

	/// The currently addressed segment's defined byte range (`[pos, limit)`),
	/// for read-only inspection.
	///
	/// # Panics
	/// Panics if no segment is currently addressed (call [`Self::seek`] first).
	pub fn data(&self) -> &[u8] {
		let start = self.segment_start.expect("cursor has no segment addressed; call seek first");
		self.queue.locate(start).map(|(seg, _)| seg.as_slice())
			.expect("segment_start always names a live segment")
	}

	/// Mutable access to the currently addressed segment's defined range, for
	/// in-place edits (e.g. masking bytes already written).
	///
	/// # Panics
	/// Panics if no segment is currently addressed.
	pub fn data_mut(&mut self) -> &mut [u8] {
		let start = self.segment_start.expect("cursor has no segment addressed; call seek first");
		let (seg, local) = self.queue.locate_mut(start).expect("segment_start always names a live segment");
		let range = seg.range();
		&mut seg.raw_mut()[(range.start + local)..range.end]
	}

	/// Absolute offset of the first byte in [`Self::data`], within the whole
	/// buffer.
	pub fn segment_start(&self) -> Option<usize> { self.segment_start }

	/// Grows the buffer by appending a fresh segment with at least
	/// `min_byte_count` bytes of claimed (uninitialized) capacity, at most
	/// [`SIZE`] bytes, and positions the cursor at its start. The caller must
	/// fill the returned capacity (inspectable via [`Self::data_mut`]) before
	/// releasing the cursor.
	///
	/// # Errors
	/// Returns an invalid-argument failure if `min_byte_count` is zero or
	/// exceeds the segment capacity.
	pub fn expand_buffer(&mut self, min_byte_count: usize) -> Result<usize> {
		if min_byte_count == 0 || min_byte_count > SIZE {
			return Err(Error::invalid_argument("cursor expand_buffer"))
		}
		let start = self.queue.size();
		self.queue.append_claimed(SIZE);
		self.segment_start = Some(start);
		Ok(SIZE)
	}

	/// Enlarges or truncates the buffer at the tail to `new_size`. Growth
	/// claims uninitialized capacity exactly like [`Self::expand_buffer`];
	/// the caller must fill it before releasing the cursor.
	pub fn resize_buffer(&mut self, new_size: usize) {
		let size = self.queue.size();
		if new_size > size {
			self.queue.grow_to(new_size);
		} else if new_size < size {
			self.queue.shrink_to(new_size);
		}
	}
}

#[cfg(test)]
mod test {
	use crate::queue::SegmentQueue;
	use super::UnsafeCursor;

	#[test]
	fn seek_past_end_returns_negative_one() {
		let mut queue = SegmentQueue::new();
		queue.writable_tail().write(b"abc");
		queue.grew_tail(3);

		let mut cursor = UnsafeCursor::new(&mut queue);
		assert_eq!(cursor.seek(3).unwrap(), -1);
		assert_eq!(cursor.next(), -1);
	}

	#[test]
	fn seek_then_read_segment_data() {
		let mut queue = SegmentQueue::new();
		queue.writable_tail().write(b"hello");
		queue.grew_tail(5);

		let mut cursor = UnsafeCursor::new(&mut queue);
		let readable = cursor.seek(2).unwrap();
		assert_eq!(readable, 3);
		assert_eq!(cursor.data(), b"hello");
	}

	#[test]
	fn expand_buffer_rejects_oversized_request() {
		let mut queue = SegmentQueue::new();
		let mut cursor = UnsafeCursor::new(&mut queue);
		assert!(cursor.expand_buffer(crate::segment::SIZE + 1).is_err());
	}

	#[test]
	fn expand_buffer_grows_and_positions_cursor() {
		let mut queue = SegmentQueue::new();
		let mut cursor = UnsafeCursor::new(&mut queue);
		let added = cursor.expand_buffer(10).unwrap();
		assert_eq!(added, crate::segment::SIZE);
		assert_eq!(cursor.segment_start(), Some(0));
		cursor.data_mut()[..10].copy_from_slice(&[1; 10]);
	}

	#[test]
	fn resize_buffer_shrinks_tail() {
		let mut queue = SegmentQueue::new();
		queue.writable_tail().write(b"hello world");
		queue.grew_tail(11);

		let mut cursor = UnsafeCursor::new(&mut queue);
		cursor.resize_buffer(5);
		assert_eq!(queue.size(), 5);
	}
}
