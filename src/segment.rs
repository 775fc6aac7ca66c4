// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-capacity byte segments, the unit of storage a [`Buffer`](crate::Buffer)
//! is built from.

use std::cmp::min;
use std::ops::Range;
use std::sync::Arc;

/// The fixed capacity of a segment, in bytes. Not part of the public API: callers
/// must never depend on its exact value, only that it is some implementation
/// constant greater than a few kilobytes.
pub(crate) const SIZE: usize = 8192;

/// Below this many bytes, [`Buffer`](crate::Buffer) copies rather than shares
/// segment data, trading a small copy for avoiding long-lived shared segments
/// that can no longer be written to in place.
pub(crate) const SHARE_MINIMUM: usize = 1024;

/// A fixed-capacity byte container with head (`pos`) and tail (`limit`) indices,
/// backed by a reference-counted array. Content outside `[pos, limit)` is
/// undefined; segments fresh from the [pool](crate::pool) are never zero-filled.
///
/// A segment may be `shared` between multiple holders (other segments, or a
/// [`ByteString`](crate::ByteString) snapshot); a shared segment is read-only.
/// Writing requires unique ownership of the backing array, which this type
/// enforces through [`Arc::get_mut`] rather than a separate `owner` flag: a
/// segment is writable exactly when it is not `shared`.
pub(crate) struct Segment {
	data: Arc<[u8; SIZE]>,
	pos: usize,
	limit: usize,
	shared: bool,
}

impl Segment {
	pub(crate) fn new(data: Arc<[u8; SIZE]>) -> Self {
		Self { data, pos: 0, limit: 0, shared: false }
	}

	/// Number of defined bytes in `[pos, limit)`.
	pub(crate) fn len(&self) -> usize { self.limit - self.pos }

	pub(crate) fn is_empty(&self) -> bool { self.pos == self.limit }

	/// Whether the segment has no room left to grow. Shared segments are always
	/// reported full, since they cannot be written into regardless of `limit`.
	pub(crate) fn is_full(&self) -> bool { self.shared || self.limit == SIZE }

	pub(crate) fn is_shared(&self) -> bool { self.shared }

	pub(crate) fn as_slice(&self) -> &[u8] { &self.data[self.pos..self.limit] }

	/// The raw array indices of this segment's defined range, for mapping a
	/// cursor's local offset into [`Self::raw_mut`].
	pub(crate) fn range(&self) -> Range<usize> { self.pos..self.limit }

	pub(crate) fn get(&self, index: usize) -> Option<u8> {
		self.as_slice().get(index).copied()
	}

	/// Writable capacity remaining in the tail, `0` for shared segments.
	pub(crate) fn free(&self) -> usize {
		if self.shared { 0 } else { SIZE - self.limit }
	}

	/// Appends as much of `buf` as fits, returning the number of bytes written.
	/// Panics if the segment is shared; callers must check [`Self::free`] first.
	pub(crate) fn write(&mut self, buf: &[u8]) -> usize {
		let n = min(self.free(), buf.len());
		let data = Arc::get_mut(&mut self.data).expect(
			"segment marked unshared should be uniquely held"
		);
		data[self.limit..self.limit + n].copy_from_slice(&buf[..n]);
		self.limit += n;
		n
	}

	/// Copies as much of the defined range as fits into `buf`, consuming it.
	pub(crate) fn read(&mut self, buf: &mut [u8]) -> usize {
		let n = min(self.len(), buf.len());
		buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
		self.pos += n;
		n
	}

	/// Consumes up to `count` bytes from the head, returning the number consumed.
	pub(crate) fn consume(&mut self, count: usize) -> usize {
		let n = min(count, self.len());
		self.pos += n;
		n
	}

	/// Truncates the defined range to at most `count` bytes from the head.
	pub(crate) fn truncate(&mut self, count: usize) {
		self.limit = min(self.limit, self.pos + count);
	}

	/// Shares the whole remaining range with a new segment, marking both shared.
	pub(crate) fn share_all(&mut self) -> Self {
		self.shared = true;
		Self { data: self.data.clone(), pos: self.pos, limit: self.limit, shared: true }
	}

	/// Shares the first `count` bytes of the defined range as a new segment,
	/// advancing `self` past them. Both the returned prefix and `self` become
	/// shared, since they now refer to the same backing array.
	///
	/// # Panics
	/// Panics if `count` is not in `1..self.len()`.
	pub(crate) fn split_off_prefix(&mut self, count: usize) -> Self {
		assert!(count > 0 && count < self.len(), "split count must be a proper prefix");
		let prefix = Self {
			data: self.data.clone(),
			pos: self.pos,
			limit: self.pos + count,
			shared: true,
		};
		self.pos += count;
		self.shared = true;
		prefix
	}

	/// Breaks a shared segment into its backing array and defined range, for
	/// building a [`ByteString`](crate::ByteString) snapshot. The segment should
	/// already be marked shared (e.g. via [`Self::share_all`] or
	/// [`Self::split_off_prefix`]) before calling this.
	pub(crate) fn into_range(self) -> (Arc<[u8; SIZE]>, Range<usize>) {
		(self.data, self.pos..self.limit)
	}

	/// Consumes the segment, returning its backing array for recycling if it is
	/// not shared with another holder. The array's content is left as-is; the
	/// pool hands it out again without clearing it.
	pub(crate) fn into_array(self) -> Option<Arc<[u8; SIZE]>> {
		(!self.shared).then_some(self.data)
	}

	/// Shares an arbitrary `[start, end)` raw-array sub-range as a new segment,
	/// marking `self` shared without touching its own `pos`/`limit`. Unlike
	/// [`Self::split_off_prefix`], `self` keeps reading exactly the range it
	/// had before — used by non-consuming reads ([`Buffer::copy_to`],
	/// [`Buffer::snapshot_n`]) that must share data without advancing past it.
	///
	/// [`Buffer::copy_to`]: crate::Buffer::copy_to
	/// [`Buffer::snapshot_n`]: crate::Buffer::snapshot_n
	pub(crate) fn peek_range(&mut self, start: usize, end: usize) -> Self {
		assert!(start <= end && end <= SIZE, "peek_range out of bounds");
		self.shared = true;
		Self { data: self.data.clone(), pos: start, limit: end, shared: true }
	}

	/// Claims `n` bytes of this fresh segment's capacity as defined without
	/// writing anything, for [`crate::cursor::UnsafeCursor`]'s expand/resize
	/// operations, which hand the caller the raw, uninitialized window to
	/// fill directly.
	///
	/// # Panics
	/// Panics if `n > SIZE` or the segment already has content.
	pub(crate) fn claim(&mut self, n: usize) {
		assert_eq!(self.pos, 0, "claim is only for fresh segments");
		assert_eq!(self.limit, 0, "claim is only for fresh segments");
		assert!(n <= SIZE, "claim count exceeds segment capacity");
		self.limit = n;
	}

	/// The full backing array, for direct indexed access by an
	/// [`UnsafeCursor`](crate::cursor::UnsafeCursor). Callers must stay within
	/// `[pos, limit)` when reading defined data, or `[limit, SIZE)` when
	/// filling newly claimed capacity.
	pub(crate) fn raw_mut(&mut self) -> &mut [u8; SIZE] {
		Arc::get_mut(&mut self.data).expect("segment marked unshared should be uniquely held")
	}

	/// Copies this segment's live data into the back of `target`, returning
	/// `true` if all of it fit. Used to compact a small segment into the
	/// previous tail instead of letting it linger as its own segment.
	pub(crate) fn compact_into(&mut self, target: &mut Self) -> bool {
		if target.free() < self.len() { return false }
		let n = target.write(self.as_slice());
		debug_assert_eq!(n, self.len(), "compact target reported enough free space");
		self.pos = self.limit;
		true
	}
}

impl Clone for Segment {
	/// Cloning always produces a shared view; use [`Self::share_all`] when the
	/// intent is specifically to fork off a read-only snapshot, as it also marks
	/// `self` shared (a plain [`Clone`] leaves `self` untouched, which is only
	/// safe when `self` is already shared, e.g. while iterating existing shared
	/// segments of a [`ByteString`](crate::ByteString)).
	fn clone(&self) -> Self {
		Self { data: self.data.clone(), pos: self.pos, limit: self.limit, shared: true }
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;
	use super::*;

	fn fresh() -> Segment { Segment::new(Arc::new([0; SIZE])) }

	#[test]
	fn write_then_read() {
		let mut seg = fresh();
		assert_eq!(seg.write(b"hello"), 5);
		assert_eq!(seg.len(), 5);
		let mut buf = [0; 5];
		assert_eq!(seg.read(&mut buf), 5);
		assert_eq!(&buf, b"hello");
		assert!(seg.is_empty());
	}

	#[test]
	fn split_off_prefix_shares_both_halves() {
		let mut seg = fresh();
		seg.write(b"hello world");
		let prefix = seg.split_off_prefix(5);
		assert_eq!(prefix.as_slice(), b"hello");
		assert_eq!(seg.as_slice(), b" world");
		assert!(prefix.is_shared());
		assert!(seg.is_shared());
	}

	#[test]
	fn compact_into_merges_small_segment() {
		let mut a = fresh();
		a.write(b"abc");
		let mut b = fresh();
		b.write(b"def");
		assert!(b.compact_into(&mut a));
		assert_eq!(a.as_slice(), b"abcdef");
		assert!(b.is_empty());
	}

	#[test]
	fn shared_segment_cannot_report_free_space() {
		let mut a = fresh();
		a.write(b"abc");
		let shared = a.share_all();
		assert_eq!(shared.free(), 0);
		assert_eq!(a.free(), 0);
	}
}
