// SPDX-License-Identifier: Apache-2.0

//! [`Buffer`], an in-memory byte queue built from pooled segments, with typed
//! codecs layered directly on top rather than through a generic
//! encode/decode trait.

use crate::byte_str::ByteString;
use crate::cursor::UnsafeCursor;
use crate::error::{Error, Result};
use crate::options::Options;
use crate::queue::SegmentQueue;
use crate::segment::{SHARE_MINIMUM, SIZE};

/// Below this many bytes, [`Buffer::snapshot_n`] copies into a fresh flat
/// [`ByteString`] rather than sharing segments.
const SNAPSHOT_SHARE_MINIMUM: usize = 4096;

/// Substituted for malformed UTF-8 byte sequences, both when decoding and
/// when asked to encode a code point with no valid UTF-8 representation
/// (e.g. a lone UTF-16 surrogate).
const REPLACEMENT_CHARACTER: char = '\u{FFFD}';

/// A mutable, in-memory byte queue backed by a chain of pooled segments. Acts
/// both as a general-purpose byte buffer and as the intermediate buffer used
/// by [`BufferedReader`](crate::streams::BufferedReader)/
/// [`BufferedWriter`](crate::streams::BufferedWriter).
#[derive(Default)]
pub struct Buffer {
	queue: SegmentQueue,
}

impl Buffer {
	/// Creates an empty buffer.
	pub fn new() -> Self { Self::default() }

	/// Number of bytes currently queued.
	pub fn size(&self) -> usize { self.queue.size() }

	pub fn is_empty(&self) -> bool { self.queue.is_empty() }

	/// Discards all content, recycling every segment.
	pub fn clear(&mut self) { self.queue.clear() }

	/// Discards up to `n` bytes from the front, returning the number actually
	/// discarded (fewer than `n` if the buffer held less).
	pub fn skip(&mut self, n: usize) -> usize { self.queue.consume(n) }

	/// Returns the byte at `position` bytes from the front, without consuming
	/// it, or `None` if `position >= size()`.
	pub fn get_byte(&self, position: usize) -> Option<u8> {
		self.queue.locate(position).and_then(|(seg, local)| seg.get(local))
	}

	/// Appends the bytes of `data` to the tail, growing the queue by as many
	/// fresh segments as needed.
	pub fn write_from_slice(&mut self, data: &[u8]) {
		let mut rest = data;
		while !rest.is_empty() {
			let tail = self.queue.writable_tail();
			let n = tail.write(rest);
			self.queue.grew_tail(n);
			rest = &rest[n..];
		}
	}

	/// Moves `n` bytes from the front of `src` to the tail of `self`. Whole
	/// segments holding at least half of [`SIZE`] bytes of payload are moved
	/// by reassigning ownership (O(1), no copy); smaller or partial segments
	/// are copied byte-for-byte to avoid leaving `self` with a long chain of
	/// tiny segments.
	///
	/// # Errors
	/// Returns an invalid-argument failure if `n > src.size()`.
	pub fn write_from_buffer(&mut self, src: &mut Buffer, n: usize) -> Result<()> {
		if n > src.size() {
			return Err(Error::invalid_argument("write_from_buffer"))
		}

		let mut remaining = n;
		while remaining > 0 {
			let seg_len = src.queue.front().expect("remaining > 0 implies a front segment").len();
			let take = seg_len.min(remaining);

			if take == seg_len && seg_len * 2 >= SIZE {
				let seg = src.queue.pop_front_whole().expect("front segment exists");
				self.queue.push_back(seg);
			} else {
				let mut buf = [0u8; SIZE];
				let seg = src.queue.front_mut().expect("front segment exists");
				buf[..take].copy_from_slice(&seg.as_slice()[..take]);
				src.queue.consume(take);
				self.write_from_slice(&buf[..take]);
			}

			remaining -= take;
		}

		Ok(())
	}

	/// Copies `n` bytes starting at `offset` into `out`, without consuming
	/// them from `self`. Ranges of at least [`SHARE_MINIMUM`] bytes share
	/// segments with `out` (marking the traversed segments shared in both
	/// buffers); smaller ranges are copied.
	///
	/// # Errors
	/// Returns an invalid-argument failure if `offset + n > self.size()`.
	pub fn copy_to(&mut self, out: &mut Buffer, offset: usize, n: usize) -> Result<()> {
		if offset.checked_add(n).map_or(true, |end| end > self.size()) {
			return Err(Error::invalid_argument("copy_to"))
		}

		if n < SHARE_MINIMUM {
			let mut buf = vec![0u8; n];
			for (i, slot) in buf.iter_mut().enumerate() {
				*slot = self.get_byte(offset + i).expect("bounds checked above");
			}
			out.write_from_slice(&buf);
			return Ok(())
		}

		let mut remaining = n;
		let mut pos = offset;
		while remaining > 0 {
			let (seg, local) = self.queue.locate_mut(pos).expect("pos is within the checked range");
			let range = seg.range();
			let avail = range.len() - local;
			let take = avail.min(remaining);
			let shared = seg.peek_range(range.start + local, range.start + local + take);
			out.queue.push_back(shared);
			pos += take;
			remaining -= take;
		}

		Ok(())
	}

	/// A non-consuming snapshot of the whole buffer.
	pub fn snapshot(&mut self) -> ByteString {
		self.snapshot_n(self.size()).expect("size() is always a valid snapshot length")
	}

	/// A non-consuming snapshot of the first `n` bytes. Ranges of at least
	/// [`SNAPSHOT_SHARE_MINIMUM`] bytes share segments; smaller ranges copy.
	///
	/// # Errors
	/// Returns an invalid-argument failure if `n > self.size()`.
	pub fn snapshot_n(&mut self, n: usize) -> Result<ByteString> {
		if n > self.size() {
			return Err(Error::invalid_argument("snapshot_n"))
		}

		if n <= SNAPSHOT_SHARE_MINIMUM {
			let mut data = Vec::with_capacity(n);
			for i in 0..n { data.push(self.get_byte(i).expect("i < n <= size")) }
			return Ok(data.into())
		}

		let mut parts = Vec::new();
		let mut remaining = n;
		let mut offset = 0;
		while remaining > 0 {
			let (seg, _local) = self.queue.locate_mut(offset).expect("offset < n <= size");
			let seg_len = seg.len();
			if remaining >= seg_len {
				parts.push(seg.share_all().into_range());
				offset += seg_len;
				remaining -= seg_len;
			} else {
				let start = seg.range().start;
				let prefix = seg.peek_range(start, start + remaining);
				parts.push(prefix.into_range());
				offset += remaining;
				remaining = 0;
			}
		}
		Ok(ByteString::from_segments(parts, n))
	}

	/// Reads up to `buf.len()` bytes, consuming them, and returns the number
	/// read (fewer than `buf.len()` if the buffer held less).
	pub fn read_into_slice(&mut self, buf: &mut [u8]) -> usize {
		let mut read = 0;
		while read < buf.len() {
			let Some(seg) = self.queue.front() else { break };
			let avail = seg.len();
			if avail == 0 { break }
			let take = avail.min(buf.len() - read);
			buf[read..read + take].copy_from_slice(&seg.as_slice()[..take]);
			self.queue.consume(take);
			read += take;
		}
		read
	}

	/// Consumes and returns the first byte, or `None` if empty.
	pub fn read_byte(&mut self) -> Option<u8> {
		let mut buf = [0u8; 1];
		(self.read_into_slice(&mut buf) == 1).then_some(buf[0])
	}

	/// Consumes exactly `buf.len()` bytes into `buf`.
	///
	/// # Errors
	/// Returns an end-of-input failure if fewer bytes are available, leaving
	/// the buffer untouched.
	pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
		if buf.len() > self.size() {
			return Err(Error::eos("read_exact"))
		}
		let n = self.read_into_slice(buf);
		debug_assert_eq!(n, buf.len());
		Ok(())
	}

	/// Total bytes held in every segment except the tail, for
	/// [`BufferedWriter::emit_complete_segments`](crate::streams::BufferedWriter::emit_complete_segments),
	/// which drains whole segments but always leaves the tail buffered since
	/// a future write may still extend it.
	pub(crate) fn complete_byte_count(&self) -> usize {
		self.queue.size() - self.queue.back().map_or(0, |seg| seg.len())
	}

	/// Returns an [`UnsafeCursor`] borrowing this buffer's segments directly.
	pub fn cursor(&mut self) -> UnsafeCursor<'_> { UnsafeCursor::new(&mut self.queue) }

	/// Returns an independent copy of this buffer's content. Implemented via
	/// [`Self::copy_to`], so large contents share segments rather than copy.
	pub fn clone(&mut self) -> Self {
		let mut out = Self::new();
		let size = self.size();
		self.copy_to(&mut out, 0, size).expect("0..size is always in range");
		out
	}

	/// A second non-consuming view of this buffer's full content. Built the
	/// same way as [`Self::clone`] (via [`Self::copy_to`]), under its own name
	/// for call sites that want to "peek" at what's buffered without
	/// committing to consuming it; the two views always agree in content.
	pub fn peek(&mut self) -> Self {
		let mut out = Self::new();
		let size = self.size();
		self.copy_to(&mut out, 0, size).expect("0..size is always in range");
		out
	}

	// -- fixed-width integer codecs, big-endian only --

	pub fn write_u8(&mut self, value: u8) { self.write_from_slice(&[value]) }
	pub fn write_i8(&mut self, value: i8) { self.write_u8(value as u8) }
	pub fn write_u16(&mut self, value: u16) { self.write_from_slice(&value.to_be_bytes()) }
	pub fn write_i16(&mut self, value: i16) { self.write_from_slice(&value.to_be_bytes()) }
	pub fn write_u32(&mut self, value: u32) { self.write_from_slice(&value.to_be_bytes()) }
	pub fn write_i32(&mut self, value: i32) { self.write_from_slice(&value.to_be_bytes()) }
	pub fn write_u64(&mut self, value: u64) { self.write_from_slice(&value.to_be_bytes()) }
	pub fn write_i64(&mut self, value: i64) { self.write_from_slice(&value.to_be_bytes()) }

	pub fn read_u8(&mut self) -> Result<u8> {
		let mut buf = [0; 1];
		self.read_exact(&mut buf)?;
		Ok(buf[0])
	}

	pub fn read_i8(&mut self) -> Result<i8> { self.read_u8().map(|b| b as i8) }

	pub fn read_u16(&mut self) -> Result<u16> {
		let mut buf = [0; 2];
		self.read_exact(&mut buf)?;
		Ok(u16::from_be_bytes(buf))
	}

	pub fn read_i16(&mut self) -> Result<i16> {
		let mut buf = [0; 2];
		self.read_exact(&mut buf)?;
		Ok(i16::from_be_bytes(buf))
	}

	pub fn read_u32(&mut self) -> Result<u32> {
		let mut buf = [0; 4];
		self.read_exact(&mut buf)?;
		Ok(u32::from_be_bytes(buf))
	}

	pub fn read_i32(&mut self) -> Result<i32> {
		let mut buf = [0; 4];
		self.read_exact(&mut buf)?;
		Ok(i32::from_be_bytes(buf))
	}

	pub fn read_u64(&mut self) -> Result<u64> {
		let mut buf = [0; 8];
		self.read_exact(&mut buf)?;
		Ok(u64::from_be_bytes(buf))
	}

	pub fn read_i64(&mut self) -> Result<i64> {
		let mut buf = [0; 8];
		self.read_exact(&mut buf)?;
		Ok(i64::from_be_bytes(buf))
	}

	// -- UTF-8 --

	/// Writes `s`'s UTF-8 bytes as-is.
	pub fn write_utf8(&mut self, s: &str) { self.write_from_slice(s.as_bytes()) }

	/// Encodes a single code point. `code_point` need not be a valid Unicode
	/// scalar value (e.g. it may be a lone UTF-16 surrogate); any value with
	/// no valid UTF-8 representation is written as the single-byte
	/// replacement marker `0x3F` (`'?'`), matching how a malformed surrogate
	/// pair is handled when re-encoding text of UTF-16 origin.
	pub fn write_utf8_code_point(&mut self, code_point: u32) {
		match char::from_u32(code_point) {
			Some(c) => {
				let mut buf = [0u8; 4];
				self.write_from_slice(c.encode_utf8(&mut buf).as_bytes());
			}
			None => self.write_u8(b'?'),
		}
	}

	/// Reads `byte_count` bytes, decoding them leniently: a malformed
	/// sequence is replaced with [`REPLACEMENT_CHARACTER`] rather than
	/// failing the whole read.
	pub fn read_utf8(&mut self, byte_count: usize) -> Result<String> {
		if byte_count > self.size() {
			return Err(Error::eos("read_utf8"))
		}
		let mut out = String::with_capacity(byte_count);
		let mut remaining = byte_count;
		while remaining > 0 {
			let before = remaining;
			let c = self.read_utf8_code_point_bounded(&mut remaining)?;
			debug_assert!(remaining < before, "read_utf8_code_point_bounded always consumes");
			out.push(c);
		}
		Ok(out)
	}

	/// Reads and decodes exactly one UTF-8 code point, consuming one to four
	/// bytes. A malformed sequence consumes exactly one byte and decodes as
	/// [`REPLACEMENT_CHARACTER`].
	///
	/// # Errors
	/// Returns an end-of-input failure if the buffer is empty.
	pub fn read_utf8_code_point(&mut self) -> Result<char> {
		let mut budget = self.size();
		self.read_utf8_code_point_bounded(&mut budget)
	}

	/// As [`Self::read_utf8_code_point`], but refuses to read past `budget`
	/// bytes (decrementing it by however many bytes were actually consumed),
	/// for [`Self::read_utf8`]'s length-bounded reads.
	fn read_utf8_code_point_bounded(&mut self, budget: &mut usize) -> Result<char> {
		let Some(b0) = self.get_byte(0) else {
			return Err(Error::eos("read_utf8_code_point"))
		};

		let (len, initial) = if b0 < 0x80 {
			(1, b0 as u32)
		} else if b0 & 0xE0 == 0xC0 {
			(2, (b0 & 0x1F) as u32)
		} else if b0 & 0xF0 == 0xE0 {
			(3, (b0 & 0x0F) as u32)
		} else if b0 & 0xF8 == 0xF0 {
			(4, (b0 & 0x07) as u32)
		} else {
			self.skip(1);
			*budget -= 1;
			return Ok(REPLACEMENT_CHARACTER)
		};

		if len > *budget || len > self.size() {
			self.skip(1);
			*budget -= 1;
			return Ok(REPLACEMENT_CHARACTER)
		}

		let mut value = initial;
		for i in 1..len {
			let b = self.get_byte(i).expect("len <= size() checked above");
			if b & 0xC0 != 0x80 {
				self.skip(1);
				*budget -= 1;
				return Ok(REPLACEMENT_CHARACTER)
			}
			value = (value << 6) | (b & 0x3F) as u32;
		}

		let valid = match len {
			1 => true,
			2 => value >= 0x80,
			3 => value >= 0x800 && !(0xD800..=0xDFFF).contains(&value),
			4 => (0x10000..=0x10FFFF).contains(&value),
			_ => unreachable!("len is always in 1..=4"),
		};

		if !valid {
			self.skip(1);
			*budget -= 1;
			return Ok(REPLACEMENT_CHARACTER)
		}

		self.skip(len);
		*budget -= len;
		Ok(char::from_u32(value).unwrap_or(REPLACEMENT_CHARACTER))
	}

	// -- decimal / hex integers --

	pub fn write_decimal_long(&mut self, value: i64) {
		self.write_from_slice(value.to_string().as_bytes())
	}

	/// Parses a base-10 `i64` from the front of the buffer, consuming the
	/// sign (if any) and every following decimal digit, even past overflow.
	///
	/// # Errors
	/// Returns an end-of-input failure if there is no digit at all (an empty
	/// buffer, or a lone sign with nothing after it), or a numeric-format
	/// failure on overflow (the offending digits are still consumed).
	pub fn read_decimal_long(&mut self) -> Result<i64> {
		let negative = self.get_byte(0) == Some(b'-');
		let mut i = if negative { 1 } else { 0 };
		let mut value: i64 = 0;
		let mut any_digit = false;
		let mut overflowed = false;

		while let Some(b) = self.get_byte(i) {
			if !b.is_ascii_digit() { break }
			any_digit = true;
			let digit = (b - b'0') as i64;
			let next = if negative {
				value.checked_mul(10).and_then(|v| v.checked_sub(digit))
			} else {
				value.checked_mul(10).and_then(|v| v.checked_add(digit))
			};
			match next {
				Some(v) => value = v,
				None => overflowed = true,
			}
			i += 1;
		}

		if !any_digit {
			return Err(Error::eos("read_decimal_long"))
		}
		if overflowed {
			self.skip(i);
			return Err(Error::numeric_format("read_decimal_long"))
		}
		self.skip(i);
		Ok(value)
	}

	pub fn write_hex_unsigned_long(&mut self, value: u64) {
		self.write_from_slice(format!("{value:x}").as_bytes())
	}

	/// Parses an unsigned hex `u64` from the front of the buffer, reading at
	/// most 16 hex digits; a 17th digit is left unconsumed as the start of
	/// whatever follows the number.
	///
	/// # Errors
	/// Returns an end-of-input failure if there is no hex digit at all.
	pub fn read_hex_unsigned_long(&mut self) -> Result<u64> {
		let mut value: u64 = 0;
		let mut i = 0;
		while i < 16 {
			let Some(b) = self.get_byte(i) else { break };
			let Some(digit) = (b as char).to_digit(16) else { break };
			value = (value << 4) | digit as u64;
			i += 1;
		}
		if i == 0 {
			return Err(Error::eos("read_hex_unsigned_long"))
		}
		self.skip(i);
		Ok(value)
	}

	// -- line scanning --

	/// Reads a line terminated by `\n` or `\r\n` (the terminator is consumed
	/// but not included in the result), or the whole remaining buffer if no
	/// terminator is found. Returns `None` only if the buffer is already
	/// empty.
	pub fn read_line(&mut self) -> Option<String> {
		if self.is_empty() { return None }
		match self.index_of_byte(b'\n', 0, self.size()) {
			Some(newline) => Some(self.take_line(newline).expect("newline within size()")),
			None => {
				let all = self.size();
				Some(self.read_utf8(all).expect("all <= size()"))
			}
		}
	}

	/// As [`Self::read_line`], but fails instead of returning a partial line
	/// when no terminator is present before `limit` raw bytes (not counting
	/// the terminator) have been scanned.
	///
	/// # Errors
	/// Returns an end-of-input failure if no `\n` is found strictly before
	/// position `limit`. In particular, `limit == 0` always fails, even if
	/// the very next byte is `\n`: a zero-length scan window can never
	/// contain a terminator.
	pub fn read_line_strict(&mut self, limit: usize) -> Result<String> {
		let window = limit.saturating_add(2).min(self.size());
		if let Some(newline) = self.index_of_byte(b'\n', 0, window) {
			if newline < limit {
				return self.take_line(newline)
			}
		}
		Err(Error::eos("read_line_strict"))
	}

	/// As [`Self::read_line_strict`] with no limit (bounded only by how much
	/// data the buffer holds).
	pub fn read_line_strict_unlimited(&mut self) -> Result<String> {
		self.read_line_strict(self.size())
	}

	/// Consumes and decodes the line content ending at raw offset `newline`
	/// (the position of `\n` itself), stripping a preceding `\r` if present,
	/// then consumes the terminator.
	fn take_line(&mut self, newline: usize) -> Result<String> {
		let mut content_len = newline;
		if newline > 0 && self.get_byte(newline - 1) == Some(b'\r') {
			content_len -= 1;
		}
		let line = self.read_utf8(content_len)?;
		self.skip(newline - content_len + 1);
		Ok(line)
	}

	// -- search --

	/// Index of the first occurrence of `byte` in `[start, end)`, or `None`.
	pub fn index_of_byte(&self, byte: u8, start: usize, end: usize) -> Option<usize> {
		let end = end.min(self.size());
		if start >= end { return None }

		let mut base = 0;
		for seg in self.queue.iter() {
			let len = seg.len();
			let seg_end = base + len;
			if seg_end > start {
				let local_start = start.saturating_sub(base);
				let local_end = len.min(end.saturating_sub(base));
				if local_start < local_end {
					if let Some(pos) = seg.as_slice()[local_start..local_end].iter().position(|&b| b == byte) {
						return Some(base + local_start + pos)
					}
				}
			}
			base = seg_end;
			if base >= end { break }
		}
		None
	}

	/// Index of the first occurrence of `pattern` at or after `start`, using
	/// the Knuth-Morris-Pratt failure table so the search never backtracks
	/// across a segment boundary, or `None` if not found.
	pub fn index_of_bytes(&self, pattern: &ByteString, start: usize) -> Option<usize> {
		if pattern.is_empty() { return Some(start.min(self.size())) }

		let needle = pattern.to_vec();
		let table = pattern.kmp_failure_table();
		let mut matched = 0;

		for i in start..self.size() {
			let b = self.get_byte(i)?;
			while matched > 0 && needle[matched] != b { matched = table[matched - 1] }
			if needle[matched] == b { matched += 1 }
			if matched == needle.len() {
				return Some(i + 1 - matched)
			}
		}
		None
	}

	/// Whether `other` occurs verbatim at `offset`, without materializing
	/// either side into a contiguous buffer.
	pub fn range_equals(&self, offset: usize, other: &[u8]) -> bool {
		let len = other.len();
		if offset.checked_add(len).map_or(true, |end| end > self.size()) {
			return false
		}

		let mut remaining = other;
		let mut pos = offset;
		while !remaining.is_empty() {
			let Some((seg, local)) = self.queue.locate(pos) else { return false };
			let avail = seg.len() - local;
			let take = avail.min(remaining.len());
			if seg.as_slice()[local..local + take] != remaining[..take] {
				return false
			}
			remaining = &remaining[take..];
			pos += take;
		}
		true
	}

	/// Matches the head of the buffer against a compiled [`Options`] trie,
	/// consuming the winning entry's bytes and returning its index, or
	/// leaving the buffer untouched and returning `None` if nothing matches.
	pub fn select(&mut self, options: &Options) -> Option<usize> {
		let (index, consumed) = options.select(|i| self.get_byte(i))?;
		self.skip(consumed);
		Some(index)
	}
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;
	use quickcheck_macros::quickcheck;
	use crate::byte_str::ByteString;
	use crate::options::Options;
	use crate::segment::SIZE;
	use super::Buffer;

	#[test]
	fn write_then_read_round_trips() {
		let mut buf = Buffer::new();
		buf.write_from_slice(b"hello world");
		assert_eq!(buf.size(), 11);
		let mut out = [0u8; 11];
		buf.read_exact(&mut out).unwrap();
		assert_eq!(&out, b"hello world");
		assert!(buf.is_empty());
	}

	#[test]
	fn write_from_buffer_moves_whole_large_segments_by_identity() {
		let mut a = Buffer::new();
		let payload = vec![7u8; 20_000];
		a.write_from_slice(&payload);

		let mut b = Buffer::new();
		b.write_from_buffer(&mut a, 20_000).unwrap();

		assert_eq!(b.size(), 20_000);
		assert_eq!(a.size(), 0);
		assert_eq!(b.snapshot().to_vec(), payload);
	}

	#[test]
	fn snapshot_is_independent_of_later_writes() {
		let mut a = Buffer::new();
		a.write_from_slice(&vec![1u8; SIZE + 10]);
		let snap = a.snapshot();
		a.write_from_slice(b"more");
		assert_eq!(snap.len(), SIZE + 10);
		assert!(snap.to_vec().iter().all(|&b| b == 1));
	}

	#[test]
	fn copy_to_does_not_consume_source() {
		const N: usize = 2048;
		let mut a = Buffer::new();
		a.write_from_slice(&vec![9u8; N]);
		let mut out = Buffer::new();
		a.copy_to(&mut out, 0, N).unwrap();
		assert_eq!(a.size(), N);
		assert_eq!(out.size(), N);
	}

	#[test]
	fn big_endian_round_trip() {
		let mut buf = Buffer::new();
		buf.write_i32(-42);
		buf.write_u64(0xdead_beef_0bad_f00d);
		assert_eq!(buf.read_i32().unwrap(), -42);
		assert_eq!(buf.read_u64().unwrap(), 0xdead_beef_0bad_f00d);
	}

	#[test]
	fn read_decimal_long_handles_i64_min() {
		let mut buf = Buffer::new();
		buf.write_decimal_long(i64::MIN);
		assert_eq!(buf.read_decimal_long().unwrap(), i64::MIN);
	}

	#[test]
	fn read_decimal_long_overflow_consumes_and_fails() {
		let mut buf = Buffer::new();
		buf.write_from_slice(b"-9223372036854775809 rest");
		assert!(buf.read_decimal_long().is_err());
		assert_eq!(buf.read_utf8(5).unwrap(), " rest");
	}

	#[test]
	fn read_hex_unsigned_long_stops_at_seventeenth_digit() {
		let mut buf = Buffer::new();
		buf.write_from_slice(b"ffffffffffffffff7");
		assert_eq!(buf.read_hex_unsigned_long().unwrap(), u64::MAX);
		assert_eq!(buf.read_utf8(1).unwrap(), "7");
	}

	#[test]
	fn read_utf8_code_point_replaces_overlong_encoding() {
		let mut buf = Buffer::new();
		buf.write_from_slice(&[0xC0, 0x80]);
		assert_eq!(buf.read_utf8_code_point().unwrap(), '\u{FFFD}');
		assert_eq!(buf.size(), 1);
	}

	#[test]
	fn write_utf8_code_point_replaces_lone_surrogate() {
		let mut buf = Buffer::new();
		buf.write_utf8_code_point(0xD800);
		assert_eq!(buf.read_utf8(1).unwrap(), "?");
	}

	#[test]
	fn read_line_strict_limit_zero_always_fails() {
		let mut buf = Buffer::new();
		buf.write_from_slice(b"\n");
		assert!(buf.read_line_strict(0).is_err());
	}

	#[test]
	fn read_line_splits_on_crlf_and_trailing_partial() {
		let mut buf = Buffer::new();
		buf.write_from_slice(b"first\r\nsecond");
		assert_eq!(buf.read_line().unwrap(), "first");
		assert_eq!(buf.read_line().unwrap(), "second");
		assert!(buf.read_line().is_none());
	}

	#[test]
	fn index_of_bytes_finds_pattern_across_segments() {
		let mut buf = Buffer::new();
		buf.write_from_slice(&vec![0u8; SIZE - 2]);
		buf.write_from_slice(b"NEEDLE");
		let needle: ByteString = b"NEEDLE".to_vec().into();
		assert_eq!(buf.index_of_bytes(&needle, 0), Some(SIZE - 2));
	}

	#[test]
	fn range_equals_checks_without_materializing() {
		let mut buf = Buffer::new();
		buf.write_from_slice(b"hello world");
		assert!(buf.range_equals(6, b"world"));
		assert!(!buf.range_equals(6, b"earth"));
	}

	#[test]
	fn select_matches_deepest_option_and_consumes() {
		let mut buf = Buffer::new();
		buf.write_from_slice(b"width=640");
		let options = Options::compile([
			ByteString::from(&b"depth="[..]),
			ByteString::from(&b"width="[..]),
		]);
		assert_eq!(buf.select(&options), Some(1));
		assert_eq!(buf.read_utf8(3).unwrap(), "640");
	}

	#[quickcheck]
	fn write_then_read_is_identity(data: Vec<u8>) -> bool {
		let mut buf = Buffer::new();
		buf.write_from_slice(&data);
		let mut out = vec![0u8; data.len()];
		buf.read_exact(&mut out).is_ok() && out == data
	}

	#[quickcheck]
	fn copy_and_peek_agree_without_mutating_source(data: Vec<u8>, k: usize) -> bool {
		let mut buf = Buffer::new();
		buf.write_from_slice(&data);
		let before = buf.snapshot().to_vec();

		let k = k % (buf.size() + 1);

		let mut copy = buf.clone();
		let mut peeked = buf.peek();
		copy.skip(k);
		peeked.skip(k);

		copy.snapshot().to_vec() == peeked.snapshot().to_vec() && buf.snapshot().to_vec() == before
	}
}
