// SPDX-License-Identifier: Apache-2.0

//! [`ByteString`], an immutable byte sequence that may borrow segments still
//! live in a [`Buffer`](crate::Buffer), and [`Utf8`], a `ByteString` known to
//! be valid UTF-8.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hasher;
use std::ops::Range;
use std::sync::Arc;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use once_cell::sync::OnceCell;
use simdutf8::compat::from_utf8;
use crate::error::OffsetUtf8Error;
use crate::segment::SIZE;

/// Below this many bytes, a [`ByteString::substring`] view copies into a fresh
/// array rather than sharing the parent's backing storage.
const SHARE_MINIMUM: usize = 1024;

#[derive(Clone)]
enum Repr {
	/// A private, contiguous array (or a view into one produced by
	/// [`ByteString::substring`]).
	Flat(Arc<[u8]>, Range<usize>),
	/// A snapshot of one or more shared segment arrays, with a parallel
	/// cumulative-offset directory for O(log n) random access.
	Segmented(Arc<[(Arc<[u8; SIZE]>, Range<usize>)]>, Arc<[usize]>, usize),
}

/// An immutable sequence of bytes. May be a private, flat array, or a
/// zero-copy snapshot of segments still referenced by a live
/// [`Buffer`](crate::Buffer) — writing to those segments elsewhere triggers
/// copy-on-write there, never mutating this snapshot.
#[derive(Clone)]
pub struct ByteString {
	repr: Repr,
	hash: OnceCell<i32>,
	utf8: OnceCell<Arc<str>>,
}

impl ByteString {
	/// An empty byte string.
	pub fn empty() -> Self { Self::from(Vec::new()) }

	pub(crate) fn from_segments(
		parts: Vec<(Arc<[u8; SIZE]>, Range<usize>)>,
		len: usize,
	) -> Self {
		let mut offsets = Vec::with_capacity(parts.len());
		let mut acc = 0;
		for (_, range) in &parts {
			offsets.push(acc);
			acc += range.len();
		}
		debug_assert_eq!(acc, len);
		Self {
			repr: Repr::Segmented(parts.into(), offsets.into(), len),
			hash: OnceCell::new(),
			utf8: OnceCell::new(),
		}
	}

	/// Number of bytes in the byte string.
	pub fn len(&self) -> usize {
		match &self.repr {
			Repr::Flat(_, range) => range.len(),
			Repr::Segmented(_, _, len) => *len,
		}
	}

	pub fn is_empty(&self) -> bool { self.len() == 0 }

	/// The byte at `index`, or `None` if out of bounds.
	pub fn get(&self, index: usize) -> Option<u8> {
		if index >= self.len() { return None }
		match &self.repr {
			Repr::Flat(data, range) => Some(data[range.start + index]),
			Repr::Segmented(parts, offsets, _) => {
				let part = offsets.partition_point(|&o| o <= index) - 1;
				let (data, range) = &parts[part];
				Some(data[range.start + (index - offsets[part])])
			}
		}
	}

	/// Iterates the underlying contiguous chunks, in order. A `Flat` string
	/// yields exactly one chunk; a `Segmented` string yields one per segment.
	pub(crate) fn chunks(&self) -> Box<dyn Iterator<Item = &[u8]> + '_> {
		match &self.repr {
			Repr::Flat(data, range) => Box::new(std::iter::once(&data[range.clone()])),
			Repr::Segmented(parts, ..) => Box::new(
				parts.iter().map(|(data, range)| &data[range.clone()])
			),
		}
	}

	/// Copies the byte string into a contiguous, owned `Vec<u8>`.
	pub fn to_vec(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(self.len());
		for chunk in self.chunks() { out.extend_from_slice(chunk) }
		out
	}

	/// Returns the data as a contiguous slice, materializing a copy only if
	/// this byte string is segment-backed.
	pub fn as_contiguous(&self) -> std::borrow::Cow<'_, [u8]> {
		match &self.repr {
			Repr::Flat(data, range) => std::borrow::Cow::Borrowed(&data[range.clone()]),
			Repr::Segmented(..) => std::borrow::Cow::Owned(self.to_vec()),
		}
	}

	/// Java-`String`-compatible polynomial hash (`31·h + b`), computed once
	/// and cached.
	pub fn hash_code(&self) -> i32 {
		*self.hash.get_or_init(|| {
			let mut h: i32 = 0;
			for chunk in self.chunks() {
				for &b in chunk {
					h = h.wrapping_mul(31).wrapping_add(b as i32);
				}
			}
			h
		})
	}

	/// Feeds the byte content through an arbitrary [`Hasher`], e.g. for use as
	/// a key in a [`std::collections::HashMap`] with a non-default hasher.
	pub fn hash_contents<H: Hasher>(&self, hasher: &mut H) {
		for chunk in self.chunks() { hasher.write(chunk) }
	}

	/// Decodes the bytes as UTF-8, caching the result on first call.
	pub fn decode_to_utf8(&self) -> Result<Arc<str>, OffsetUtf8Error> {
		if let Some(cached) = self.utf8.get() {
			return Ok(cached.clone())
		}

		let mut owned = String::with_capacity(self.len());
		let mut offset = 0;
		for chunk in self.chunks() {
			let s = from_utf8(chunk).map_err(|e| OffsetUtf8Error::new(e, offset))?;
			owned.push_str(s);
			offset += chunk.len();
		}

		let arc: Arc<str> = owned.into();
		Ok(self.utf8.get_or_init(|| arc).clone())
	}

	fn ascii_case_identity(&self, opposite: impl Fn(u8) -> bool) -> bool {
		self.chunks().flatten().all(|&b| !opposite(b))
	}

	/// Returns a lowercased copy, or `self` unchanged (no allocation) if no
	/// uppercase ASCII letter is present.
	pub fn to_ascii_lowercase(&self) -> Self {
		if self.ascii_case_identity(u8::is_ascii_uppercase) {
			return self.clone()
		}
		let mut data = self.to_vec();
		data.make_ascii_lowercase();
		data.into()
	}

	/// Returns an uppercased copy, or `self` unchanged (no allocation) if no
	/// lowercase ASCII letter is present.
	pub fn to_ascii_uppercase(&self) -> Self {
		if self.ascii_case_identity(u8::is_ascii_lowercase) {
			return self.clone()
		}
		let mut data = self.to_vec();
		data.make_ascii_uppercase();
		data.into()
	}

	/// A view over `[start, end)`. Below [`SHARE_MINIMUM`] bytes, copies into
	/// a fresh flat array; otherwise shares the parent's backing storage.
	///
	/// # Panics
	/// Panics if the range is out of bounds or `start > end`.
	pub fn substring(&self, start: usize, end: usize) -> Self {
		assert!(start <= end && end <= self.len(), "substring range out of bounds");
		let sub_len = end - start;

		if sub_len < SHARE_MINIMUM {
			let mut data = Vec::with_capacity(sub_len);
			for i in start..end { data.push(self.get(i).unwrap()) }
			return data.into()
		}

		match &self.repr {
			Repr::Flat(data, range) => Self {
				repr: Repr::Flat(data.clone(), (range.start + start)..(range.start + end)),
				hash: OnceCell::new(),
				utf8: OnceCell::new(),
			},
			Repr::Segmented(parts, offsets, _) => {
				let first = offsets.partition_point(|&o| o <= start) - 1;
				let last = offsets.partition_point(|&o| o < end) - 1;
				let mut new_parts = Vec::with_capacity(last - first + 1);
				for (i, (data, range)) in parts[first..=last].iter().enumerate() {
					let part_idx = first + i;
					let part_start = range.start + start.saturating_sub(offsets[part_idx]).min(range.len());
					let part_end = range.start + (end - offsets[part_idx]).min(range.len());
					new_parts.push((data.clone(), part_start..part_end));
				}
				Self::from_segments(new_parts, sub_len)
			}
		}
	}

	/// Encodes with the standard Base64 alphabet, padded to a multiple of 4.
	pub fn base64(&self) -> String { STANDARD.encode(self.as_contiguous()) }

	/// Encodes with the URL-safe Base64 alphabet (`-`/`_`), padded to a
	/// multiple of 4.
	pub fn base64_url(&self) -> String { URL_SAFE.encode(self.as_contiguous()) }

	/// Decodes standard (or URL-safe, auto-detected) Base64. Whitespace is
	/// ignored; any other non-alphabet byte is a decode failure.
	pub fn decode_base64(input: &str) -> Result<Self, base64::DecodeError> {
		let filtered: Vec<u8> = input.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
		let is_url_safe = filtered.iter().any(|&b| b == b'-' || b == b'_');
		let engine = if is_url_safe { &URL_SAFE } else { &STANDARD };
		Ok(engine.decode(filtered)?.into())
	}

	/// Encodes as lowercase hex.
	pub fn hex(&self) -> String {
		let bytes = self.as_contiguous();
		base16ct::lower::encode_string(&bytes)
	}

	/// Decodes hex, accepting either letter case. Requires an even-length
	/// input.
	pub fn decode_hex(input: &str) -> Result<Self, base16ct::Error> {
		Ok(base16ct::mixed::decode_vec(input)?.into())
	}

	/// Computes the KMP failure table for this byte string, used to search
	/// for it as a pattern across segment boundaries without backtracking.
	pub(crate) fn kmp_failure_table(&self) -> Vec<usize> {
		let pattern = self.to_vec();
		let mut table = vec![0usize; pattern.len()];
		let mut k = 0;
		for i in 1..pattern.len() {
			while k > 0 && pattern[k] != pattern[i] { k = table[k - 1] }
			if pattern[k] == pattern[i] { k += 1 }
			table[i] = k;
		}
		table
	}
}

impl Debug for ByteString {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		const PREVIEW: usize = 16;
		write!(f, "ByteString(len={}", self.len())?;
		let mut shown = 0;
		write!(f, ", [")?;
		'outer: for chunk in self.chunks() {
			for &b in chunk {
				if shown == PREVIEW { write!(f, ", ..")?; break 'outer }
				if shown > 0 { write!(f, ", ")? }
				write!(f, "{b:02x}")?;
				shown += 1;
			}
		}
		write!(f, "])")
	}
}

impl PartialEq for ByteString {
	fn eq(&self, other: &Self) -> bool {
		self.len() == other.len() && self.chunks().flatten().eq(other.chunks().flatten())
	}
}

impl Eq for ByteString {}

impl PartialOrd for ByteString {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ByteString {
	fn cmp(&self, other: &Self) -> Ordering {
		self.chunks().flatten().cmp(other.chunks().flatten())
	}
}

impl std::hash::Hash for ByteString {
	fn hash<H: Hasher>(&self, state: &mut H) { self.hash_contents(state) }
}

impl From<Vec<u8>> for ByteString {
	fn from(data: Vec<u8>) -> Self {
		let len = data.len();
		Self {
			repr: Repr::Flat(Arc::from(data.into_boxed_slice()), 0..len),
			hash: OnceCell::new(),
			utf8: OnceCell::new(),
		}
	}
}

impl From<&[u8]> for ByteString {
	fn from(data: &[u8]) -> Self { data.to_vec().into() }
}

impl PartialEq<[u8]> for ByteString {
	fn eq(&self, other: &[u8]) -> bool {
		self.len() == other.len() && self.chunks().flatten().copied().eq(other.iter().copied())
	}
}

/// A [`ByteString`] known to contain valid UTF-8, with a lazily computed
/// UTF-16 code unit count (the "character length" as most host-language
/// string APIs define it).
#[derive(Clone)]
pub struct Utf8 {
	inner: ByteString,
	utf16_len: OnceCell<usize>,
}

impl Utf8 {
	/// Validates `bytes` as UTF-8, returning the offset of the first invalid
	/// sequence on failure.
	pub fn new(bytes: ByteString) -> Result<Self, OffsetUtf8Error> {
		bytes.decode_to_utf8()?;
		Ok(Self { inner: bytes, utf16_len: OnceCell::new() })
	}

	/// Encodes `str` as UTF-8 bytes.
	pub fn encode(str: &str) -> Self {
		let inner: ByteString = str.as_bytes().to_vec().into();
		inner.decode_to_utf8().expect("freshly encoded bytes are valid UTF-8");
		Self { inner, utf16_len: OnceCell::new() }
	}

	/// Borrows the decoded string.
	pub fn as_str(&self) -> &str {
		// `new`/`encode` guarantee validity, and the cache is populated by them.
		self.inner.utf8.get().expect("Utf8 constructors populate the decode cache")
	}

	/// Number of UTF-16 code units the string would occupy if re-encoded,
	/// computed once and cached.
	pub fn char_len(&self) -> usize {
		*self.utf16_len.get_or_init(|| self.as_str().encode_utf16().count())
	}

	/// Returns the underlying byte string.
	pub fn into_bytes(self) -> ByteString { self.inner }

	pub fn bytes(&self) -> &ByteString { &self.inner }
}

impl Debug for Utf8 {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { Debug::fmt(self.as_str(), f) }
}

impl PartialEq for Utf8 {
	fn eq(&self, other: &Self) -> bool { self.inner == other.inner }
}

impl Eq for Utf8 {}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;
	use quickcheck_macros::quickcheck;
	use super::ByteString;

	#[test]
	fn hex_round_trip() {
		let s: ByteString = b"hello".to_vec().into();
		assert_eq!(s.hex(), "68656c6c6f");
		assert_eq!(ByteString::decode_hex("68656C6C6F").unwrap(), s);
	}

	#[test]
	fn base64_round_trip() {
		let s: ByteString = b"any carnal pleasure".to_vec().into();
		let encoded = s.base64();
		assert_eq!(ByteString::decode_base64(&encoded).unwrap(), s);
	}

	#[test]
	fn base64_rejects_invalid_byte() {
		assert!(ByteString::decode_base64("not@valid!!").is_err());
	}

	#[test]
	fn ascii_case_identity_avoids_copy() {
		let s: ByteString = b"42".to_vec().into();
		let lower = s.to_ascii_lowercase();
		assert_eq!(lower, s);
	}

	#[test]
	fn substring_below_threshold_is_independent() {
		let s: ByteString = b"hello world".to_vec().into();
		let sub = s.substring(0, 5);
		assert_eq!(sub.to_vec(), b"hello");
	}

	#[quickcheck]
	fn equal_implies_equal_hash(data: Vec<u8>) -> bool {
		let a: ByteString = data.clone().into();
		let b: ByteString = data.into();
		a != b || a.hash_code() == b.hash_code()
	}

	#[quickcheck]
	fn to_vec_round_trips(data: Vec<u8>) -> bool {
		let s: ByteString = data.clone().into();
		s.to_vec() == data
	}
}
