// SPDX-License-Identifier: Apache-2.0

//! Discarding/empty [`RawWriter`]/[`RawReader`] implementations, useful for
//! benchmarking and for draining a [`BufferedWriter`](crate::streams::BufferedWriter)
//! that has no real destination.

use crate::buffer::Buffer;
use crate::error::Result;
use super::{RawReader, RawWriter};

/// Returns a [`RawWriter`] that discards everything written to it.
pub fn void_writer() -> VoidWriter { VoidWriter }

/// Returns a [`RawReader`] that is immediately exhausted.
pub fn void_reader() -> VoidReader { VoidReader }

/// A [`RawWriter`] that discards everything written to it.
#[derive(Copy, Clone, Debug, Default)]
pub struct VoidWriter;

impl RawWriter for VoidWriter {
	/// Discards `byte_count` bytes from `source`.
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<()> {
		source.skip(byte_count);
		Ok(())
	}
}

/// A [`RawReader`] that is always exhausted.
#[derive(Copy, Clone, Debug, Default)]
pub struct VoidReader;

impl RawReader for VoidReader {
	fn read_at_most_to(&mut self, _sink: &mut Buffer, _byte_count: usize) -> Result<isize> {
		Ok(-1)
	}
}

#[cfg(test)]
mod test {
	use crate::buffer::Buffer;
	use crate::streams::{RawReader, RawWriter};
	use super::{VoidReader, VoidWriter};

	#[test]
	fn void_writer_discards_bytes() {
		let mut buf = Buffer::new();
		buf.write_from_slice(b"anything");
		VoidWriter.write(&mut buf, 8).unwrap();
		assert!(buf.is_empty());
	}

	#[test]
	fn void_reader_is_immediately_exhausted() {
		let mut buf = Buffer::new();
		assert_eq!(VoidReader.read_at_most_to(&mut buf, 10).unwrap(), -1);
	}
}
