// SPDX-License-Identifier: Apache-2.0

//! [`RawReader`]/[`RawWriter`], the two contracts external collaborators
//! (sockets, files, TLS, …) implement, and [`BufferedReader`]/
//! [`BufferedWriter`], the typed wrappers built on top of them.

use crate::buffer::Buffer;
use crate::error::{Error, Kind, Result};
use crate::segment::SIZE;

pub mod void;

/// A source of bytes external to the core: a socket, file, or similar.
/// `read_at_most_to` is the only required method; everything else in
/// [`BufferedReader`] is built from it.
pub trait RawReader {
	/// Appends between 1 and `byte_count` bytes to `sink`, returning the
	/// number written, or `-1` on definitive exhaustion. Implementations
	/// must not return `Ok(0)`: block until at least one byte is available
	/// or exhaustion is certain.
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<isize>;

	/// Closes the reader. Idempotent.
	fn close(&mut self) -> Result<()> { Ok(()) }
}

/// A destination for bytes external to the core.
pub trait RawWriter {
	/// Consumes exactly `byte_count` bytes from `source` and appends them to
	/// the destination.
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<()>;

	/// Pushes any buffering this writer itself holds to the final destination.
	fn flush(&mut self) -> Result<()> { Ok(()) }

	/// Flushes and closes the writer. Idempotent.
	fn close(&mut self) -> Result<()> { self.flush() }
}

/// Failure state shared by [`BufferedReader`] and [`BufferedWriter`]: once an
/// operation observes a downstream failure, every later operation re-reports
/// the same kind rather than touching the (possibly broken) downstream
/// again.
enum State {
	Open,
	Closed,
	Faulted { kind: Kind, operation: &'static str },
}

impl State {
	fn check(&self, operation: &'static str) -> Result<()> {
		match self {
			State::Open => Ok(()),
			State::Closed => Err(Error::closed(operation)),
			State::Faulted { kind, .. } => Err(Error::new(operation, *kind)),
		}
	}
}

macro_rules! gen_int_reads {
	($($name:ident -> $ty:ident),+ $(,)?) => {
		$(
			#[doc = concat!(" Reads one big-endian [`", stringify!($ty), "`].")]
			pub fn $name(&mut self) -> Result<$ty> {
				self.require(std::mem::size_of::<$ty>())?;
				self.buf.$name()
			}
		)+
	}
}

macro_rules! gen_int_writes {
	($($name:ident -> $ty:ident),+ $(,)?) => {
		$(
			#[doc = concat!(" Writes one big-endian [`", stringify!($ty), "`].")]
			pub fn $name(&mut self, value: $ty) -> Result<()> {
				self.check("write")?;
				self.buf.$name(value);
				Ok(())
			}
		)+
	}
}

/// Buffers reads from a [`RawReader`], refilling on demand via
/// [`Self::request`]/[`Self::require`] and exposing the same typed read API
/// as [`Buffer`] on top.
pub struct BufferedReader<R: RawReader> {
	source: R,
	buf: Buffer,
	state: State,
}

impl<R: RawReader> BufferedReader<R> {
	pub fn new(source: R) -> Self {
		Self { source, buf: Buffer::new(), state: State::Open }
	}

	fn fault(&mut self, error: Error) -> Error {
		self.state = State::Faulted { kind: error.kind(), operation: error.operation() };
		error
	}

	/// Refills from the downstream until at least `byte_count` bytes are
	/// buffered or the downstream is exhausted, returning whether the
	/// request was satisfied.
	pub fn request(&mut self, byte_count: usize) -> Result<bool> {
		self.state.check("request")?;
		while self.buf.size() < byte_count {
			match self.source.read_at_most_to(&mut self.buf, SIZE) {
				Ok(-1) => return Ok(false),
				Ok(_) => {}
				Err(e) => return Err(self.fault(e)),
			}
		}
		Ok(true)
	}

	/// As [`Self::request`], but fails with an end-of-input error instead of
	/// returning `false`.
	pub fn require(&mut self, byte_count: usize) -> Result<()> {
		if self.request(byte_count)? { Ok(()) } else { Err(Error::eos("require")) }
	}

	/// Whether the downstream is exhausted and no buffered bytes remain.
	pub fn exhausted(&mut self) -> Result<bool> { Ok(!self.request(1)?) }

	/// A non-consuming snapshot of the bytes currently buffered (sharing
	/// segments rather than copying), without pulling any more from the
	/// downstream. Further reads from `self` do not affect the bytes already
	/// returned here.
	pub fn peek(&mut self) -> Result<Buffer> {
		self.state.check("peek")?;
		let mut view = Buffer::new();
		let size = self.buf.size();
		self.buf.copy_to(&mut view, 0, size)?;
		Ok(view)
	}

	pub fn read_byte(&mut self) -> Result<u8> {
		self.require(1)?;
		self.buf.read_u8()
	}

	pub fn read_into_slice(&mut self, buf: &mut [u8]) -> Result<()> {
		self.require(buf.len())?;
		self.buf.read_exact(buf)
	}

	pub fn skip(&mut self, n: usize) -> Result<usize> {
		self.require(n)?;
		Ok(self.buf.skip(n))
	}

	pub fn read_utf8(&mut self, byte_count: usize) -> Result<String> {
		self.require(byte_count)?;
		self.buf.read_utf8(byte_count)
	}

	pub fn read_utf8_code_point(&mut self) -> Result<char> {
		self.require(1)?;
		// a 4-byte sequence may need up to 3 more bytes than are yet buffered
		while self.buf.size() < 4 && self.request(self.buf.size() + 1)? {}
		self.buf.read_utf8_code_point()
	}

	pub fn read_line(&mut self) -> Result<Option<String>> {
		loop {
			if self.buf.index_of_byte(b'\n', 0, self.buf.size()).is_some() { break }
			if !self.request(self.buf.size() + SIZE)? { break }
		}
		Ok(self.buf.read_line())
	}

	pub fn read_line_strict(&mut self, limit: usize) -> Result<String> {
		let window = limit.saturating_add(2);
		loop {
			if self.buf.index_of_byte(b'\n', 0, window.min(self.buf.size())).is_some() { break }
			if self.buf.size() >= window { break }
			if !self.request(self.buf.size() + SIZE)? { break }
		}
		self.buf.read_line_strict(limit)
	}

	/// Pulls more data from the downstream until the digit run at the head is
	/// terminated by a non-digit byte already buffered, the downstream is
	/// exhausted, or the maximum width of a signed 64-bit decimal (20 bytes,
	/// covering `i64::MIN`'s leading `-`) has been buffered — whichever comes
	/// first. Unlike a fixed-width codec, a decimal run has no self-announced
	/// length, so this stops as soon as the run's end is visible rather than
	/// waiting for the downstream to close.
	pub fn read_decimal_long(&mut self) -> Result<i64> {
		const MAX_DECIMAL_WIDTH: usize = 20;
		loop {
			if self.decimal_run_terminated() || self.buf.size() >= MAX_DECIMAL_WIDTH { break }
			if !self.request(self.buf.size() + 1)? { break }
		}
		self.buf.read_decimal_long()
	}

	/// Whether the buffered bytes already contain a non-digit terminator past
	/// an optional leading sign, i.e. whether requesting more data could not
	/// possibly extend the number at the head.
	fn decimal_run_terminated(&self) -> bool {
		let size = self.buf.size();
		let mut i = if self.buf.get_byte(0) == Some(b'-') { 1 } else { 0 };
		if i >= size { return false }
		while i < size {
			match self.buf.get_byte(i) {
				Some(b) if b.is_ascii_digit() => i += 1,
				_ => return true,
			}
		}
		false
	}

	/// As [`Self::read_decimal_long`], but stops once 16 hex digits are
	/// buffered since that is the most [`Self::read_hex_unsigned_long`] will
	/// ever consume.
	pub fn read_hex_unsigned_long(&mut self) -> Result<u64> {
		while self.buf.size() < 16 && self.request(self.buf.size() + 1)? {}
		self.buf.read_hex_unsigned_long()
	}

	gen_int_reads! {
		read_u8 -> u8,
		read_i8 -> i8,
		read_u16 -> u16,
		read_i16 -> i16,
		read_u32 -> u32,
		read_i32 -> i32,
		read_u64 -> u64,
		read_i64 -> i64,
	}

	pub fn close(&mut self) -> Result<()> {
		match self.state {
			State::Open => {
				self.state = State::Closed;
				self.source.close()
			}
			State::Closed => Ok(()),
			State::Faulted { kind, operation } => Err(Error::new(operation, kind)),
		}
	}
}

/// Buffers writes headed for a [`RawWriter`], draining to the downstream via
/// [`Self::emit`]/[`Self::emit_complete_segments`]/[`Self::flush`].
pub struct BufferedWriter<W: RawWriter> {
	sink: W,
	buf: Buffer,
	state: State,
}

impl<W: RawWriter> BufferedWriter<W> {
	pub fn new(sink: W) -> Self {
		Self { sink, buf: Buffer::new(), state: State::Open }
	}

	fn check(&self, operation: &'static str) -> Result<()> { self.state.check(operation) }

	fn fault(&mut self, error: Error) -> Error {
		self.state = State::Faulted { kind: error.kind(), operation: error.operation() };
		error
	}

	/// Drains every buffered byte to the downstream, without flushing it.
	pub fn emit(&mut self) -> Result<()> {
		self.check("emit")?;
		let n = self.buf.size();
		self.sink.write(&mut self.buf, n).map_err(|e| self.fault(e))
	}

	/// Drains only whole segments, leaving at most one partially filled
	/// segment buffered. The bounded-memory write path: callers that write a
	/// little at a time and call this after each write keep at most one
	/// segment's worth of unsent data resident.
	pub fn emit_complete_segments(&mut self) -> Result<()> {
		self.check("emit_complete_segments")?;
		let n = self.buf.complete_byte_count();
		if n == 0 { return Ok(()) }
		self.sink.write(&mut self.buf, n).map_err(|e| self.fault(e))
	}

	/// Drains everything, then flushes the downstream.
	pub fn flush(&mut self) -> Result<()> {
		self.emit()?;
		self.sink.flush().map_err(|e| self.fault(e))
	}

	pub fn write_from_slice(&mut self, data: &[u8]) -> Result<()> {
		self.check("write")?;
		self.buf.write_from_slice(data);
		Ok(())
	}

	pub fn write_utf8(&mut self, s: &str) -> Result<()> {
		self.check("write")?;
		self.buf.write_utf8(s);
		Ok(())
	}

	pub fn write_decimal_long(&mut self, value: i64) -> Result<()> {
		self.check("write")?;
		self.buf.write_decimal_long(value);
		Ok(())
	}

	pub fn write_hex_unsigned_long(&mut self, value: u64) -> Result<()> {
		self.check("write")?;
		self.buf.write_hex_unsigned_long(value);
		Ok(())
	}

	gen_int_writes! {
		write_u8 -> u8,
		write_i8 -> i8,
		write_u16 -> u16,
		write_i16 -> i16,
		write_u32 -> u32,
		write_i32 -> i32,
		write_u64 -> u64,
		write_i64 -> i64,
	}

	/// Drains, flushes, and closes the downstream. Idempotent.
	pub fn close(&mut self) -> Result<()> {
		match self.state {
			State::Open => {
				self.flush()?;
				self.state = State::Closed;
				self.sink.close()
			}
			State::Closed => Ok(()),
			State::Faulted { kind, operation } => Err(Error::new(operation, kind)),
		}
	}
}

impl<R: RawReader> Drop for BufferedReader<R> {
	fn drop(&mut self) { let _ = self.close(); }
}

impl<W: RawWriter> Drop for BufferedWriter<W> {
	fn drop(&mut self) { let _ = self.close(); }
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;
	use crate::buffer::Buffer;
	use crate::error::Result;
	use super::{BufferedReader, BufferedWriter, RawReader, RawWriter};

	struct SliceReader<'a> { data: &'a [u8] }

	impl<'a> RawReader for SliceReader<'a> {
		fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<isize> {
			if self.data.is_empty() { return Ok(-1) }
			let n = byte_count.min(self.data.len());
			sink.write_from_slice(&self.data[..n]);
			self.data = &self.data[n..];
			Ok(n as isize)
		}
	}

	#[derive(Default)]
	struct VecWriter { written: Vec<u8>, flushed: bool }

	impl RawWriter for VecWriter {
		fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<()> {
			let mut buf = vec![0u8; byte_count];
			source.read_exact(&mut buf)?;
			self.written.extend_from_slice(&buf);
			Ok(())
		}

		fn flush(&mut self) -> Result<()> {
			self.flushed = true;
			Ok(())
		}
	}

	#[test]
	fn buffered_reader_requires_and_reads() {
		let mut reader = BufferedReader::new(SliceReader { data: b"hello world" });
		assert_eq!(reader.read_utf8(5).unwrap(), "hello");
		assert!(!reader.request(100).unwrap());
		assert_eq!(reader.read_utf8(6).unwrap(), " world");
	}

	#[test]
	fn buffered_reader_reads_lines_across_refills() {
		let mut reader = BufferedReader::new(SliceReader { data: b"first\nsecond" });
		assert_eq!(reader.read_line().unwrap(), Some("first".to_string()));
		assert_eq!(reader.read_line().unwrap(), Some("second".to_string()));
		assert_eq!(reader.read_line().unwrap(), None);
	}

	#[test]
	fn buffered_writer_emit_drains_to_downstream() {
		let mut writer = BufferedWriter::new(VecWriter::default());
		writer.write_utf8("abc").unwrap();
		writer.emit().unwrap();
		writer.flush().unwrap();
		assert_eq!(writer.sink.written, b"abc");
		assert!(writer.sink.flushed);
	}

	#[test]
	fn closed_buffered_writer_rejects_further_writes() {
		let mut writer = BufferedWriter::new(VecWriter::default());
		writer.close().unwrap();
		assert!(writer.write_utf8("x").is_err());
	}

	/// A reader that hands back its data once, then panics on any further
	/// call — standing in for a live stream that would block forever on a
	/// second read once its sender has gone quiet after the number itself.
	struct OnceReader { data: Option<&'static [u8]> }

	impl RawReader for OnceReader {
		fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<isize> {
			match self.data.take() {
				Some(d) => {
					let n = byte_count.min(d.len());
					sink.write_from_slice(&d[..n]);
					Ok(n as isize)
				}
				None => panic!("read_decimal_long pulled more data than it needed to parse the number"),
			}
		}
	}

	#[test]
	fn read_decimal_long_stops_once_terminator_is_buffered() {
		let mut reader = BufferedReader::new(OnceReader { data: Some(b"42\nrest") });
		assert_eq!(reader.read_decimal_long().unwrap(), 42);
		assert_eq!(reader.read_byte().unwrap(), b'\n');
		assert_eq!(reader.read_utf8(4).unwrap(), "rest");
	}

	#[test]
	fn read_decimal_long_stops_at_max_width_on_a_never_ending_digit_run() {
		struct DigitStream;
		impl RawReader for DigitStream {
			fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<isize> {
				let n = byte_count.min(4096);
				sink.write_from_slice(&vec![b'9'; n]);
				Ok(n as isize)
			}
		}

		let mut reader = BufferedReader::new(DigitStream);
		assert!(reader.read_decimal_long().is_err());
	}
}
