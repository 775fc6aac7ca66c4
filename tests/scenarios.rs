// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios exercising the public API the way a real consumer
//! would: a buffered reader/writer pair over an in-memory stream, segment
//! handoff between two buffers, copy-on-write snapshots, and the typed
//! codecs working together rather than in isolation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use byteflow::streams::{BufferedReader, BufferedWriter, RawReader, RawWriter};
use byteflow::{Buffer, ByteString, Options};

/// An in-memory duplex byte pipe standing in for a connected socket: bytes
/// written on one end are readable from the other. Both ends share the same
/// backing queue so a writer and a reader can be driven independently while
/// observing each other's progress, the way two ends of a real socket would.
#[derive(Clone, Default)]
struct Pipe {
	queued: Rc<RefCell<VecDeque<u8>>>,
}

impl RawReader for Pipe {
	fn read_at_most_to(&mut self, sink: &mut Buffer, byte_count: usize) -> byteflow::Result<isize> {
		let mut queued = self.queued.borrow_mut();
		if queued.is_empty() { return Ok(-1) }
		let n = byte_count.min(queued.len());
		let chunk: Vec<u8> = queued.drain(..n).collect();
		sink.write_from_slice(&chunk);
		Ok(n as isize)
	}
}

impl RawWriter for Pipe {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> byteflow::Result<()> {
		let mut buf = vec![0u8; byte_count];
		source.read_exact(&mut buf)?;
		self.queued.borrow_mut().extend(buf);
		Ok(())
	}
}

#[test]
fn socket_echo_round_trip() {
	let pipe = Pipe::default();
	let mut writer = BufferedWriter::new(pipe.clone());
	writer.write_utf8("The Answer to the Ultimate Question of Life is ").unwrap();
	writer.write_u8(b'4').unwrap();
	writer.write_u8(b'2').unwrap();
	writer.flush().unwrap();

	let mut reader = BufferedReader::new(pipe);
	let received = reader.read_utf8(50).unwrap();

	assert_eq!(received, "The Answer to the Ultimate Question of Life is 42");
	assert_eq!(received.len(), 50);
	assert!(reader.exhausted().unwrap());
}

#[test]
fn segment_handoff_transfers_one_segment_by_identity() {
	let mut a = Buffer::new();
	let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 256) as u8).collect();
	a.write_from_slice(&payload);

	let before_ptr = {
		let mut cursor = a.cursor();
		cursor.seek(0).unwrap();
		cursor.data().as_ptr()
	};

	let mut b = Buffer::new();
	b.write_from_buffer(&mut a, 20_000).unwrap();

	assert_eq!(a.size(), 0);
	assert_eq!(b.size(), 20_000);
	assert_eq!(b.snapshot().to_vec(), payload);

	let after_ptr = {
		let mut cursor = b.cursor();
		cursor.seek(0).unwrap();
		cursor.data().as_ptr()
	};
	assert_eq!(before_ptr, after_ptr, "first segment should move by identity, not copy");
}

#[test]
fn copy_on_write_snapshot_is_stable_under_later_writes() {
	let mut a = Buffer::new();
	let pattern: Vec<u8> = b"xo".iter().cycle().take(10_000).copied().collect();
	a.write_from_slice(&pattern);

	let snapshot = a.snapshot();
	a.write_from_slice(b"more data that must not leak into the snapshot");

	assert_eq!(snapshot.len(), 10_000);
	assert_eq!(snapshot.to_vec(), pattern);
	assert_eq!(snapshot.hex().len(), 20_000);
}

#[test]
fn utf8_round_trip_with_supplementary_code_point() {
	let mut buf = Buffer::new();
	buf.write_utf8_code_point(0x1F600);
	let out = buf.read_utf8(buf.size()).unwrap();
	assert_eq!(out.chars().count(), 1);
	assert_eq!(out.chars().next().unwrap() as u32, 0x1F600);
}

#[test]
fn options_select_picks_between_candidates() {
	let mut buf = Buffer::new();
	buf.write_from_slice(b"width=640\nheight=480\n");

	let options = Options::compile([
		ByteString::from(&b"depth="[..]),
		ByteString::from(&b"height="[..]),
		ByteString::from(&b"width="[..]),
	]);

	assert_eq!(buf.select(&options), Some(2));
	assert_eq!(buf.read_decimal_long().unwrap(), 640);
	assert_eq!(buf.read_byte(), Some(b'\n'));
	assert_eq!(buf.select(&options), Some(1));
	assert_eq!(buf.read_decimal_long().unwrap(), 480);
}

#[test]
fn line_scanning_finds_terminator_across_many_segments() {
	let mut body = vec![b'a'; 8_992];
	body.extend_from_slice(b"foo\r\nbar");
	let total = body.len();
	assert_eq!(total, 9_000);

	let mut buf = Buffer::new();
	buf.write_from_slice(&body);

	let line = buf.read_line_strict_unlimited().unwrap();
	assert_eq!(line.len(), total - "bar".len() - 2);
	assert!(line.ends_with("foo"));

	let rest = buf.read_utf8(buf.size()).unwrap();
	assert_eq!(rest, "bar");
}
