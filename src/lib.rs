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

//! ## How it works
//!
//! Data is written to and read from reusable bits of memory called *segments*.
//! When a segment is consumed, it's returned to a *pool*. To write data, segments
//! are claimed from this pool; when the pool is exhausted, new ones are allocated.
//! The pool is process-wide and safe for concurrent `take`/`recycle` from any
//! thread.
//!
//! ### Segments
//!
//! Segments are fixed-capacity byte arrays chained into a queue. Memory within a
//! segment can be owned or shared between segments, avoiding expensive mem-copy
//! operations as much as possible: sharing a range of a [`Buffer`] (via
//! [`Buffer::copy_to`] or [`Buffer::snapshot`]) clones the segment's backing array
//! behind an `Arc` rather than its bytes, and writes to a shared segment elsewhere
//! take a fresh one instead of mutating the aliased data. Small ranges, under a
//! threshold, are copied outright rather than shared, trading a small copy for
//! avoiding long-lived shared segments that can no longer be written in place.
//!
//! A [`Buffer`] behaves as a byte deque: bytes are read from the front and written
//! to the back, claiming segments from the pool as it grows and returning them as
//! it's drained. [`Buffer::write_from_buffer`] moves bytes between two buffers,
//! reassigning whole segments by pointer where the transferred range allows it
//! instead of copying.
//!
//! [`BufferedReader`](streams::BufferedReader) and
//! [`BufferedWriter`](streams::BufferedWriter) layer a typed read/write API over a
//! [`Buffer`] plus an external [`RawReader`](streams::RawReader)/
//! [`RawWriter`](streams::RawWriter), refilling or draining on demand.

mod buffer;
mod cursor;
mod error;
pub mod streams;
mod segment;
mod pool;
mod queue;
mod byte_str;
mod options;

pub use error::{Error, Kind, IoKind, Result, OffsetUtf8Error};
pub use buffer::Buffer;
pub use byte_str::{ByteString, Utf8};
pub use cursor::UnsafeCursor;
pub use options::Options;
