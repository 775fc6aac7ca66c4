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

//! A single error hierarchy for every fallible operation in the crate. Kinds are
//! matched by [`Kind`], never by message text, except where the library itself
//! must classify an underlying `io::Error` (see [`Error::from_io`]).

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;
use amplify_derive::Display;
use thiserror::Error as ThisError;

pub type Result<T = ()> = std::result::Result<T, Error>;

/// The kind of failure reported by [`Error`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Display)]
pub enum Kind {
	/// Operation attempted on a closed reader, writer, or buffer.
	#[display("operation on a closed resource")]
	Closed,
	/// The underlying stream was exhausted before enough bytes were available.
	#[display("end of input")]
	Eos,
	/// A negative count, invalid offset range, or non-positive expand size.
	#[display("invalid argument")]
	InvalidArgument,
	/// An offset or length outside the container's valid indices.
	#[display("index out of bounds")]
	IndexOutOfBounds,
	/// A decimal or hexadecimal parse failed or overflowed.
	#[display("numeric format error")]
	NumericFormat,
	/// A generic failure from the underlying stream; see [`IoKind`] for detail.
	#[display("{0}")]
	Io(IoKind),
}

/// Sub-kinds of [`Kind::Io`], mirroring the platform failures raw streams surface.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Display)]
pub enum IoKind {
	#[display("file not found")]
	FileNotFound,
	#[display("file already exists")]
	FileAlreadyExists,
	#[display("protocol error")]
	Protocol,
	#[display("timed out")]
	Timeout,
	#[display("interrupted")]
	Interrupted,
	#[display("unknown host")]
	UnknownHost,
	#[display("broken pipe")]
	BrokenPipe,
	#[display("closed endpoint")]
	ClosedEndpoint,
	#[display("I/O error")]
	Other,
}

/// The crate's single error type. Carries a [`Kind`], the operation that was
/// being attempted (for diagnostics only, never matched on), and an optional
/// source error.
#[derive(Debug, ThisError)]
#[error("{kind} during {operation}")]
pub struct Error {
	kind: Kind,
	operation: &'static str,
	#[source]
	source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
	pub(crate) fn new(operation: &'static str, kind: Kind) -> Self {
		Self { kind, operation, source: None }
	}

	pub(crate) fn with_source(
		operation: &'static str,
		kind: Kind,
		source: impl StdError + Send + Sync + 'static,
	) -> Self {
		Self { kind, operation, source: Some(Box::new(source)) }
	}

	pub(crate) fn closed(operation: &'static str) -> Self {
		Self::new(operation, Kind::Closed)
	}

	pub(crate) fn eos(operation: &'static str) -> Self {
		Self::new(operation, Kind::Eos)
	}

	pub(crate) fn invalid_argument(operation: &'static str) -> Self {
		Self::new(operation, Kind::InvalidArgument)
	}

	pub(crate) fn index_out_of_bounds(operation: &'static str) -> Self {
		Self::new(operation, Kind::IndexOutOfBounds)
	}

	pub(crate) fn numeric_format(operation: &'static str) -> Self {
		Self::new(operation, Kind::NumericFormat)
	}

	/// Returns the error kind.
	pub fn kind(&self) -> Kind { self.kind }

	/// Returns the name of the operation being attempted when the error occurred.
	pub fn operation(&self) -> &'static str { self.operation }

	/// Classifies an [`io::Error`] into this crate's error kind, promoting
	/// generic errors to [`IoKind::BrokenPipe`]/[`IoKind::ClosedEndpoint`] by
	/// message text when the platform gives no structured way to distinguish
	/// them. External [`RawReader`](crate::streams::RawReader)/
	/// [`RawWriter`](crate::streams::RawWriter) implementations bridging to
	/// `std::io` use this to report failures in the same vocabulary as the
	/// rest of the crate.
	pub fn from_io(operation: &'static str, error: io::Error) -> Self {
		use io::ErrorKind::*;
		let io_kind = match error.kind() {
			UnexpectedEof => return Self::eos(operation),
			NotFound => IoKind::FileNotFound,
			AlreadyExists => IoKind::FileAlreadyExists,
			TimedOut => IoKind::Timeout,
			Interrupted => IoKind::Interrupted,
			BrokenPipe => IoKind::BrokenPipe,
			ConnectionReset | ConnectionAborted | NotConnected => IoKind::ClosedEndpoint,
			InvalidData => IoKind::Protocol,
			_ => Self::sniff_message(&error),
		};
		Self::with_source(operation, Kind::Io(io_kind), error)
	}

	/// Platform `io::Error` kinds are too coarse to distinguish a dropped
	/// connection from a generic I/O failure on every target; promote by message
	/// text as a fallback, matching known wordings from common platform
	/// implementations.
	fn sniff_message(error: &io::Error) -> IoKind {
		let message = error.to_string();
		if message.contains("Socket closed") || message.contains("Connection reset") {
			IoKind::ClosedEndpoint
		} else if message.contains("Broken pipe") {
			IoKind::BrokenPipe
		} else if message.contains("unknown host") || message.contains("failed to lookup address") {
			IoKind::UnknownHost
		} else {
			IoKind::Other
		}
	}

	/// Converts this error back into an [`io::Error`], for crate consumers that
	/// bridge to `std::io`-based code.
	pub fn into_io(self) -> io::Error {
		let io_error_kind = match self.kind {
			Kind::Eos => io::ErrorKind::UnexpectedEof,
			Kind::Io(IoKind::FileNotFound) => io::ErrorKind::NotFound,
			Kind::Io(IoKind::FileAlreadyExists) => io::ErrorKind::AlreadyExists,
			Kind::Io(IoKind::Timeout) => io::ErrorKind::TimedOut,
			Kind::Io(IoKind::Interrupted) => io::ErrorKind::Interrupted,
			Kind::Io(IoKind::BrokenPipe) => io::ErrorKind::BrokenPipe,
			Kind::Io(IoKind::ClosedEndpoint) => io::ErrorKind::ConnectionReset,
			_ => io::ErrorKind::Other,
		};
		io::Error::new(io_error_kind, self)
	}
}

/// A UTF-8 decode error with the byte offset at which decoding stopped, used by
/// streaming UTF-8 reads where the offset is not implied by the input slice.
#[derive(Copy, Clone, Debug)]
pub struct OffsetUtf8Error {
	inner: simdutf8::compat::Utf8Error,
	offset: usize,
}

impl OffsetUtf8Error {
	pub(crate) fn new(inner: simdutf8::compat::Utf8Error, offset: usize) -> Self {
		Self { inner, offset }
	}

	/// The length of valid UTF-8 before the error, relative to the start of the
	/// whole logical read rather than just the segment in which it occurred.
	pub fn valid_up_to(&self) -> usize { self.offset + self.inner.valid_up_to() }

	pub fn error_len(&self) -> Option<usize> { self.inner.error_len() }
}

impl Display for OffsetUtf8Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.error_len() {
			Some(len) => write!(f, "invalid UTF-8 sequence of {len} bytes from index {}", self.valid_up_to()),
			None => write!(f, "incomplete UTF-8 byte sequence from index {}", self.valid_up_to()),
		}
	}
}

impl StdError for OffsetUtf8Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> { Some(&self.inner) }
}
