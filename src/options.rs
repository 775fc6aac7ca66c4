// SPDX-License-Identifier: Apache-2.0

//! [`Options`], a compiled prefix trie over an ordered list of [`ByteString`]s
//! used for keyword dispatch (`readLine`-style tag matching without building
//! an intermediate string).

use crate::byte_str::ByteString;

struct Node {
	children: Vec<(u8, Node)>,
	/// Index into the original list, if some entry's bytes end exactly here.
	terminal: Option<usize>,
}

impl Node {
	fn empty() -> Self { Self { children: Vec::new(), terminal: None } }

	fn child(&self, byte: u8) -> Option<&Node> {
		self.children.iter().find(|(b, _)| *b == byte).map(|(_, n)| n)
	}

	fn child_mut(&mut self, byte: u8) -> &mut Node {
		if let Some(i) = self.children.iter().position(|(b, _)| *b == byte) {
			&mut self.children[i].1
		} else {
			self.children.push((byte, Node::empty()));
			&mut self.children.last_mut().unwrap().1
		}
	}
}

/// A read-only trie compiled from an ordered list of distinct [`ByteString`]s.
/// [`Self::select`] walks bytes from a source, returning the index of the
/// first-listed entry matching the deepest consumed prefix.
pub struct Options {
	root: Node,
	ascii_ci: bool,
}

impl Options {
	/// Compiles a case-sensitive trie. Earlier entries take priority over
	/// later duplicates of the same bytes.
	pub fn compile(entries: impl IntoIterator<Item = ByteString>) -> Self {
		Self::build(entries, false)
	}

	/// Compiles a trie that matches ASCII letters regardless of case.
	pub fn compile_ascii_case_insensitive(entries: impl IntoIterator<Item = ByteString>) -> Self {
		Self::build(entries, true)
	}

	fn build(entries: impl IntoIterator<Item = ByteString>, ascii_ci: bool) -> Self {
		let mut root = Node::empty();
		for (index, entry) in entries.into_iter().enumerate() {
			let mut node = &mut root;
			for byte in entry.chunks().flatten().copied() {
				let key = if ascii_ci { byte.to_ascii_lowercase() } else { byte };
				node = node.child_mut(key);
			}
			node.terminal.get_or_insert(index);
		}
		Self { root, ascii_ci }
	}

	/// Walks bytes yielded by `peek` (called with successive offsets from the
	/// current read position, returning `None` at end of input) and returns
	/// `(index, bytes_consumed)` for the deepest-matching entry, or `None` if
	/// no entry is a prefix of the input. On `None`, no bytes should be
	/// consumed by the caller.
	pub fn select(&self, mut peek: impl FnMut(usize) -> Option<u8>) -> Option<(usize, usize)> {
		let mut node = &self.root;
		let mut best: Option<(usize, usize)> = None;
		let mut depth = 0;

		loop {
			if let Some(index) = node.terminal {
				best = Some((index, depth));
			}
			let Some(byte) = peek(depth) else { break };
			let key = if self.ascii_ci { byte.to_ascii_lowercase() } else { byte };
			let Some(next) = node.child(key) else { break };
			node = next;
			depth += 1;
		}

		best
	}

	/// Alias for [`Self::select`] documenting intent when this trie was built
	/// with [`Self::compile_ascii_case_insensitive`].
	pub fn select_ascii_case_insensitive(&self, peek: impl FnMut(usize) -> Option<u8>) -> Option<(usize, usize)> {
		debug_assert!(self.ascii_ci, "compiled without ascii_case_insensitive");
		self.select(peek)
	}
}

#[cfg(test)]
mod test {
	use pretty_assertions::assert_eq;
	use crate::byte_str::ByteString;
	use super::Options;

	fn peek_over(data: &'static [u8]) -> impl Fn(usize) -> Option<u8> {
		move |i| data.get(i).copied()
	}

	#[test]
	fn selects_deepest_match() {
		let options = Options::compile([
			ByteString::from(&b"depth="[..]),
			ByteString::from(&b"height="[..]),
			ByteString::from(&b"width="[..]),
		]);

		assert_eq!(options.select(peek_over(b"width=640")), Some((2, 6)));
		assert_eq!(options.select(peek_over(b"height=480")), Some((1, 7)));
		assert_eq!(options.select(peek_over(b"nonsense")), None);
	}

	#[test]
	fn ascii_case_insensitive_matches_any_case() {
		let options = Options::compile_ascii_case_insensitive([
			ByteString::from(&b"content-length"[..]),
		]);
		assert_eq!(options.select(peek_over(b"Content-Length: 3")), Some((0, 14)));
	}

	#[test]
	fn prefix_entry_wins_when_no_longer_match_follows() {
		let options = Options::compile([
			ByteString::from(&b"foo"[..]),
			ByteString::from(&b"foobar"[..]),
		]);
		assert_eq!(options.select(peek_over(b"foobaz")), Some((0, 3)));
		assert_eq!(options.select(peek_over(b"foobar")), Some((1, 6)));
	}
}
