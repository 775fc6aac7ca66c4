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

//! The process-wide segment pool. Recycling avoids both allocation and the
//! zero-fill a fresh `Vec<u8>` would otherwise pay on every claim.
//!
//! The pool is sharded by a hash of the claiming thread's id to reduce
//! contention between unrelated buffers on different threads, each shard
//! guarded by a short-held [`Mutex`]. This trades the single-threaded
//! `Rc`-backed pool many buffer libraries default to for uniform thread-safety:
//! a segment's backing array is an [`Arc`], so claiming on one thread and
//! recycling on another (as happens when a [`Buffer`](crate::Buffer) built on
//! one thread is handed to another) is always sound.

use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;
use std::sync::{Arc, Mutex};
use std::thread;
use once_cell::sync::Lazy;
use crate::segment::{Segment, SIZE};

/// Allocates a fresh, uninitialized backing array. Content is undefined until
/// written; a [`Segment`] built on top never exposes bytes outside its
/// `[pos, limit)` range, so the allocation itself must not pay to zero memory
/// that will never be read before being overwritten.
fn alloc_uninit() -> Arc<[u8; SIZE]> {
	// Safety: `[u8; SIZE]` has no invalid bit patterns, so an uninitialized
	// array is immediately safe to treat as initialized. The contents are
	// never read until a `Segment::write` (or the cursor's claim path) has
	// populated `[pos, limit)`.
	unsafe { Arc::<[u8; SIZE]>::new_uninit().assume_init() }
}

const SHARD_COUNT: usize = 8;
/// Upper bound on free segments retained per shard, sized to a `64 KiB`
/// per-shard ceiling.
const SHARD_CAPACITY: usize = 64 * 1024 / SIZE;

struct Shard {
	free: Mutex<Vec<Arc<[u8; SIZE]>>>,
}

impl Default for Shard {
	fn default() -> Self { Self { free: Mutex::new(Vec::with_capacity(SHARD_CAPACITY)) } }
}

/// A process-wide, thread-safe free-list of recycled segment arrays.
pub(crate) struct SegmentPool {
	shards: Vec<Shard>,
}

static POOL: Lazy<SegmentPool> = Lazy::new(SegmentPool::new);

impl SegmentPool {
	fn new() -> Self {
		Self { shards: (0..SHARD_COUNT).map(|_| Shard::default()).collect() }
	}

	fn shard(&self) -> &Shard {
		let mut hasher = DefaultHasher::new();
		thread::current().id().hash(&mut hasher);
		&self.shards[(hasher.finish() as usize) % SHARD_COUNT]
	}

	/// Claims a fresh segment: either a recycled array or a newly allocated one.
	/// Content is always undefined; callers must not read before writing.
	pub(crate) fn take(&self) -> Segment {
		let data = self.shard()
			.free
			.lock()
			.unwrap_or_else(|poison| poison.into_inner())
			.pop()
			.unwrap_or_else(|| {
				log::trace!("segment pool shard exhausted, allocating a fresh segment");
				alloc_uninit()
			});
		Segment::new(data)
	}

	/// Returns a segment's backing array to the pool, unless it's still shared
	/// (another holder keeps the array alive; dropping our reference is the only
	/// thing we may do) or the shard is already at capacity.
	pub(crate) fn recycle(&self, segment: Segment) {
		if segment.is_shared() { return }
		let Some(data) = segment.into_array() else { return };

		let mut free = self.shard()
			.free
			.lock()
			.unwrap_or_else(|poison| poison.into_inner());
		if free.len() < SHARD_CAPACITY {
			free.push(data);
		}
	}
}

/// Claims a fresh segment from the process-wide pool.
pub(crate) fn take() -> Segment { POOL.take() }

/// Returns a segment to the process-wide pool.
pub(crate) fn recycle(segment: Segment) { POOL.recycle(segment) }

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn recycled_segment_is_reused() {
		let seg = take();
		recycle(seg);
		// Claiming again should succeed without panicking, whether or not the
		// exact same array instance is handed back (shard selection is by
		// thread, not guaranteed LIFO across a test process).
		let seg = take();
		recycle(seg);
	}

	#[test]
	fn shared_segment_is_not_recycled() {
		let mut seg = take();
		seg.write(b"x");
		let shared = seg.share_all();
		recycle(seg);
		drop(shared);
	}
}
