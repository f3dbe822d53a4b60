// Copyright 2018 The Grin Developers
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

//! Blocks whose parent hasn't arrived yet (§3 "Orphan pool", §4.3, C4).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use lite_core::block::{Block, Transaction};
use lite_core::hash::{Hash, Hashed};

/// Cap on the number of orphans retained at once. Beyond this the oldest
/// entry is evicted to make room (§9 Open Question 3).
pub const MAX_ORPHANS: usize = 100;

/// A pending orphan together with the Bloom context it arrived with, if
/// any (§3, §4.3).
#[derive(Clone)]
pub struct OrphanBlock {
	/// The orphaned block itself.
	pub block: Block,
	/// Transaction hashes carried by a filtered arrival, if this orphan
	/// arrived as a filtered block rather than a full or header-only one.
	pub filtered_tx_hashes: Option<Vec<Hash>>,
	/// The subset of full transactions a filtered arrival matched.
	pub filtered_tx_bodies: Option<Vec<Transaction>>,
}

/// Holds disconnected blocks keyed by their own hash; replays them when
/// a parent appears (§4.3).
pub struct OrphanPool {
	entries: Mutex<HashMap<Hash, OrphanBlock>>,
	arrival_order: Mutex<VecDeque<Hash>>,
}

impl OrphanPool {
	/// An empty pool.
	pub fn new() -> OrphanPool {
		OrphanPool {
			entries: Mutex::new(HashMap::new()),
			arrival_order: Mutex::new(VecDeque::new()),
		}
	}

	/// Records `orphan`, evicting the oldest entry first if the pool is
	/// already at `MAX_ORPHANS`. No-op if this hash is already present.
	pub fn add(&self, orphan: OrphanBlock) {
		let hash = orphan.block.hash();
		let mut entries = self.entries.lock().unwrap();
		if entries.contains_key(&hash) {
			return;
		}
		let mut order = self.arrival_order.lock().unwrap();
		if entries.len() >= MAX_ORPHANS {
			if let Some(oldest) = order.pop_front() {
				entries.remove(&oldest);
				log::debug!("orphan pool: evicting {} to make room", oldest);
			}
		}
		order.push_back(hash);
		entries.insert(hash, orphan);
	}

	/// Removes and returns the orphan keyed by `hash`, if present.
	pub fn remove(&self, hash: &Hash) -> Option<OrphanBlock> {
		let mut entries = self.entries.lock().unwrap();
		let removed = entries.remove(hash);
		if removed.is_some() {
			let mut order = self.arrival_order.lock().unwrap();
			if let Some(pos) = order.iter().position(|h| h == hash) {
				order.remove(pos);
			}
		}
		removed
	}

	/// Whether `hash` names a currently pending orphan.
	pub fn contains(&self, hash: &Hash) -> bool {
		self.entries.lock().unwrap().contains_key(hash)
	}

	/// Number of pending orphans.
	pub fn len(&self) -> usize {
		self.entries.lock().unwrap().len()
	}

	/// True if the pool holds no orphans.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Hashes of every orphan whose declared parent is `parent`, in
	/// arrival order.
	pub fn children_of(&self, parent: &Hash) -> Vec<Hash> {
		let entries = self.entries.lock().unwrap();
		let order = self.arrival_order.lock().unwrap();
		order
			.iter()
			.filter(|h| entries.get(h).map(|o| &o.block.header.previous) == Some(parent))
			.copied()
			.collect()
	}

	/// Walks the `previous` chain within the pool starting at `hash` and
	/// returns the earliest ancestor still present as an orphan, i.e. the
	/// block a network layer should request first to unblock replay
	/// (§4.3). Returns `None` if `hash` itself isn't an orphan.
	pub fn orphan_root(&self, hash: &Hash) -> Option<Hash> {
		let entries = self.entries.lock().unwrap();
		if !entries.contains_key(hash) {
			return None;
		}
		let mut current = *hash;
		loop {
			let previous = entries.get(&current).unwrap().block.header.previous;
			if entries.contains_key(&previous) {
				current = previous;
			} else {
				break;
			}
		}
		Some(current)
	}
}

impl Default for OrphanPool {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use lite_core::block::{Body, BlockHeader};
	use lite_core::hash::ZERO_HASH;
	use lite_core::target::CompactTarget;

	fn block(previous: Hash, nonce: u32) -> Block {
		Block {
			header: BlockHeader {
				version: 1,
				previous,
				merkle_root: ZERO_HASH,
				timestamp: 0,
				bits: CompactTarget(0x207f_ffff),
				nonce,
			},
			body: Body::HeaderOnly,
		}
	}

	fn orphan(previous: Hash, nonce: u32) -> OrphanBlock {
		OrphanBlock {
			block: block(previous, nonce),
			filtered_tx_hashes: None,
			filtered_tx_bodies: None,
		}
	}

	#[test]
	fn orphan_root_walks_to_earliest_pending_ancestor() {
		let pool = OrphanPool::new();
		let b1 = block(ZERO_HASH, 1);
		let b2 = block(b1.hash(), 2);
		let b3 = block(b2.hash(), 3);
		pool.add(orphan(b1.hash(), 2));
		pool.add(orphan(b2.hash(), 3));
		assert_eq!(pool.orphan_root(&b3.hash()), Some(b2.hash()));
	}

	#[test]
	fn eviction_drops_oldest_first() {
		let pool = OrphanPool::new();
		for i in 0..MAX_ORPHANS as u32 {
			pool.add(orphan(ZERO_HASH, i));
		}
		let first = block(ZERO_HASH, 0).hash();
		assert!(pool.contains(&first));
		pool.add(orphan(ZERO_HASH, MAX_ORPHANS as u32));
		assert!(!pool.contains(&first));
		assert_eq!(pool.len(), MAX_ORPHANS);
	}
}
