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

//! The block store contract (§4.6, §3 "Stored block") and an in-memory
//! reference implementation. Persistence format is explicitly out of
//! scope (§1 Non-goals); this store exists so the chain engine has
//! something real to drive during tests.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use lite_core::block::Transaction;
use lite_core::hash::Hash;
use lite_core::stored::StoredBlock;

use crate::error::Error;
use crate::types::{UndoableBlock, UtxoDelta};

/// Keyed persistence of stored blocks plus an authoritative chain-head
/// pointer (§4.6). Implementations must be safe to share across threads:
/// the engine holds one writer at a time but reads (`get`, `get_head`)
/// may race with an in-flight write from another caller that already
/// took the engine mutex.
pub trait BlockStore: Send + Sync {
	/// Looks up a stored block by its header hash.
	fn get(&self, hash: &Hash) -> Result<Option<StoredBlock>, Error>;

	/// Reads the durable chain-head pointer.
	fn get_head(&self) -> Result<Option<StoredBlock>, Error>;

	/// Durably updates the chain-head pointer. This is the commit point
	/// referenced in §5: a caller that calls `put_head` has committed to
	/// the new head.
	fn put_head(&self, block: &StoredBlock) -> Result<(), Error>;

	/// Persists a stored block that was *not* connected: header-only
	/// mode, or a full-mode block sitting on a side branch. `transactions`
	/// is retained (pruneable) so a later re-org can attempt to connect
	/// it for the first time.
	fn put(&self, block: &StoredBlock, transactions: &[Transaction]) -> Result<(), Error>;

	/// Persists a stored block that *was* connected, together with the
	/// transactions it carried and the UTXO delta connecting them
	/// produced, so a later re-org can disconnect it cheaply.
	fn put_with_undo(&self, block: &StoredBlock, transactions: &[Transaction], delta: &UtxoDelta) -> Result<(), Error>;

	/// Retrieves the retained transactions (and delta, if the block was
	/// ever actually connected) for a block, if the store still has
	/// them. `None` means the data was pruned; the caller must raise
	/// `Pruned(hash)`.
	fn get_undoable(&self, hash: &Hash) -> Result<Option<UndoableBlock>, Error>;
}

/// An in-memory `BlockStore`. Backed by a couple of `HashMap`s behind a
/// single lock; fine for a reference engine and for tests, never
/// intended as a real persistence layer.
pub struct InMemoryBlockStore {
	inner: RwLock<Inner>,
}

struct Inner {
	blocks: HashMap<Hash, StoredBlock>,
	undoable: HashMap<Hash, UndoableBlock>,
	pruned: HashSet<Hash>,
	head: Option<StoredBlock>,
}

impl InMemoryBlockStore {
	/// Builds an empty store. Callers are expected to seed genesis via
	/// `put` + `put_head` before handing this to the chain engine.
	pub fn new() -> InMemoryBlockStore {
		InMemoryBlockStore {
			inner: RwLock::new(Inner {
				blocks: HashMap::new(),
				undoable: HashMap::new(),
				pruned: HashSet::new(),
				head: None,
			}),
		}
	}

	/// Test/operator hook: simulates the store discarding a block's
	/// retained transactions and delta (e.g. after a configured prune
	/// depth), without forgetting the header itself. Used to exercise the
	/// `Pruned` error path (§8 S5).
	pub fn prune_undo(&self, hash: &Hash) {
		let mut inner = self.inner.write().unwrap();
		inner.undoable.remove(hash);
		inner.pruned.insert(*hash);
	}

	/// Number of stored blocks, for test assertions.
	pub fn len(&self) -> usize {
		self.inner.read().unwrap().blocks.len()
	}
}

impl Default for InMemoryBlockStore {
	fn default() -> Self {
		Self::new()
	}
}

impl BlockStore for InMemoryBlockStore {
	fn get(&self, hash: &Hash) -> Result<Option<StoredBlock>, Error> {
		Ok(self.inner.read().unwrap().blocks.get(hash).cloned())
	}

	fn get_head(&self) -> Result<Option<StoredBlock>, Error> {
		Ok(self.inner.read().unwrap().head.clone())
	}

	fn put_head(&self, block: &StoredBlock) -> Result<(), Error> {
		let mut inner = self.inner.write().unwrap();
		inner.head = Some(block.clone());
		Ok(())
	}

	fn put(&self, block: &StoredBlock, transactions: &[Transaction]) -> Result<(), Error> {
		let mut inner = self.inner.write().unwrap();
		log::debug!("store: persisting block {} at height {}", block.hash(), block.height);
		let hash = block.hash();
		inner.blocks.insert(hash, block.clone());
		if !transactions.is_empty() {
			inner.undoable.insert(
				hash,
				UndoableBlock {
					transactions: transactions.to_vec(),
					delta: None,
				},
			);
		}
		Ok(())
	}

	fn put_with_undo(&self, block: &StoredBlock, transactions: &[Transaction], delta: &UtxoDelta) -> Result<(), Error> {
		let mut inner = self.inner.write().unwrap();
		log::debug!("store: persisting block {} with undo data", block.hash());
		let hash = block.hash();
		inner.blocks.insert(hash, block.clone());
		inner.undoable.insert(
			hash,
			UndoableBlock {
				transactions: transactions.to_vec(),
				delta: Some(delta.clone()),
			},
		);
		inner.pruned.remove(&hash);
		Ok(())
	}

	fn get_undoable(&self, hash: &Hash) -> Result<Option<UndoableBlock>, Error> {
		Ok(self.inner.read().unwrap().undoable.get(hash).cloned())
	}
}
