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

//! The chain engine (§4, §5, C7): the single entry point a network layer
//! calls as blocks arrive, and the state machine that keeps the best
//! chain, the orphan pool and registered listeners in sync with it.

use std::sync::{Arc, Mutex, RwLock};

use lite_core::block::{Block, BlockHeader, Body};
use lite_core::hash::Hash;
use lite_core::params::NetworkParams;
use lite_core::stored::StoredBlock;
use lite_core::target::Work;
use lite_store::{BlockStore, UtxoDelta};

use crate::error::{Error, ErrorKind};
use crate::listener::{dispatch_block_transactions, dispatch_new_best_block, dispatch_reorg, Listener, TxKind};
use crate::orphan::{OrphanBlock, OrphanPool};
use crate::verifier::{verify_header, ChainVerifier, HeaderChainView};

/// The chain engine. Owns no network or wallet logic of its own; it is
/// driven by a caller handing it blocks one at a time via `add`, and
/// reports back through registered `Listener`s (§4.4, C8).
///
/// Two locks guard independent concerns (§5): `engine_lock` serializes
/// the whole add/reorg sequence so a second arrival can't interleave with
/// a reorg in progress, and `head` is a fast-path cache of the store's
/// own durable head pointer so readers don't need the engine lock just
/// to ask how tall the chain is.
pub struct Chain {
	store: Arc<dyn BlockStore>,
	verifier: Box<dyn ChainVerifier>,
	params: Box<dyn NetworkParams>,
	orphans: OrphanPool,
	listeners: Mutex<Vec<Box<dyn Listener>>>,
	engine_lock: Mutex<()>,
	head: RwLock<StoredBlock>,
}

impl Chain {
	/// Opens a chain backed by `store`. If the store is empty this seeds
	/// `genesis` directly, bypassing header verification entirely: the
	/// genesis header has no parent to verify against (§4, §5).
	pub fn new(
		store: Arc<dyn BlockStore>,
		verifier: Box<dyn ChainVerifier>,
		params: Box<dyn NetworkParams>,
		genesis: BlockHeader,
	) -> Result<Chain, Error> {
		let head = match store.get_head()? {
			Some(head) => head,
			None => {
				let own_work = Work::from_target(&genesis.bits.to_target());
				let stored = StoredBlock::genesis(genesis, own_work);
				store.put(&stored, &[])?;
				store.put_head(&stored)?;
				stored
			}
		};
		Ok(Chain {
			store,
			verifier,
			params,
			orphans: OrphanPool::new(),
			listeners: Mutex::new(Vec::new()),
			engine_lock: Mutex::new(()),
			head: RwLock::new(head),
		})
	}

	/// Registers a listener. Delivery order for future events follows
	/// registration order (§4.4).
	pub fn add_listener(&self, listener: Box<dyn Listener>) {
		self.listeners.lock().unwrap().push(listener);
	}

	/// Alias for `add_listener`: a wallet is, to the engine, just a
	/// listener (§9 "listener polymorphism").
	pub fn add_wallet(&self, wallet: Box<dyn Listener>) {
		self.add_listener(wallet);
	}

	/// Unregisters the listener at `index` (registration order), if any.
	pub fn remove_listener(&self, index: usize) -> Option<Box<dyn Listener>> {
		let mut listeners = self.listeners.lock().unwrap();
		if index < listeners.len() {
			Some(listeners.remove(index))
		} else {
			None
		}
	}

	/// Height of the current best chain.
	pub fn best_height(&self) -> u64 {
		self.head.read().unwrap().height
	}

	/// The current best chain's tip.
	pub fn chain_head(&self) -> StoredBlock {
		self.head.read().unwrap().clone()
	}

	/// True if `hash` names a block currently held in the orphan pool.
	pub fn is_orphan(&self, hash: &Hash) -> bool {
		self.orphans.contains(hash)
	}

	/// The earliest pending ancestor of orphan `hash`, i.e. the block a
	/// network layer should fetch next to unblock replay (§4.3).
	pub fn orphan_root(&self, hash: &Hash) -> Option<Hash> {
		self.orphans.orphan_root(hash)
	}

	/// A rough timestamp estimate for `height`, linearly extrapolated from
	/// the current tip at the network's target block spacing. Useful for
	/// a wallet deciding how far back to rescan; not a consensus value.
	pub fn estimate_block_time(&self, height: u64) -> i64 {
		let head = self.head.read().unwrap();
		let delta = height as i64 - head.height as i64;
		head.header.timestamp + delta * self.params.target_spacing()
	}

	/// Submits `block` to the chain (§4.1). Returns `Ok(true)` if the
	/// block is now (or already was) linked into known chain state,
	/// `Ok(false)` if it was filed as an orphan or left on a losing side
	/// branch pending more work.
	pub fn add(&self, block: Block) -> Result<bool, Error> {
		let _guard = self.engine_lock.lock().unwrap();
		self.add_locked(block)
	}

	fn add_locked(&self, block: Block) -> Result<bool, Error> {
		let hash = block.hash();

		// step 1: dedup. A block already in the store is accepted silently
		// with no further listener notification (§8 duplicate-submit case);
		// one already pending as an orphan is left alone.
		if self.store.get(&hash)?.is_some() {
			log::debug!("chain: block {} already known, ignoring", hash);
			return Ok(true);
		}
		if self.orphans.contains(&hash) {
			log::debug!("chain: block {} already pending as an orphan", hash);
			return Ok(false);
		}

		// step 2: mode check. Full-verify mode needs the complete
		// transaction list to run UTXO bookkeeping; a filtered or
		// header-only body isn't enough.
		if self.verifier.should_verify_transactions() && !matches!(block.body, Body::Full(_)) {
			return Err(Error::verification(hash, "full verification requires a complete transaction body"));
		}

		// step 3: any body carrying a complete transaction set must be
		// internally consistent and match the header's advertised root.
		if !block.body.is_well_formed() {
			return Err(Error::verification(hash, "filtered body contains an unlisted match"));
		}
		if let Some(computed) = block.computed_merkle_root() {
			if computed != block.header.merkle_root {
				return Err(Error::verification(hash, "merkle root does not match transaction set"));
			}
		}

		let (full_txs, filtered_hashes) = match &block.body {
			Body::HeaderOnly => (Vec::new(), Vec::new()),
			Body::Full(txs) => (txs.clone(), Vec::new()),
			Body::Filtered { tx_hashes, .. } => (Vec::new(), tx_hashes.clone()),
		};

		// step 4: parent lookup. No parent on record yet means orphan.
		let parent = match self.store.get(&block.header.previous)? {
			Some(parent) => parent,
			None => {
				log::debug!("chain: block {} is an orphan awaiting parent {}", hash, block.header.previous);
				let (filtered_tx_hashes, filtered_tx_bodies) = match &block.body {
					Body::Filtered { tx_hashes, matched } => (Some(tx_hashes.clone()), Some(matched.clone())),
					_ => (None, None),
				};
				self.orphans.add(OrphanBlock {
					block,
					filtered_tx_hashes,
					filtered_tx_bodies,
				});
				return Ok(false);
			}
		};

		// step 5: header verification (PoW, timestamp, version, difficulty
		// transition, checkpoint), consolidated into one pass now that the
		// parent is in hand.
		let view = StoreAncestorView {
			store: self.store.as_ref(),
			start: parent.clone(),
		};
		verify_header(self.params.as_ref(), &block.header, &parent, &view)?;

		let own_work = Work::from_target(&block.header.bits.to_target());
		let candidate = StoredBlock::child(&parent, block.header.clone(), own_work);
		let current_head = self.head.read().unwrap().clone();

		if parent.hash() == current_head.hash() {
			// step 6/9: straight extension of the best chain. Connect now,
			// since this is the only point a freshly-arrived block's
			// transactions are ever validated against the live UTXO set.
			let delta = self.verifier.connect(&full_txs, candidate.height, candidate.header.timestamp)?;
			self.store.put_with_undo(&candidate, &full_txs, &delta)?;
			self.store.put_head(&candidate)?;
			*self.head.write().unwrap() = candidate.clone();

			let mut listeners = self.listeners.lock().unwrap();
			dispatch_block_transactions(&mut listeners, &full_txs, &filtered_hashes, &candidate, TxKind::BestChain);
			dispatch_new_best_block(&mut listeners, &candidate);
			drop(listeners);

			self.replay_orphans(&hash)?;
			return Ok(true);
		}

		// side branch: the block is valid but not an extension of the
		// current tip. Persist its body without connecting it so a later
		// re-org can connect it for the first time (§4.1 step 9, §4.2).
		self.store.put(&candidate, &full_txs)?;

		if candidate.total_work > current_head.total_work {
			let mut listeners = self.listeners.lock().unwrap();
			dispatch_block_transactions(&mut listeners, &full_txs, &filtered_hashes, &candidate, TxKind::SideChain);
			drop(listeners);

			self.reorganize(&candidate)?;
			self.replay_orphans(&hash)?;
			return Ok(true);
		}

		log::debug!(
			"chain: block {} extends a side branch at height {}, less work than the current tip",
			hash,
			candidate.height
		);
		let mut listeners = self.listeners.lock().unwrap();
		dispatch_block_transactions(&mut listeners, &full_txs, &filtered_hashes, &candidate, TxKind::SideChain);
		drop(listeners);

		self.replay_orphans(&hash)?;
		Ok(false)
	}

	/// Replays orphans that become connectable once `parent_hash` is
	/// known, to a fixed point: a replayed block may itself unblock
	/// further orphans (§4.3 step 10).
	fn replay_orphans(&self, parent_hash: &Hash) -> Result<(), Error> {
		let mut frontier = vec![*parent_hash];
		while let Some(parent) = frontier.pop() {
			for child_hash in self.orphans.children_of(&parent) {
				if let Some(orphan) = self.orphans.remove(&child_hash) {
					self.add_locked(orphan.block)?;
					frontier.push(child_hash);
				}
			}
		}
		Ok(())
	}

	/// Switches the best chain to `candidate` (§4.2): finds the common
	/// ancestor, disconnects the losing path newest-first, connects the
	/// winning path oldest-first, and delivers exactly one `reorganize`
	/// event per listener.
	fn reorganize(&self, candidate: &StoredBlock) -> Result<(), Error> {
		let current_head = self.head.read().unwrap().clone();
		let (split, old_path, new_path) = self.find_split(&current_head, candidate)?;

		log::debug!(
			"chain: reorganizing from {} to {}, split at height {}",
			current_head.hash(),
			candidate.hash(),
			split.height
		);

		for stored in &old_path {
			let undoable = self
				.store
				.get_undoable(&stored.hash())?
				.ok_or_else(|| ErrorKind::Pruned(stored.hash()))?;
			if let Some(delta) = &undoable.delta {
				self.verifier.disconnect(delta)?;
			}
		}

		for stored in new_path.iter().rev() {
			let transactions = if self.verifier.should_verify_transactions() {
				self.store
					.get_undoable(&stored.hash())?
					.ok_or_else(|| ErrorKind::Pruned(stored.hash()))?
					.transactions
			} else {
				Vec::new()
			};
			let delta = self.verifier.connect(&transactions, stored.height, stored.header.timestamp)?;
			self.store.put_with_undo(stored, &transactions, &delta)?;
		}

		self.store.put_head(candidate)?;
		*self.head.write().unwrap() = candidate.clone();

		let mut listeners = self.listeners.lock().unwrap();
		dispatch_new_best_block(&mut listeners, candidate);
		dispatch_reorg(&mut listeners, &split, &old_path, &new_path);

		Ok(())
	}

	/// Walks both chains back to their common ancestor, returning the
	/// split block plus the two diverging paths, each newest-first.
	fn find_split(&self, a: &StoredBlock, b: &StoredBlock) -> Result<(StoredBlock, Vec<StoredBlock>, Vec<StoredBlock>), Error> {
		let mut old_path = Vec::new();
		let mut new_path = Vec::new();
		let mut x = a.clone();
		let mut y = b.clone();

		while x.height > y.height {
			old_path.push(x.clone());
			x = self.ancestor(&x)?;
		}
		while y.height > x.height {
			new_path.push(y.clone());
			y = self.ancestor(&y)?;
		}
		while x.hash() != y.hash() {
			old_path.push(x.clone());
			new_path.push(y.clone());
			x = self.ancestor(&x)?;
			y = self.ancestor(&y)?;
		}
		Ok((x, old_path, new_path))
	}

	fn ancestor(&self, stored: &StoredBlock) -> Result<StoredBlock, Error> {
		self.store
			.get(&stored.previous())?
			.ok_or_else(|| ErrorKind::Store(format!("missing ancestor {} while finding split point", stored.previous())).into())
	}
}

/// A `HeaderChainView` that walks a specific ancestor chain backward from
/// `start`, rather than the engine's current best chain: a candidate
/// header being verified may sit on a side branch whose retarget window
/// differs from the head's.
struct StoreAncestorView<'a> {
	store: &'a dyn BlockStore,
	start: StoredBlock,
}

impl<'a> HeaderChainView for StoreAncestorView<'a> {
	fn header_at_height(&self, height: u64) -> Option<BlockHeader> {
		if height > self.start.height {
			return None;
		}
		let mut current = self.start.clone();
		while current.height > height {
			current = match self.store.get(&current.previous()) {
				Ok(Some(stored)) => stored,
				_ => return None,
			};
		}
		Some(current.header)
	}
}
