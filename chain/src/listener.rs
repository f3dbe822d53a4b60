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

//! Ordered, per-listener delivery of inclusion and re-org events (§4.4,
//! C8). A listener is a wallet or other observer that wants to know
//! about transactions it cares about as the chain moves.

use lite_core::hash::Hash;
use lite_core::stored::StoredBlock;
use lite_core::block::Transaction;

/// Which role a transaction was observed in, per §4.4 / §8 property 7.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxKind {
	/// The transaction is part of the current best chain.
	BestChain,
	/// The transaction is part of a side chain that hasn't overtaken the
	/// best chain.
	SideChain,
}

/// The capability set a listener implements (§9 Design Notes:
/// "listener polymorphism"). All methods take `&mut self` because a
/// listener owns and mutates its own per-listener state (e.g. wallet
/// balance) as it observes events; the engine never shares that state.
pub trait Listener: Send {
	/// Whether `tx` is relevant to this listener, i.e. worth a callback.
	/// Implementations that fail to parse a transaction should log and
	/// return `false` rather than propagate (§7 "locally recovered").
	fn is_relevant(&mut self, tx: &Transaction) -> bool;

	/// Delivers a relevant transaction found in `stored` with role
	/// `kind`. Per the copy rule (§4.4), `tx` is this listener's own copy
	/// and may be held or mutated freely.
	fn receive_from_block(&mut self, tx: Transaction, stored: &StoredBlock, kind: TxKind);

	/// Delivers a transaction hash from a filtered block's matched set,
	/// for listeners that only have the hash and not the full body.
	fn notify_tx_in_block(&mut self, hash: Hash, stored: &StoredBlock, kind: TxKind);

	/// Called once per best-chain extension, after any per-transaction
	/// callbacks for that block.
	fn notify_new_best_block(&mut self, stored: &StoredBlock);

	/// Called once per re-org, in registration order, with the common
	/// ancestor and the two diverging paths (`old` newest-first, `new`
	/// newest-first, matching §4.2's collection order).
	fn reorganize(&mut self, split: &StoredBlock, old: &[StoredBlock], new: &[StoredBlock]);
}

/// Dispatches the per-transaction and per-block callbacks for a single
/// best-chain extension or side-chain sighting (§4.4). `full_txs` is the
/// ordered list of full transaction bodies available for this block (may
/// be empty for header-only or fully-filtered blocks); `filtered_hashes`
/// is the additional hash-only set carried by a filtered arrival.
pub fn dispatch_block_transactions(
	listeners: &mut [Box<dyn Listener>],
	full_txs: &[Transaction],
	filtered_hashes: &[Hash],
	stored: &StoredBlock,
	kind: TxKind,
) {
	for tx in full_txs {
		for listener in listeners.iter_mut() {
			if listener.is_relevant(tx) {
				// the copy rule: every listener gets an independent copy so
				// mutation by one can't alias another's view of the same
				// transaction object.
				let copy = tx.clone();
				listener.receive_from_block(copy, stored, kind);
			}
		}
	}
	for hash in filtered_hashes {
		for listener in listeners.iter_mut() {
			listener.notify_tx_in_block(*hash, stored, kind);
		}
	}
}

/// Calls `notify_new_best_block` on every listener, in registration
/// order (§4.4, after per-transaction callbacks on an extension).
pub fn dispatch_new_best_block(listeners: &mut [Box<dyn Listener>], stored: &StoredBlock) {
	for listener in listeners.iter_mut() {
		listener.notify_new_best_block(stored);
	}
}

/// Calls `reorganize` on every listener, in registration order,
/// tolerating a listener that removes itself mid-callback by capturing
/// identity via index rather than assuming a stable slice (§4.2 step 7).
pub fn dispatch_reorg(
	listeners: &mut [Box<dyn Listener>],
	split: &StoredBlock,
	old: &[StoredBlock],
	new: &[StoredBlock],
) {
	let mut i = 0;
	while i < listeners.len() {
		listeners[i].reorganize(split, old, new);
		i += 1;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use lite_core::block::{BlockHeader, OutPoint, TxIn, TxOut};
	use lite_core::hash::{Hashed, ZERO_HASH};
	use lite_core::target::{CompactTarget, Work};

	use std::sync::{Arc, Mutex};

	struct RecordingListener {
		seen: Arc<Mutex<Vec<(Hash, TxKind)>>>,
		best_block_calls: Arc<Mutex<usize>>,
	}

	impl Listener for RecordingListener {
		fn is_relevant(&mut self, _tx: &Transaction) -> bool {
			true
		}
		fn receive_from_block(&mut self, tx: Transaction, _stored: &StoredBlock, kind: TxKind) {
			self.seen.lock().unwrap().push((tx.hash(), kind));
		}
		fn notify_tx_in_block(&mut self, hash: Hash, _stored: &StoredBlock, kind: TxKind) {
			self.seen.lock().unwrap().push((hash, kind));
		}
		fn notify_new_best_block(&mut self, _stored: &StoredBlock) {
			*self.best_block_calls.lock().unwrap() += 1;
		}
		fn reorganize(&mut self, _split: &StoredBlock, _old: &[StoredBlock], _new: &[StoredBlock]) {}
	}

	fn stored_block() -> StoredBlock {
		let header = BlockHeader {
			version: 1,
			previous: ZERO_HASH,
			merkle_root: ZERO_HASH,
			timestamp: 0,
			bits: CompactTarget(0x207f_ffff),
			nonce: 0,
		};
		StoredBlock::genesis(header.clone(), Work::from_target(&header.bits.to_target()))
	}

	fn sample_tx(seq: u32) -> Transaction {
		Transaction {
			version: 1,
			lock_time: 0,
			inputs: vec![TxIn {
				previous_output: OutPoint { txid: ZERO_HASH, index: 0 },
				script_sig: vec![],
				sequence: seq,
			}],
			outputs: vec![TxOut { value: 10, script_pubkey: vec![] }],
		}
	}

	#[test]
	fn each_relevant_listener_receives_its_own_copy() {
		let seen_a = Arc::new(Mutex::new(Vec::new()));
		let seen_b = Arc::new(Mutex::new(Vec::new()));
		let best_a = Arc::new(Mutex::new(0));
		let best_b = Arc::new(Mutex::new(0));
		let mut listeners: Vec<Box<dyn Listener>> = vec![
			Box::new(RecordingListener { seen: seen_a.clone(), best_block_calls: best_a.clone() }),
			Box::new(RecordingListener { seen: seen_b.clone(), best_block_calls: best_b.clone() }),
		];
		let tx = sample_tx(1);
		let stored = stored_block();
		dispatch_block_transactions(&mut listeners, &[tx.clone()], &[], &stored, TxKind::BestChain);
		dispatch_new_best_block(&mut listeners, &stored);

		assert_eq!(seen_a.lock().unwrap().as_slice(), &[(tx.hash(), TxKind::BestChain)]);
		assert_eq!(seen_b.lock().unwrap().as_slice(), &[(tx.hash(), TxKind::BestChain)]);
		assert_eq!(*best_a.lock().unwrap(), 1);
		assert_eq!(*best_b.lock().unwrap(), 1);
	}

	#[test]
	fn filtered_hashes_trigger_notify_tx_in_block() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let best = Arc::new(Mutex::new(0));
		let mut listeners: Vec<Box<dyn Listener>> =
			vec![Box::new(RecordingListener { seen: seen.clone(), best_block_calls: best })];
		let stored = stored_block();
		let h = Hash::from_slice(&[5u8; 32]);
		dispatch_block_transactions(&mut listeners, &[], &[h], &stored, TxKind::SideChain);

		assert_eq!(seen.lock().unwrap().as_slice(), &[(h, TxKind::SideChain)]);
	}
}
