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

//! Concrete end-to-end scenarios exercising the chain engine with a full
//! UTXO-verifying connector and real listeners, rather than the engine's
//! own header-only unit tests.

extern crate env_logger;

use std::sync::{Arc, Mutex};

use lite_chain::{Chain, FullVerifier, Listener, TxKind};
use lite_core::block::{Block, BlockHeader, Body, OutPoint, Transaction, TxIn, TxOut};
use lite_core::hash::{Hash, Hashed, ZERO_HASH};
use lite_core::merkle;
use lite_core::params::TestNetParams;
use lite_core::stored::StoredBlock;
use lite_core::target::CompactTarget;
use lite_store::InMemoryBlockStore;
use lite_util::init_test_logger;

fn genesis_header() -> BlockHeader {
	BlockHeader {
		version: 1,
		previous: ZERO_HASH,
		merkle_root: ZERO_HASH,
		timestamp: 10_000,
		bits: CompactTarget(0x207f_ffff),
		nonce: 0,
	}
}

fn coinbase_tx(seq: u32, value: u64) -> Transaction {
	Transaction {
		version: 1,
		lock_time: 0,
		inputs: vec![TxIn {
			previous_output: OutPoint { txid: ZERO_HASH, index: 0 },
			script_sig: vec![],
			sequence: seq,
		}],
		outputs: vec![TxOut { value, script_pubkey: vec![] }],
	}
}

fn full_block(previous: Hash, timestamp: i64, nonce: u32, txs: Vec<Transaction>) -> Block {
	let hashes: Vec<Hash> = txs.iter().map(|t| t.hash()).collect();
	let header = BlockHeader {
		version: 1,
		previous,
		merkle_root: merkle::merkle_root(&hashes),
		timestamp,
		bits: CompactTarget(0x207f_ffff),
		nonce,
	};
	Block {
		header,
		body: Body::Full(txs),
	}
}

fn new_chain() -> Chain {
	let store = Arc::new(InMemoryBlockStore::new());
	Chain::new(store, Box::new(FullVerifier::new()), Box::new(TestNetParams::new()), genesis_header()).unwrap()
}

#[derive(Default)]
struct RecordingWallet {
	best_chain_hits: Arc<Mutex<Vec<Hash>>>,
	side_chain_hits: Arc<Mutex<Vec<Hash>>>,
	best_block_calls: Arc<Mutex<usize>>,
	reorg_calls: Arc<Mutex<usize>>,
}

impl Listener for RecordingWallet {
	fn is_relevant(&mut self, _tx: &Transaction) -> bool {
		true
	}

	fn receive_from_block(&mut self, tx: Transaction, _stored: &StoredBlock, kind: TxKind) {
		match kind {
			TxKind::BestChain => self.best_chain_hits.lock().unwrap().push(tx.hash()),
			TxKind::SideChain => self.side_chain_hits.lock().unwrap().push(tx.hash()),
		}
	}

	fn notify_tx_in_block(&mut self, _hash: Hash, _stored: &StoredBlock, _kind: TxKind) {}

	fn notify_new_best_block(&mut self, _stored: &StoredBlock) {
		*self.best_block_calls.lock().unwrap() += 1;
	}

	fn reorganize(&mut self, _split: &StoredBlock, _old: &[StoredBlock], _new: &[StoredBlock]) {
		*self.reorg_calls.lock().unwrap() += 1;
	}
}

/// S1: three blocks arriving in order extend the head linearly with one
/// `notify_new_best_block` per block and no reorgs.
#[test]
fn linear_extension_notifies_each_block_once() {
	init_test_logger();
	let _ = env_logger::init();
	let chain = new_chain();
	let best_block_calls = Arc::new(Mutex::new(0));
	let reorg_calls = Arc::new(Mutex::new(0));
	chain.add_listener(Box::new(RecordingWallet {
		best_block_calls: best_block_calls.clone(),
		reorg_calls: reorg_calls.clone(),
		..Default::default()
	}));

	let genesis_hash = chain.chain_head().hash();
	let b1 = full_block(genesis_hash, 10_100, 1, vec![coinbase_tx(1, 50)]);
	let b1_hash = b1.hash();
	let b2 = full_block(b1_hash, 10_200, 2, vec![coinbase_tx(2, 50)]);
	let b2_hash = b2.hash();
	let b3 = full_block(b2_hash, 10_300, 3, vec![coinbase_tx(3, 50)]);
	let b3_hash = b3.hash();

	assert!(chain.add(b1).unwrap());
	assert!(chain.add(b2).unwrap());
	assert!(chain.add(b3).unwrap());

	assert_eq!(chain.best_height(), 3);
	assert_eq!(chain.chain_head().hash(), b3_hash);
	assert_eq!(*best_block_calls.lock().unwrap(), 3);
	assert_eq!(*reorg_calls.lock().unwrap(), 0);
}

/// S2: submitting the tip of a three-block run before its ancestors files
/// it as an orphan; once the chain catches up, replay connects it with no
/// duplicate best-chain notification.
#[test]
fn orphan_is_replayed_exactly_once_when_parent_catches_up() {
	init_test_logger();
	let _ = env_logger::init();
	let chain = new_chain();
	let hits = Arc::new(Mutex::new(Vec::new()));
	chain.add_listener(Box::new(RecordingWallet {
		best_chain_hits: hits.clone(),
		..Default::default()
	}));

	let genesis_hash = chain.chain_head().hash();
	let tx1 = coinbase_tx(1, 50);
	let tx1_hash = tx1.hash();
	let b1 = full_block(genesis_hash, 10_100, 1, vec![tx1]);
	let b1_hash = b1.hash();

	let tx2 = coinbase_tx(2, 50);
	let tx2_hash = tx2.hash();
	let b2 = full_block(b1_hash, 10_200, 2, vec![tx2]);
	let b2_hash = b2.hash();

	assert!(!chain.add(b2).unwrap());
	assert!(chain.is_orphan(&b2_hash));
	assert_eq!(chain.orphan_root(&b2_hash), Some(b2_hash));

	assert!(chain.add(b1).unwrap());
	assert!(!chain.is_orphan(&b2_hash));
	assert_eq!(chain.chain_head().hash(), b2_hash);
	assert_eq!(chain.best_height(), 2);

	let seen = hits.lock().unwrap();
	assert_eq!(seen.as_slice(), &[tx1_hash, tx2_hash]);
}

/// S4: a competing branch with strictly greater work triggers exactly one
/// `reorganize` call and leaves the UTXO set reflecting only the winning
/// branch's coinbases.
#[test]
fn higher_work_side_chain_reorgs_and_rewrites_utxo_view() {
	init_test_logger();
	let _ = env_logger::init();
	let chain = new_chain();
	let reorg_calls = Arc::new(Mutex::new(0));
	let side_chain_hits = Arc::new(Mutex::new(Vec::new()));
	chain.add_listener(Box::new(RecordingWallet {
		reorg_calls: reorg_calls.clone(),
		side_chain_hits: side_chain_hits.clone(),
		..Default::default()
	}));

	let genesis_hash = chain.chain_head().hash();
	let b1 = full_block(genesis_hash, 10_100, 1, vec![coinbase_tx(1, 50)]);
	let b1_hash = b1.hash();
	assert!(chain.add(b1).unwrap());

	// a competing branch off genesis, one block taller than b1 alone, but
	// the decisive extra work comes from its second block.
	let tx11 = coinbase_tx(11, 50);
	let tx11_hash = tx11.hash();
	let b1_prime = full_block(genesis_hash, 10_150, 11, vec![tx11]);
	let b1_prime_hash = b1_prime.hash();
	assert!(!chain.add(b1_prime).unwrap());
	assert_eq!(chain.chain_head().hash(), b1_hash);

	let tx12 = coinbase_tx(12, 50);
	let tx12_hash = tx12.hash();
	let b2_prime = full_block(b1_prime_hash, 10_250, 12, vec![tx12]);
	let b2_prime_hash = b2_prime.hash();
	assert!(chain.add(b2_prime).unwrap());

	assert_eq!(chain.chain_head().hash(), b2_prime_hash);
	assert_eq!(chain.best_height(), 2);
	assert_eq!(*reorg_calls.lock().unwrap(), 1);

	// both b1_prime and the overtaking b2_prime must have had their own
	// transactions delivered in the side-chain role: b1_prime because it
	// never overtook on its own, and b2_prime because side-chain events
	// for the overtaking candidate are dispatched before the reorg runs.
	assert_eq!(side_chain_hits.lock().unwrap().as_slice(), &[tx11_hash, tx12_hash]);
}

/// S5: if the store has discarded a losing branch's undo data, a reorg
/// that would need it fails with `Pruned` and the head does not move.
#[test]
fn pruned_undo_data_blocks_a_would_be_reorg() {
	init_test_logger();
	let _ = env_logger::init();
	let store = Arc::new(InMemoryBlockStore::new());
	let chain = Chain::new(store.clone(), Box::new(FullVerifier::new()), Box::new(TestNetParams::new()), genesis_header()).unwrap();

	let genesis_hash = chain.chain_head().hash();
	let b1 = full_block(genesis_hash, 10_100, 1, vec![coinbase_tx(1, 50)]);
	let b1_hash = b1.hash();
	assert!(chain.add(b1).unwrap());
	store.prune_undo(&b1_hash);

	let b1_prime = full_block(genesis_hash, 10_150, 11, vec![coinbase_tx(11, 50)]);
	let b1_prime_hash = b1_prime.hash();
	assert!(!chain.add(b1_prime).unwrap());

	let b2_prime = full_block(b1_prime_hash, 10_250, 12, vec![coinbase_tx(12, 50)]);
	let result = chain.add(b2_prime);

	assert!(result.is_err());
	assert_eq!(chain.chain_head().hash(), b1_hash);
	assert_eq!(chain.best_height(), 1);
}

/// S6: resubmitting a block already on the best chain is accepted again
/// but fires no further listener notifications.
#[test]
fn duplicate_submit_fires_no_additional_notifications() {
	init_test_logger();
	let _ = env_logger::init();
	let chain = new_chain();
	let best_block_calls = Arc::new(Mutex::new(0));
	let hits = Arc::new(Mutex::new(Vec::new()));
	chain.add_listener(Box::new(RecordingWallet {
		best_chain_hits: hits.clone(),
		best_block_calls: best_block_calls.clone(),
		..Default::default()
	}));

	let genesis_hash = chain.chain_head().hash();
	let tx = coinbase_tx(1, 50);
	let tx_hash = tx.hash();
	let b1 = full_block(genesis_hash, 10_100, 1, vec![tx]);

	assert!(chain.add(b1.clone()).unwrap());
	assert_eq!(*best_block_calls.lock().unwrap(), 1);
	assert_eq!(hits.lock().unwrap().as_slice(), &[tx_hash]);

	assert!(chain.add(b1).unwrap());
	assert_eq!(*best_block_calls.lock().unwrap(), 1);
	assert_eq!(hits.lock().unwrap().as_slice(), &[tx_hash]);
}
