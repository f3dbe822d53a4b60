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

//! The undo data a full-mode block connection produces (§3 "UTXO delta"),
//! and the bundle of data a store retains so a block can later be
//! reconnected during a re-org.

use lite_core::block::{OutPoint, Transaction, TxOut};

/// Exactly what connecting a block did to the UTXO set: outputs it
/// created and outputs it consumed. Sufficient, on its own, to revert the
/// connection during a re-org (I5).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UtxoDelta {
	/// Outputs newly created by this block's transactions.
	pub outputs_added: Vec<(OutPoint, TxOut)>,
	/// Outputs this block's transactions consumed.
	pub outputs_consumed: Vec<(OutPoint, TxOut)>,
}

impl UtxoDelta {
	/// An empty delta, for header-only blocks that never touch the UTXO
	/// set.
	pub fn empty() -> UtxoDelta {
		UtxoDelta::default()
	}
}

/// What `get_undoable` returns for a block the store still has full data
/// for: the transactions it carried, and — if the block was actually
/// connected to the best chain at some point — the delta that
/// connection produced. A store is free to discard this (retaining only
/// the header, height and work, fetchable via `get`) once it decides the
/// block is unlikely to be needed again; `get_undoable` then returns
/// `None` and the caller raises `Pruned` (§4.6, §7).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoableBlock {
	/// The block's transactions, in order.
	pub transactions: Vec<Transaction>,
	/// The UTXO delta produced by connecting them, if this block was
	/// ever actually connected (as opposed to only ever sitting on a
	/// side branch).
	pub delta: Option<UtxoDelta>,
}
