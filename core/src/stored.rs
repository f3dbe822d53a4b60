// Copyright 2016 The Grin Developers
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

//! The unit actually kept in the block store: a header enriched with the
//! position-dependent facts the chain needs (§3 "Stored block").

use crate::block::BlockHeader;
use crate::hash::{Hash, Hashed};
use crate::target::Work;

/// A header plus its height and cumulative proof-of-work, as kept in the
/// block store. Two `StoredBlock`s with the same header always carry the
/// same height and work: both are pure functions of the chain of headers
/// leading up to and including this one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
	/// The header itself.
	pub header: BlockHeader,
	/// Distance from genesis: genesis is height 0.
	pub height: u64,
	/// Sum of every ancestor's (and this header's) individual work.
	pub total_work: Work,
}

impl StoredBlock {
	/// Builds the genesis `StoredBlock`: height 0, work equal to its own
	/// contribution.
	pub fn genesis(header: BlockHeader, own_work: Work) -> StoredBlock {
		StoredBlock {
			header,
			height: 0,
			total_work: own_work,
		}
	}

	/// Derives a child `StoredBlock` from its parent and its own header,
	/// per §3: height is the parent's plus one, and total work is the
	/// parent's total work plus the new header's own contribution.
	pub fn child(parent: &StoredBlock, header: BlockHeader, own_work: Work) -> StoredBlock {
		StoredBlock {
			header,
			height: parent.height + 1,
			total_work: parent.total_work.clone() + own_work,
		}
	}

	/// The identifying hash of the stored header.
	pub fn hash(&self) -> Hash {
		self.header.hash()
	}

	/// The hash of this block's parent.
	pub fn previous(&self) -> Hash {
		self.header.previous
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hash::ZERO_HASH;
	use crate::target::CompactTarget;

	fn header(previous: Hash, nonce: u32) -> BlockHeader {
		BlockHeader {
			version: 1,
			previous,
			merkle_root: ZERO_HASH,
			timestamp: 0,
			bits: CompactTarget(0x207f_ffff),
			nonce,
		}
	}

	#[test]
	fn child_height_and_work_derive_from_parent() {
		let genesis = StoredBlock::genesis(header(ZERO_HASH, 0), Work::from_target(&CompactTarget(0x207f_ffff).to_target()));
		let own_work = Work::from_target(&CompactTarget(0x207f_ffff).to_target());
		let child = StoredBlock::child(&genesis, header(genesis.hash(), 1), own_work.clone());
		assert_eq!(child.height, 1);
		assert_eq!(child.total_work, genesis.total_work.clone() + own_work);
		assert_eq!(child.previous(), genesis.hash());
	}
}
