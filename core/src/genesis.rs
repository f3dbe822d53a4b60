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

//! Concrete genesis headers. The genesis block has no parent and is
//! never run through header verification (§4, §5): it is seeded directly
//! into the block store when a chain is opened for the first time.

use crate::block::BlockHeader;
use crate::hash::ZERO_HASH;
use crate::target::CompactTarget;

/// The main net genesis header.
pub fn mainnet_genesis() -> BlockHeader {
	BlockHeader {
		version: 1,
		previous: ZERO_HASH,
		merkle_root: ZERO_HASH,
		timestamp: 1_231_006_505,
		bits: CompactTarget(0x1d00_ffff),
		nonce: 2_083_236_893,
	}
}

/// The test net genesis header: same timestamp and structure as main net
/// but mined (for our purposes, assumed) against the loosest possible
/// target so test fixtures don't need real proof-of-work.
pub fn testnet_genesis() -> BlockHeader {
	BlockHeader {
		version: 1,
		previous: ZERO_HASH,
		merkle_root: ZERO_HASH,
		timestamp: 1_296_688_602,
		bits: CompactTarget(0x207f_ffff),
		nonce: 0,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hash::Hashed;

	#[test]
	fn genesis_headers_have_no_parent() {
		assert_eq!(mainnet_genesis().previous, ZERO_HASH);
		assert_eq!(testnet_genesis().previous, ZERO_HASH);
	}

	#[test]
	fn genesis_headers_hash_deterministically() {
		let a = mainnet_genesis().hash();
		let b = mainnet_genesis().hash();
		assert_eq!(a, b);
	}
}
