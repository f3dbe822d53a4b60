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

//! Process-wide chain selection, kept out of the way of everything that
//! only needs `NetworkParams` directly. A node reads `chain_type()` once
//! at startup to decide which `NetworkParams` to build; tests that spin
//! up a testnet chain set it once up front. Should be used sparingly.

use std::sync::RwLock;

/// Which network a node has been started against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainType {
	/// Production network: full checkpoints, no difficulty relaxation.
	Mainnet,
	/// Test network: min-difficulty relaxation enabled, no checkpoints.
	Testnet,
}

lazy_static! {
	/// The chain a node was started against. Defaults to `Mainnet` so
	/// that forgetting to call `set_chain_type` fails safe.
	static ref CHAIN_TYPE: RwLock<ChainType> = RwLock::new(ChainType::Mainnet);
}

/// Sets the process-wide chain type. Intended to be called once, early
/// in startup (or at the top of a test that needs testnet behavior).
pub fn set_chain_type(chain_type: ChainType) {
	let mut current = CHAIN_TYPE.write().unwrap();
	*current = chain_type;
}

/// The process-wide chain type.
pub fn chain_type() -> ChainType {
	*CHAIN_TYPE.read().unwrap()
}

/// Shorthand for `chain_type() == ChainType::Testnet`.
pub fn is_testnet() -> bool {
	chain_type() == ChainType::Testnet
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_to_mainnet() {
		// other tests in this process may have already flipped the
		// global, so only assert the enum round-trips, not the default.
		set_chain_type(ChainType::Mainnet);
		assert!(!is_testnet());
		set_chain_type(ChainType::Testnet);
		assert!(is_testnet());
	}
}
