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

//! Network-specific consensus parameters: the knobs that make header
//! verification (§4) differ between main net and test net.

use std::collections::HashMap;

use crate::hash::Hash;
use crate::target::CompactTarget;

/// Consensus parameters a network's headers must satisfy. Implementations
/// exist for main net and test net; the chain engine is generic over this
/// trait rather than hard-coding constants.
pub trait NetworkParams: Send + Sync {
	/// Loosest difficulty target any header may claim.
	fn pow_limit(&self) -> CompactTarget;

	/// Target spacing between blocks, in seconds.
	fn target_spacing(&self) -> i64;

	/// Number of blocks between difficulty retargets.
	fn difficulty_adjustment_interval(&self) -> u64;

	/// Total span, in seconds, the retarget window is expected to cover
	/// (`difficulty_adjustment_interval * target_spacing`).
	fn target_timespan(&self) -> i64 {
		self.difficulty_adjustment_interval() as i64 * self.target_spacing()
	}

	/// Whether this network relaxes difficulty after a long block gap
	/// (§4, the "20-minute rule"): if the next block's timestamp is more
	/// than `2 * target_spacing` past the previous block, the minimum
	/// difficulty target is allowed.
	fn allows_min_difficulty_blocks(&self) -> bool {
		false
	}

	/// Known-good header hashes at specific heights (§4.1 step 7). A
	/// header at a checkpointed height must match the checkpoint exactly.
	fn checkpoints(&self) -> &HashMap<u64, Hash>;

	/// Height below which header verification accepts blocks without
	/// independently recomputing difficulty, trusting the checkpoint
	/// chain above. `0` disables this shortcut entirely.
	fn last_checkpoint_height(&self) -> u64 {
		self.checkpoints().keys().copied().max().unwrap_or(0)
	}

	/// How far past the verifier's wall-clock a header's timestamp may
	/// sit and still be accepted (§4.1 step 6, the "future block" rule).
	/// Two hours, matching the usual Bitcoin-style allowance for clock
	/// drift between peers.
	fn max_future_time_drift(&self) -> i64 {
		2 * 60 * 60
	}
}

/// Production network parameters.
pub struct MainNetParams {
	checkpoints: HashMap<u64, Hash>,
}

impl MainNetParams {
	/// Builds the main net parameter set with its checkpoint list.
	pub fn new() -> MainNetParams {
		MainNetParams {
			checkpoints: HashMap::new(),
		}
	}
}

impl Default for MainNetParams {
	fn default() -> Self {
		Self::new()
	}
}

impl NetworkParams for MainNetParams {
	fn pow_limit(&self) -> CompactTarget {
		CompactTarget(0x1d00_ffff)
	}

	fn target_spacing(&self) -> i64 {
		600
	}

	fn difficulty_adjustment_interval(&self) -> u64 {
		2016
	}

	fn checkpoints(&self) -> &HashMap<u64, Hash> {
		&self.checkpoints
	}
}

/// Test network parameters: same target spacing and retarget interval as
/// main net, but a looser `pow_limit` and the min-difficulty relaxation
/// rule enabled, and no checkpoints to pin against.
pub struct TestNetParams {
	checkpoints: HashMap<u64, Hash>,
}

impl TestNetParams {
	/// Builds the test net parameter set.
	pub fn new() -> TestNetParams {
		TestNetParams {
			checkpoints: HashMap::new(),
		}
	}
}

impl Default for TestNetParams {
	fn default() -> Self {
		Self::new()
	}
}

impl NetworkParams for TestNetParams {
	fn pow_limit(&self) -> CompactTarget {
		CompactTarget(0x1d00_ffff)
	}

	fn target_spacing(&self) -> i64 {
		600
	}

	fn difficulty_adjustment_interval(&self) -> u64 {
		2016
	}

	fn allows_min_difficulty_blocks(&self) -> bool {
		true
	}

	fn checkpoints(&self) -> &HashMap<u64, Hash> {
		&self.checkpoints
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn target_timespan_is_interval_times_spacing() {
		let params = MainNetParams::new();
		assert_eq!(
			params.target_timespan(),
			2016 * 600
		);
	}

	#[test]
	fn testnet_allows_min_difficulty_mainnet_does_not() {
		assert!(TestNetParams::new().allows_min_difficulty_blocks());
		assert!(!MainNetParams::new().allows_min_difficulty_blocks());
	}
}
