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

//! Merkle root computation and the partial Merkle tree used to encode a
//! filtered block's matched-transaction flags (§6).

use failure::Fail;

use crate::hash::{Hash, Hashed};

/// Computes the root of the binary Merkle tree over `leaves`, duplicating
/// the last node at each level when the level has odd length. Returns the
/// zero hash for an empty leaf set (header-only blocks have no body to
/// commit to).
pub fn merkle_root(leaves: &[Hash]) -> Hash {
	if leaves.is_empty() {
		return crate::hash::ZERO_HASH;
	}
	let mut level: Vec<Hash> = leaves.to_vec();
	while level.len() > 1 {
		if level.len() % 2 == 1 {
			let last = *level.last().unwrap();
			level.push(last);
		}
		level = level
			.chunks(2)
			.map(|pair| combine(&pair[0], &pair[1]))
			.collect();
	}
	level[0]
}

fn combine(left: &Hash, right: &Hash) -> Hash {
	let mut bytes = Vec::with_capacity(64);
	bytes.extend_from_slice(left.as_bytes());
	bytes.extend_from_slice(right.as_bytes());
	bytes.hash()
}

/// Errors raised while reconstructing a partial Merkle tree.
#[derive(Debug, Fail, PartialEq, Eq)]
pub enum MerkleError {
	/// The flag bitstream ran out before every branch was resolved.
	#[fail(display = "partial merkle tree: ran out of flag bits")]
	NotEnoughBits,
	/// The hash list ran out before every branch was resolved.
	#[fail(display = "partial merkle tree: ran out of hashes")]
	NotEnoughHashes,
	/// Not every supplied flag bit or hash was consumed.
	#[fail(display = "partial merkle tree: unused flags or hashes")]
	UnusedData,
	/// A branch produced identical left/right children, which would allow
	/// a forged duplicate-transaction attack (CVE-2012-2459 style).
	#[fail(display = "partial merkle tree: duplicate branch hash")]
	DuplicateBranch,
	/// Zero transactions is never a valid block.
	#[fail(display = "partial merkle tree: empty transaction count")]
	EmptyTree,
}

/// A partial Merkle tree as carried by a filtered block: the minimal set
/// of internal hashes plus a flag bit per visited node needed to recompute
/// the full root and recover which leaves (transactions) matched.
///
/// Mirrors Bitcoin's `CPartialMerkleTree` (BIP 37).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartialMerkleTree {
	/// Number of transactions in the original block.
	pub total_transactions: u32,
	/// Hashes of the nodes that were pruned from the tree.
	pub hashes: Vec<Hash>,
	/// One flag bit per node visited during the depth-first traversal.
	pub flags: Vec<bool>,
}

fn tree_height(n: usize) -> u32 {
	let mut height = 0;
	let mut width = n;
	while width > 1 {
		width = (width + 1) / 2;
		height += 1;
	}
	height
}

fn tree_width(n: usize, height: u32) -> usize {
	(n + (1 << height) - 1) >> height
}

impl PartialMerkleTree {
	/// Builds a partial Merkle tree over `tx_hashes`, marking the subset
	/// of leaves indicated by `matches` (same length and order as
	/// `tx_hashes`) to be retained in clear alongside their branch proof.
	pub fn build(tx_hashes: &[Hash], matches: &[bool]) -> PartialMerkleTree {
		assert_eq!(tx_hashes.len(), matches.len());
		let height = tree_height(tx_hashes.len());
		let mut flags = Vec::new();
		let mut hashes = Vec::new();
		traverse_and_build(height, 0, tx_hashes, matches, &mut flags, &mut hashes);
		PartialMerkleTree {
			total_transactions: tx_hashes.len() as u32,
			hashes,
			flags,
		}
	}

	/// Recomputes the Merkle root and the list of matched transaction
	/// hashes (in block order) encoded by this tree.
	pub fn extract_matches(&self) -> Result<(Hash, Vec<Hash>), MerkleError> {
		if self.total_transactions == 0 {
			return Err(MerkleError::EmptyTree);
		}
		let height = tree_height(self.total_transactions as usize);
		let mut bits_used = 0usize;
		let mut hashes_used = 0usize;
		let mut matches = Vec::new();
		let root = traverse_and_extract(
			height,
			0,
			self.total_transactions as usize,
			&self.flags,
			&self.hashes,
			&mut bits_used,
			&mut hashes_used,
			&mut matches,
		)?;
		// every bit/hash must be consumed, with the sole exception that the
		// flag bitstream is byte-padded on the wire (handled by the caller).
		if hashes_used != self.hashes.len() {
			return Err(MerkleError::UnusedData);
		}
		Ok((root, matches))
	}
}

fn traverse_and_build(
	height: u32,
	pos: usize,
	tx_hashes: &[Hash],
	matches: &[bool],
	flags: &mut Vec<bool>,
	hashes: &mut Vec<Hash>,
) {
	let n = tx_hashes.len();
	let mut parent_of_match = false;
	let start = pos << height;
	let end = ((pos + 1) << height).min(n);
	for p in start..end {
		if matches[p] {
			parent_of_match = true;
			break;
		}
	}
	flags.push(parent_of_match);
	if height == 0 || !parent_of_match {
		hashes.push(calc_hash(height, pos, tx_hashes));
	} else {
		traverse_and_build(height - 1, pos * 2, tx_hashes, matches, flags, hashes);
		if pos * 2 + 1 < tree_width(n, height - 1) {
			traverse_and_build(height - 1, pos * 2 + 1, tx_hashes, matches, flags, hashes);
		}
	}
}

fn calc_hash(height: u32, pos: usize, tx_hashes: &[Hash]) -> Hash {
	if height == 0 {
		return tx_hashes[pos];
	}
	let n = tx_hashes.len();
	let width = tree_width(n, height - 1);
	let left = calc_hash(height - 1, pos * 2, tx_hashes);
	let right = if pos * 2 + 1 < width {
		calc_hash(height - 1, pos * 2 + 1, tx_hashes)
	} else {
		left
	};
	combine(&left, &right)
}

#[allow(clippy::too_many_arguments)]
fn traverse_and_extract(
	height: u32,
	pos: usize,
	total: usize,
	flags: &[bool],
	hashes: &[Hash],
	bits_used: &mut usize,
	hashes_used: &mut usize,
	matches: &mut Vec<Hash>,
) -> Result<Hash, MerkleError> {
	if *bits_used >= flags.len() {
		return Err(MerkleError::NotEnoughBits);
	}
	let parent_of_match = flags[*bits_used];
	*bits_used += 1;

	if height == 0 || !parent_of_match {
		if *hashes_used >= hashes.len() {
			return Err(MerkleError::NotEnoughHashes);
		}
		let hash = hashes[*hashes_used];
		*hashes_used += 1;
		if height == 0 && parent_of_match {
			matches.push(hash);
		}
		Ok(hash)
	} else {
		let left = traverse_and_extract(
			height - 1,
			pos * 2,
			total,
			flags,
			hashes,
			bits_used,
			hashes_used,
			matches,
		)?;
		let width = tree_width(total, height - 1);
		let right = if pos * 2 + 1 < width {
			let r = traverse_and_extract(
				height - 1,
				pos * 2 + 1,
				total,
				flags,
				hashes,
				bits_used,
				hashes_used,
				matches,
			)?;
			if r == left {
				return Err(MerkleError::DuplicateBranch);
			}
			r
		} else {
			left
		};
		Ok(combine(&left, &right))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn h(b: u8) -> Hash {
		Hash::from_slice(&[b; 32])
	}

	#[test]
	fn full_root_matches_partial_tree_with_all_matched() {
		let leaves = vec![h(1), h(2), h(3), h(4), h(5)];
		let root = merkle_root(&leaves);
		let matches = vec![true; leaves.len()];
		let tree = PartialMerkleTree::build(&leaves, &matches);
		let (extracted_root, matched) = tree.extract_matches().unwrap();
		assert_eq!(root, extracted_root);
		assert_eq!(matched, leaves);
	}

	#[test]
	fn partial_tree_recovers_only_matched_subset() {
		let leaves = vec![h(1), h(2), h(3), h(4)];
		let root = merkle_root(&leaves);
		let matches = vec![false, true, false, false];
		let tree = PartialMerkleTree::build(&leaves, &matches);
		let (extracted_root, matched) = tree.extract_matches().unwrap();
		assert_eq!(root, extracted_root);
		assert_eq!(matched, vec![h(2)]);
	}

	#[test]
	fn single_transaction_tree() {
		let leaves = vec![h(7)];
		let matches = vec![true];
		let tree = PartialMerkleTree::build(&leaves, &matches);
		let (root, matched) = tree.extract_matches().unwrap();
		assert_eq!(root, h(7));
		assert_eq!(matched, vec![h(7)]);
	}
}
