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

//! Block header, transaction and block bodies, and their wire encodings
//! (§3, §6).

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::hash::{Hash, Hashed, ZERO_HASH};
use crate::merkle::{self, PartialMerkleTree};
use crate::ser::{self, Readable, Writeable};
use crate::target::CompactTarget;

/// A block header is immutable once constructed; its hash is a pure
/// function of these fields (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
	/// Protocol version this header was produced under.
	pub version: u32,
	/// Hash of the previous header in the chain.
	pub previous: Hash,
	/// Root of the Merkle tree over this block's transaction hashes.
	pub merkle_root: Hash,
	/// Seconds since the Unix epoch.
	pub timestamp: i64,
	/// Compact-encoded difficulty target this header's hash must satisfy.
	pub bits: CompactTarget,
	/// Miner-chosen value varied to satisfy the proof-of-work constraint.
	pub nonce: u32,
}

impl BlockHeader {
	/// Builds the genesis header: no parent, no transactions.
	pub fn genesis(timestamp: i64, bits: CompactTarget, nonce: u32) -> BlockHeader {
		BlockHeader {
			version: 1,
			previous: ZERO_HASH,
			merkle_root: ZERO_HASH,
			timestamp,
			bits,
			nonce,
		}
	}
}

impl Hashed for BlockHeader {
	fn bytes(&self) -> Vec<u8> {
		ser::ser_vec(self).expect("header serialization is infallible")
	}
}

impl Writeable for BlockHeader {
	fn write<W: Write>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32::<LittleEndian>(self.version)?;
		writer.write_all(self.previous.as_bytes())?;
		writer.write_all(self.merkle_root.as_bytes())?;
		writer.write_i32::<LittleEndian>(self.timestamp as i32)?;
		writer.write_u32::<LittleEndian>(self.bits.0)?;
		writer.write_u32::<LittleEndian>(self.nonce)?;
		Ok(())
	}
}

impl Readable for BlockHeader {
	fn read<R: Read>(reader: &mut R) -> Result<BlockHeader, ser::Error> {
		let version = reader.read_u32::<LittleEndian>()?;
		let previous = Hash::from_slice(&ser::read_hash_bytes(reader)?);
		let merkle_root = Hash::from_slice(&ser::read_hash_bytes(reader)?);
		let timestamp = reader.read_i32::<LittleEndian>()? as i64;
		let bits = CompactTarget(reader.read_u32::<LittleEndian>()?);
		let nonce = reader.read_u32::<LittleEndian>()?;
		Ok(BlockHeader {
			version,
			previous,
			merkle_root,
			timestamp,
			bits,
			nonce,
		})
	}
}

/// A spendable output reference: the transaction that created it and the
/// position within that transaction's output list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
	/// Hash of the transaction that created the referenced output.
	pub txid: Hash,
	/// Index of the output within that transaction.
	pub index: u32,
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
	/// Amount carried by this output, in the smallest denomination.
	pub value: u64,
	/// Spending condition. Opaque to the chain engine: evaluating it is
	/// delegated to the external script/signature verifier (§1).
	pub script_pubkey: Vec<u8>,
}

/// A transaction input, spending a prior output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
	/// The output being spent.
	pub previous_output: OutPoint,
	/// Satisfies `previous_output`'s spending condition. Opaque.
	pub script_sig: Vec<u8>,
	/// Relative-locktime / replace-by-fee signal; not interpreted here.
	pub sequence: u32,
}

/// The height/timestamp threshold above which a transaction's `lock_time`
/// is interpreted as a Unix timestamp rather than a block height, as in
/// Bitcoin's `nLockTime`.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// A transaction. Its internal validity (signatures, script execution) is
/// an opaque predicate evaluated outside the chain engine (§1); the engine
/// only needs identity, the spend graph, and finality.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Transaction format version.
	pub version: u32,
	/// Earliest height or timestamp at which this transaction may be
	/// included in a block; `0` means "always final".
	pub lock_time: u32,
	/// Outputs being spent.
	pub inputs: Vec<TxIn>,
	/// Newly created outputs.
	pub outputs: Vec<TxOut>,
}

impl Transaction {
	/// Whether this transaction may be included in a block at `height`
	/// with timestamp `timestamp`, per §4.1 step 8.
	pub fn is_final(&self, height: u64, timestamp: i64) -> bool {
		if self.lock_time == 0 {
			return true;
		}
		let unlocked = if self.lock_time < LOCKTIME_THRESHOLD {
			(self.lock_time as u64) < height
		} else {
			(self.lock_time as i64) < timestamp
		};
		if unlocked {
			return true;
		}
		// a transaction whose every input opts out of relative timelock
		// semantics (sequence == u32::MAX) is final regardless of lock_time,
		// mirroring Bitcoin's nLockTime override.
		self.inputs.iter().all(|i| i.sequence == u32::MAX)
	}

	/// Outputs this transaction consumes, as `(txid, index)` pairs.
	pub fn spent_outpoints(&self) -> Vec<OutPoint> {
		self.inputs.iter().map(|i| i.previous_output).collect()
	}

	/// Outputs this transaction creates, keyed by their `OutPoint`.
	pub fn created_outputs(&self) -> Vec<(OutPoint, TxOut)> {
		let txid = self.hash();
		self.outputs
			.iter()
			.enumerate()
			.map(|(index, out)| {
				(
					OutPoint {
						txid,
						index: index as u32,
					},
					out.clone(),
				)
			})
			.collect()
	}
}

impl Hashed for Transaction {
	fn bytes(&self) -> Vec<u8> {
		ser::ser_vec(self).expect("transaction serialization is infallible")
	}
}

impl Writeable for Transaction {
	fn write<W: Write>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_u32::<LittleEndian>(self.version)?;
		writer.write_u32::<LittleEndian>(self.lock_time)?;
		ser::write_varint(writer, self.inputs.len() as u64)?;
		for input in &self.inputs {
			writer.write_all(input.previous_output.txid.as_bytes())?;
			writer.write_u32::<LittleEndian>(input.previous_output.index)?;
			ser::write_vec(writer, &input.script_sig)?;
			writer.write_u32::<LittleEndian>(input.sequence)?;
		}
		ser::write_varint(writer, self.outputs.len() as u64)?;
		for output in &self.outputs {
			writer.write_u64::<LittleEndian>(output.value)?;
			ser::write_vec(writer, &output.script_pubkey)?;
		}
		Ok(())
	}
}

impl Readable for Transaction {
	fn read<R: Read>(reader: &mut R) -> Result<Transaction, ser::Error> {
		let version = reader.read_u32::<LittleEndian>()?;
		let lock_time = reader.read_u32::<LittleEndian>()?;
		let n_in = ser::read_varint(reader)?;
		let mut inputs = Vec::with_capacity(n_in as usize);
		for _ in 0..n_in {
			let txid = Hash::from_slice(&ser::read_hash_bytes(reader)?);
			let index = reader.read_u32::<LittleEndian>()?;
			let script_sig = ser::read_vec(reader)?;
			let sequence = reader.read_u32::<LittleEndian>()?;
			inputs.push(TxIn {
				previous_output: OutPoint { txid, index },
				script_sig,
				sequence,
			});
		}
		let n_out = ser::read_varint(reader)?;
		let mut outputs = Vec::with_capacity(n_out as usize);
		for _ in 0..n_out {
			let value = reader.read_u64::<LittleEndian>()?;
			let script_pubkey = ser::read_vec(reader)?;
			outputs.push(TxOut {
				value,
				script_pubkey,
			});
		}
		Ok(Transaction {
			version,
			lock_time,
			inputs,
			outputs,
		})
	}
}

/// The transaction payload a block carries, per §3: none (header-only),
/// the full ordered list, or a Bloom-filtered subset plus the hash set
/// needed to recompute the Merkle root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Body {
	/// No transaction data at all; SPV header-only mode.
	HeaderOnly,
	/// The complete, ordered transaction list.
	Full(Vec<Transaction>),
	/// A filtered block: every transaction hash in the original block,
	/// plus the subset of full transactions that matched a Bloom filter.
	/// Invariant: every hash in `matched` is present in `tx_hashes`.
	Filtered {
		/// Hash of every transaction in the original block, in order.
		tx_hashes: Vec<Hash>,
		/// The subset of full transactions that matched the filter.
		matched: Vec<Transaction>,
	},
}

impl Body {
	/// Checks the §3 invariant that every carried full transaction's hash
	/// is present in the carried hash set.
	pub fn is_well_formed(&self) -> bool {
		match self {
			Body::Filtered { tx_hashes, matched } => {
				let hash_set: std::collections::HashSet<Hash> = tx_hashes.iter().cloned().collect();
				matched.iter().all(|tx| hash_set.contains(&tx.hash()))
			}
			_ => true,
		}
	}

	/// Whether this body carries no transactions (header-only arrival).
	pub fn has_no_transactions(&self) -> bool {
		matches!(self, Body::HeaderOnly)
	}
}

/// A block: a header plus optionally a body (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
	/// The block header.
	pub header: BlockHeader,
	/// The transaction payload, if any.
	pub body: Body,
}

impl Block {
	/// The block's identifying hash (the header's hash).
	pub fn hash(&self) -> Hash {
		self.header.hash()
	}

	/// The Merkle root implied by `body`'s transaction hashes, if the
	/// body carries a full transaction list or a complete hash set.
	pub fn computed_merkle_root(&self) -> Option<Hash> {
		match &self.body {
			Body::Full(txs) => {
				let hashes: Vec<Hash> = txs.iter().map(|t| t.hash()).collect();
				Some(merkle::merkle_root(&hashes))
			}
			Body::Filtered { tx_hashes, .. } => Some(merkle::merkle_root(tx_hashes)),
			Body::HeaderOnly => None,
		}
	}
}

/// Wire payload for a filtered block (§6): header, total transaction
/// count, and a partial Merkle tree encoding which leaves matched.
pub struct FilteredBlockPayload {
	/// The block header.
	pub header: BlockHeader,
	/// Total number of transactions in the original block.
	pub total_tx_count: u32,
	/// The partial Merkle tree proving the matched transaction hashes.
	pub partial_tree: PartialMerkleTree,
}

impl Writeable for FilteredBlockPayload {
	fn write<W: Write>(&self, writer: &mut W) -> Result<(), ser::Error> {
		self.header.write(writer)?;
		writer.write_u32::<LittleEndian>(self.total_tx_count)?;
		ser::write_varint(writer, self.partial_tree.hashes.len() as u64)?;
		for h in &self.partial_tree.hashes {
			writer.write_all(h.as_bytes())?;
		}
		let flag_bytes = pack_flags(&self.partial_tree.flags);
		ser::write_vec(writer, &flag_bytes)?;
		Ok(())
	}
}

impl Readable for FilteredBlockPayload {
	fn read<R: Read>(reader: &mut R) -> Result<FilteredBlockPayload, ser::Error> {
		let header = BlockHeader::read(reader)?;
		let total_tx_count = reader.read_u32::<LittleEndian>()?;
		let n_hashes = ser::read_varint(reader)?;
		let mut hashes = Vec::with_capacity(n_hashes as usize);
		for _ in 0..n_hashes {
			hashes.push(Hash::from_slice(&ser::read_hash_bytes(reader)?));
		}
		let flag_bytes = ser::read_vec(reader)?;
		let flags = unpack_flags(&flag_bytes);
		Ok(FilteredBlockPayload {
			header,
			total_tx_count,
			partial_tree: PartialMerkleTree {
				total_transactions: total_tx_count,
				hashes,
				flags,
			},
		})
	}
}

fn pack_flags(flags: &[bool]) -> Vec<u8> {
	let mut bytes = vec![0u8; (flags.len() + 7) / 8];
	for (i, &bit) in flags.iter().enumerate() {
		if bit {
			bytes[i / 8] |= 1 << (i % 8);
		}
	}
	bytes
}

fn unpack_flags(bytes: &[u8]) -> Vec<bool> {
	let mut flags = Vec::with_capacity(bytes.len() * 8);
	for byte in bytes {
		for bit in 0..8 {
			flags.push(byte & (1 << bit) != 0);
		}
	}
	flags
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_header() -> BlockHeader {
		BlockHeader {
			version: 1,
			previous: Hash::from_slice(&[7u8; 32]),
			merkle_root: Hash::from_slice(&[9u8; 32]),
			timestamp: 1_600_000_000,
			bits: CompactTarget(0x1d00_ffff),
			nonce: 42,
		}
	}

	#[test]
	fn header_wire_round_trip_is_80_bytes() {
		let header = sample_header();
		let bytes = ser::ser_vec(&header).unwrap();
		assert_eq!(bytes.len(), 80);
		let back: BlockHeader = ser::deserialize(&bytes).unwrap();
		assert_eq!(header, back);
	}

	#[test]
	fn transaction_finality_by_height() {
		let tx = Transaction {
			version: 1,
			lock_time: 100,
			inputs: vec![TxIn {
				previous_output: OutPoint {
					txid: ZERO_HASH,
					index: 0,
				},
				script_sig: vec![],
				sequence: 0,
			}],
			outputs: vec![],
		};
		assert!(!tx.is_final(50, 0));
		assert!(tx.is_final(101, 0));
	}

	#[test]
	fn filtered_body_rejects_unlisted_match() {
		let tx = Transaction {
			version: 1,
			lock_time: 0,
			inputs: vec![],
			outputs: vec![],
		};
		let body = Body::Filtered {
			tx_hashes: vec![Hash::from_slice(&[1u8; 32])],
			matched: vec![tx],
		};
		assert!(!body.is_well_formed());
	}

	#[test]
	fn filtered_payload_round_trips() {
		let leaves = vec![
			Hash::from_slice(&[1u8; 32]),
			Hash::from_slice(&[2u8; 32]),
			Hash::from_slice(&[3u8; 32]),
		];
		let matches = vec![false, true, false];
		let tree = PartialMerkleTree::build(&leaves, &matches);
		let payload = FilteredBlockPayload {
			header: sample_header(),
			total_tx_count: 3,
			partial_tree: tree,
		};
		let bytes = ser::ser_vec(&payload).unwrap();
		let back: FilteredBlockPayload = ser::deserialize(&bytes).unwrap();
		let (root, matched) = back.partial_tree.extract_matches().unwrap();
		assert_eq!(root, merkle::merkle_root(&leaves));
		assert_eq!(matched, vec![leaves[1]]);
	}
}
