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

//! Canonical 32-byte identifiers used pervasively for blocks and
//! transactions.

use std::fmt;

use sha2::{Digest, Sha256};

/// A hash uniquely identifying one of the main blockchain constructs
/// (block headers, transactions). Ordered byte-lexicographically; this
/// order exists purely to allow deterministic tie-breaking and has no
/// other semantic meaning.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

/// The all-zero hash, used as the `previous` of the genesis header.
pub const ZERO_HASH: Hash = Hash([0; 32]);

impl Hash {
	/// Builds a `Hash` from a 32-byte slice.
	pub fn from_slice(s: &[u8]) -> Hash {
		let mut a = [0u8; 32];
		a.copy_from_slice(s);
		Hash(a)
	}

	/// Returns the bytes making up the hash.
	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	/// Interprets the hash as a big-endian 256-bit integer, for comparison
	/// against a difficulty target.
	pub fn to_big_endian_uint(&self) -> num_bigint::BigUint {
		num_bigint::BigUint::from_bytes_be(&self.0)
	}
}

impl fmt::Debug for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self)
	}
}

impl fmt::Display for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for byte in self.0.iter() {
			write!(f, "{:02x}", byte)?;
		}
		Ok(())
	}
}

/// Implemented by types whose hash is a pure function of their
/// serialized byte representation.
pub trait Hashed {
	/// Hash of the canonical byte encoding, double-SHA256 as in Bitcoin.
	fn hash(&self) -> Hash {
		Hash(sha256d(&self.bytes()))
	}

	/// Canonical byte serialization fed into `hash`.
	fn bytes(&self) -> Vec<u8>;
}

fn sha256d(data: &[u8]) -> [u8; 32] {
	let first = Sha256::digest(data);
	let second = Sha256::digest(&first);
	let mut out = [0u8; 32];
	out.copy_from_slice(&second);
	out
}

impl Hashed for [u8] {
	fn bytes(&self) -> Vec<u8> {
		self.to_owned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ordering_is_byte_lex() {
		let a = Hash::from_slice(&[0u8; 32]);
		let mut hi = [0u8; 32];
		hi[0] = 1;
		let b = Hash::from_slice(&hi);
		assert!(a < b);
	}

	#[test]
	fn display_round_trips_through_hex() {
		let h = Hash::from_slice(&[0xabu8; 32]);
		assert_eq!(format!("{}", h), "ab".repeat(32));
	}
}
