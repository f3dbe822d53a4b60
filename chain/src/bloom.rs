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

//! The Bloom filter the engine uses to interpret filtered-block payloads
//! (§4.5, C9). Filter *construction* from a wallet's watched scripts is
//! the client's job; the engine only consumes the wire form and answers
//! membership queries against it.

use std::io::{Read, Write};

use lite_core::ser::{self, Readable, Writeable};

use crate::error::{Error, ErrorKind};

/// Hard ceiling on filter size, matching the wire protocol's bound.
pub const MAX_BLOOM_FILTER_SIZE: usize = 36_000;
/// Hard ceiling on the number of hash rounds per element.
pub const MAX_HASH_FUNCS: u32 = 50;

const LN2_SQUARED: f64 = std::f64::consts::LN_2 * std::f64::consts::LN_2;
const LN2: f64 = std::f64::consts::LN_2;

/// What a matching transaction means for filter maintenance on the
/// client side. The engine treats this as an opaque tag it round-trips
/// through (de)serialization; it has no behavioral effect here.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateFlag {
	/// Never add outpoints from matched transactions to the filter.
	None,
	/// Always add outpoints from matched transactions to the filter.
	All,
	/// Only add outpoints that pay a recognized public key.
	P2PubkeyOnly,
}

impl UpdateFlag {
	fn to_byte(self) -> u8 {
		match self {
			UpdateFlag::None => 0,
			UpdateFlag::All => 1,
			UpdateFlag::P2PubkeyOnly => 2,
		}
	}

	fn from_byte(b: u8) -> Result<UpdateFlag, Error> {
		match b {
			0 => Ok(UpdateFlag::None),
			1 => Ok(UpdateFlag::All),
			2 => Ok(UpdateFlag::P2PubkeyOnly),
			n => Err(ErrorKind::Argument(format!("unknown bloom update flag {}", n)).into()),
		}
	}
}

/// A probabilistic set membership filter, as carried over the wire in a
/// `filterload` message (§4.5).
#[derive(Clone, Debug)]
pub struct BloomFilter {
	bits: Vec<u8>,
	n_hash_funcs: u32,
	tweak: u32,
	update_flag: UpdateFlag,
}

impl BloomFilter {
	/// Builds an empty filter sized for `n` elements at false-positive
	/// rate `p`, per the standard Bloom-filter formulas, clamped to the
	/// wire protocol's bounds (§4.5, §9 Open Question 2).
	pub fn new(n: usize, false_positive_rate: f64, tweak: u32, update_flag: UpdateFlag) -> BloomFilter {
		let n = n.max(1) as f64;
		let size_bits = (-1.0 / LN2_SQUARED * n * false_positive_rate.ln()).max(8.0);
		let size_bytes = ((size_bits / 8.0).ceil() as usize).clamp(1, MAX_BLOOM_FILTER_SIZE);
		let computed_k = ((size_bytes * 8) as f64 / n * LN2) as i64;
		let n_hash_funcs = computed_k.clamp(1, MAX_HASH_FUNCS as i64) as u32;
		BloomFilter {
			bits: vec![0u8; size_bytes],
			n_hash_funcs,
			tweak,
			update_flag,
		}
	}

	/// Size of the underlying bit array, in bytes.
	pub fn size_bytes(&self) -> usize {
		self.bits.len()
	}

	/// Number of hash rounds applied per element.
	pub fn hash_funcs(&self) -> u32 {
		self.n_hash_funcs
	}

	fn hash(&self, n_hash_num: u32, data: &[u8]) -> u32 {
		let seed = n_hash_num.wrapping_mul(0xFBA4_C795).wrapping_add(self.tweak);
		murmur3_32(seed, data) % (self.bits.len() as u32 * 8)
	}

	/// Sets the bit positions for `data`.
	pub fn insert(&mut self, data: &[u8]) {
		for i in 0..self.n_hash_funcs {
			let bit = self.hash(i, data) as usize;
			self.bits[bit / 8] |= 1 << (bit % 8);
		}
	}

	/// Tests whether `data` may be a member: true if every one of the `k`
	/// derived bit positions is set.
	pub fn contains(&self, data: &[u8]) -> bool {
		(0..self.n_hash_funcs).all(|i| {
			let bit = self.hash(i, data) as usize;
			self.bits[bit / 8] & (1 << (bit % 8)) != 0
		})
	}

	/// Bitwise-ORs `other` into a new filter. Requires identical size,
	/// `k` and tweak (§4.5); otherwise `Argument`.
	pub fn merge(&self, other: &BloomFilter) -> Result<BloomFilter, Error> {
		if self.bits.len() != other.bits.len()
			|| self.n_hash_funcs != other.n_hash_funcs
			|| self.tweak != other.tweak
		{
			return Err(ErrorKind::Argument("incompatible bloom filter parameters".into()).into());
		}
		let bits = self
			.bits
			.iter()
			.zip(other.bits.iter())
			.map(|(a, b)| a | b)
			.collect();
		Ok(BloomFilter {
			bits,
			n_hash_funcs: self.n_hash_funcs,
			tweak: self.tweak,
			update_flag: self.update_flag,
		})
	}
}

impl Writeable for BloomFilter {
	fn write<W: Write>(&self, writer: &mut W) -> Result<(), ser::Error> {
		ser::write_vec(writer, &self.bits)?;
		use byteorder::{LittleEndian, WriteBytesExt};
		writer.write_u32::<LittleEndian>(self.n_hash_funcs)?;
		writer.write_u32::<LittleEndian>(self.tweak)?;
		writer.write_u8(self.update_flag.to_byte())?;
		Ok(())
	}
}

impl Readable for BloomFilter {
	fn read<R: Read>(reader: &mut R) -> Result<BloomFilter, ser::Error> {
		use byteorder::{LittleEndian, ReadBytesExt};
		let bits = ser::read_vec(reader)?;
		if bits.len() > MAX_BLOOM_FILTER_SIZE {
			return Err(ser::Error::TooLarge("bloom filter exceeds maximum size".into()));
		}
		let n_hash_funcs = reader.read_u32::<LittleEndian>()?;
		if n_hash_funcs > MAX_HASH_FUNCS {
			return Err(ser::Error::CorruptedData("bloom filter hash func count too large".into()));
		}
		let tweak = reader.read_u32::<LittleEndian>()?;
		let flag_byte = reader.read_u8()?;
		let update_flag = UpdateFlag::from_byte(flag_byte)
			.map_err(|_| ser::Error::CorruptedData("unknown bloom update flag".into()))?;
		Ok(BloomFilter {
			bits,
			n_hash_funcs,
			tweak,
			update_flag,
		})
	}
}

/// MurmurHash3 (x86, 32-bit variant), as used by Bitcoin's `CBloomFilter`.
fn murmur3_32(seed: u32, data: &[u8]) -> u32 {
	const C1: u32 = 0xcc9e_2d51;
	const C2: u32 = 0x1b87_3593;

	let mut h1 = seed;
	let chunks = data.chunks_exact(4);
	let tail = chunks.remainder();
	for chunk in chunks {
		let mut k1 = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
		k1 = k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
		h1 ^= k1;
		h1 = h1.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
	}

	let mut k1: u32 = 0;
	for (i, &byte) in tail.iter().enumerate().rev() {
		k1 ^= (byte as u32) << (8 * i);
		if i == 0 {
			k1 = k1.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
			h1 ^= k1;
		}
	}

	h1 ^= data.len() as u32;
	h1 ^= h1 >> 16;
	h1 = h1.wrapping_mul(0x85eb_ca6b);
	h1 ^= h1 >> 13;
	h1 = h1.wrapping_mul(0xc2b2_ae35);
	h1 ^= h1 >> 16;
	h1
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip_insert_contains() {
		let mut f = BloomFilter::new(10, 0.01, 1234, UpdateFlag::All);
		f.insert(b"hello");
		assert!(f.contains(b"hello"));
	}

	#[test]
	fn absent_element_usually_not_contained() {
		let mut f = BloomFilter::new(10, 0.0001, 5678, UpdateFlag::None);
		f.insert(b"alpha");
		assert!(!f.contains(b"totally-different-and-long-enough-string"));
	}

	#[test]
	fn merge_requires_matching_parameters() {
		let a = BloomFilter::new(10, 0.01, 1, UpdateFlag::All);
		let b = BloomFilter::new(10, 0.01, 2, UpdateFlag::All);
		assert!(a.merge(&b).is_err());
	}

	#[test]
	fn merge_is_union_of_membership() {
		let mut a = BloomFilter::new(10, 0.01, 99, UpdateFlag::All);
		let mut b = BloomFilter::new(10, 0.01, 99, UpdateFlag::All);
		a.insert(b"from-a");
		b.insert(b"from-b");
		let merged = a.merge(&b).unwrap();
		assert!(merged.contains(b"from-a"));
		assert!(merged.contains(b"from-b"));
	}

	#[test]
	fn wire_round_trip() {
		let mut f = BloomFilter::new(20, 0.001, 42, UpdateFlag::P2PubkeyOnly);
		f.insert(b"watched-script");
		let bytes = ser::ser_vec(&f).unwrap();
		let back: BloomFilter = ser::deserialize(&bytes).unwrap();
		assert!(back.contains(b"watched-script"));
		assert_eq!(back.hash_funcs(), f.hash_funcs());
		assert_eq!(back.size_bytes(), f.size_bytes());
	}
}
