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

//! Compact ("nBits") difficulty target encoding and cumulative proof of
//! work, per §3 and §6.

use std::ops::Add;

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// A difficulty target in its 4-byte compact form: the most significant
/// byte is a base-256 exponent `e`, the remaining three bytes are the
/// mantissa `m`. The decoded value is `m * 256^(e-3)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactTarget(pub u32);

impl CompactTarget {
	/// Decodes the full 256-bit target value.
	pub fn to_target(&self) -> BigUint {
		let exponent = (self.0 >> 24) as i64;
		let mantissa = BigUint::from(self.0 & 0x00ff_ffff);
		if exponent <= 3 {
			// mantissa needs to be shifted right, handled via integer division
			let shift = (3 - exponent) * 8;
			if shift >= 0 && shift < 256 {
				mantissa >> (shift as usize)
			} else {
				BigUint::zero()
			}
		} else {
			let shift = (exponent - 3) * 8;
			mantissa << (shift as usize)
		}
	}

	/// Encodes a 256-bit target back into compact form, rounding down.
	/// Used by the difficulty retarget calculation to re-derive `nBits`
	/// from a computed target value.
	pub fn from_target(target: &BigUint) -> CompactTarget {
		let bytes = target.to_bytes_be();
		let bytes = trim_leading_zeros(&bytes);
		let mut size = bytes.len() as u32;
		let mut mantissa: u32 = if bytes.is_empty() {
			0
		} else if bytes.len() >= 3 {
			((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32)
		} else {
			let mut padded = vec![0u8; 3 - bytes.len()];
			padded.extend_from_slice(bytes);
			((padded[0] as u32) << 16) | ((padded[1] as u32) << 8) | (padded[2] as u32)
		};
		// if the high bit of the mantissa's top byte is set it would be
		// misread as a sign bit; shift the whole thing down one byte.
		if mantissa & 0x0080_0000 != 0 {
			mantissa >>= 8;
			size += 1;
		}
		CompactTarget((size << 24) | mantissa)
	}
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
	let mut i = 0;
	while i < bytes.len() && bytes[i] == 0 {
		i += 1;
	}
	&bytes[i..]
}

/// The proof-of-work "weight" contributed by a single header, per the
/// glossary: `work = 2^256 / (target + 1)`. Monotonic in difficulty: a
/// lower target (harder to satisfy) yields more work.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Work(pub BigUint);

impl Work {
	/// Computes the work contributed by a header whose decoded target is
	/// `target`.
	pub fn from_target(target: &BigUint) -> Work {
		let denom = target + BigUint::one();
		let numerator = BigUint::one() << 256;
		Work(numerator / denom)
	}

	/// The zero-work value, used to seed cumulative work before genesis.
	pub fn zero() -> Work {
		Work(BigUint::zero())
	}
}

impl Add for Work {
	type Output = Work;
	fn add(self, rhs: Work) -> Work {
		Work(self.0 + rhs.0)
	}
}

impl<'a> Add<&'a Work> for Work {
	type Output = Work;
	fn add(self, rhs: &'a Work) -> Work {
		Work(self.0 + &rhs.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn compact_round_trips_easy_target() {
		// a typical easy ("regtest"-like) target: exponent 0x20, mantissa 0x7fffff
		let compact = CompactTarget(0x207f_ffff);
		let target = compact.to_target();
		let back = CompactTarget::from_target(&target);
		assert_eq!(compact, back);
	}

	#[test]
	fn harder_target_yields_more_work() {
		let easy = CompactTarget(0x207f_ffff).to_target();
		let hard = CompactTarget(0x1d00_ffff).to_target();
		assert!(hard < easy);
		assert!(Work::from_target(&hard) > Work::from_target(&easy));
	}

	#[test]
	fn work_accumulates() {
		let t = CompactTarget(0x207f_ffff).to_target();
		let w1 = Work::from_target(&t);
		let w2 = w1.clone() + Work::from_target(&t);
		assert_eq!(w2, Work(w1.0 * 2u8));
	}
}
