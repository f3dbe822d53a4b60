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

//! Block, header, transaction and difficulty primitives shared by the
//! store and chain crates.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate failure_derive;
extern crate failure;
#[macro_use]
extern crate lazy_static;

pub mod block;
pub mod genesis;
pub mod global;
pub mod hash;
pub mod merkle;
pub mod params;
pub mod ser;
pub mod stored;
pub mod target;
pub mod time;

pub use crate::block::{Block, BlockHeader, Body, FilteredBlockPayload, OutPoint, Transaction, TxIn, TxOut};
pub use crate::global::{chain_type, is_testnet, set_chain_type, ChainType};
pub use crate::hash::{Hash, Hashed, ZERO_HASH};
pub use crate::merkle::{merkle_root, MerkleError, PartialMerkleTree};
pub use crate::params::{MainNetParams, NetworkParams, TestNetParams};
pub use crate::ser::{Readable, Writeable};
pub use crate::stored::StoredBlock;
pub use crate::target::{CompactTarget, Work};
pub use crate::time::now_timestamp;
