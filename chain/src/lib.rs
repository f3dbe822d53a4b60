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

//! The SPV block-chain engine: header verification, orphan handling,
//! chain reorganization and listener dispatch, generic over the choice
//! between header-only and full-verify connectors.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

#[macro_use]
extern crate failure_derive;
extern crate failure;

mod bloom;
mod engine;
mod error;
mod listener;
mod orphan;
mod verifier;

pub use crate::bloom::{BloomFilter, UpdateFlag, MAX_BLOOM_FILTER_SIZE, MAX_HASH_FUNCS};
pub use crate::engine::Chain;
pub use crate::error::{Error, ErrorKind};
pub use crate::listener::{Listener, TxKind};
pub use crate::orphan::{OrphanBlock, OrphanPool, MAX_ORPHANS};
pub use crate::verifier::{ChainVerifier, FullVerifier, HeaderChainView, HeaderOnlyVerifier};
