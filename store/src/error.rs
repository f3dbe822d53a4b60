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

//! Errors a `BlockStore` implementation may raise.

use failure::Fail;

/// Persistence-layer error. The chain engine wraps every variant of this
/// into its own `Store` error kind and treats it as fatal to the current
/// operation (§7).
#[derive(Debug, Fail)]
pub enum Error {
	/// A lookup or write against the backing store failed.
	#[fail(display = "block store error: {}", _0)]
	Backend(String),
	/// Asked to persist a block whose parent isn't known to the store.
	#[fail(display = "block store error: parent {} not found", _0)]
	NotFoundParent(String),
}
