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

//! Chain engine error taxonomy (§7): `Verification`, `Pruned`, `Store` and
//! `Argument`, not type names but kinds a caller branches on.

use std::fmt::{self, Display};

use failure::{Backtrace, Context, Fail};

use lite_core::hash::Hash;

/// A chain engine error: a `Context<ErrorKind>` plus the usual failure
/// plumbing (cause chain, backtrace).
#[derive(Debug)]
pub struct Error {
	inner: Context<ErrorKind>,
}

/// The taxonomy from §7. Variants carry just enough to let a caller log
/// or react without re-deriving context from the block itself.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	/// The block violates a consensus rule: bad PoW, bad Merkle root, a
	/// non-final transaction, a failed checkpoint, or an impossible split
	/// point. The offending block is dropped and the store untouched.
	#[fail(display = "verification error on block {}: {}", _1, _0)]
	Verification(String, Hash),
	/// A re-org needs undo data for `_0` that the store no longer has.
	/// The re-org is abandoned; the caller should fetch full blocks and
	/// retry.
	#[fail(display = "undo data pruned for block {}", _0)]
	Pruned(Hash),
	/// The underlying persistence layer failed; fatal to the current
	/// operation.
	#[fail(display = "store error: {}", _0)]
	Store(String),
	/// Caller misuse of the API (e.g. merging incompatible Bloom
	/// filters); a programmer error, not a consensus one.
	#[fail(display = "invalid argument: {}", _0)]
	Argument(String),
}

impl Error {
	/// The error kind, for callers that branch on the taxonomy.
	pub fn kind(&self) -> ErrorKind {
		self.inner.get_context().clone()
	}

	/// True for errors that mean "this block is permanently invalid",
	/// as opposed to a transient store failure.
	pub fn is_bad_data(&self) -> bool {
		matches!(self.kind(), ErrorKind::Verification(_, _))
	}

	/// Builds a `Verification` error for `hash` with a free-form reason.
	pub fn verification<S: Into<String>>(hash: Hash, reason: S) -> Error {
		ErrorKind::Verification(reason.into(), hash).into()
	}
}

impl Fail for Error {
	fn cause(&self) -> Option<&dyn Fail> {
		self.inner.cause()
	}

	fn backtrace(&self) -> Option<&Backtrace> {
		self.inner.backtrace()
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.inner, f)
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Error {
		Error {
			inner: Context::new(kind),
		}
	}
}

impl From<Context<ErrorKind>> for Error {
	fn from(inner: Context<ErrorKind>) -> Error {
		Error { inner }
	}
}

impl From<lite_store::Error> for Error {
	fn from(e: lite_store::Error) -> Error {
		ErrorKind::Store(e.to_string()).into()
	}
}
