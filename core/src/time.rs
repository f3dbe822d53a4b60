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

//! Wall-clock access, kept behind a single function so the "future
//! block" consensus check (§4.1 step 6) has one place to read real time
//! from.

use chrono::Utc;

/// The current Unix timestamp, in seconds.
pub fn now_timestamp() -> i64 {
	Utc::now().timestamp()
}
