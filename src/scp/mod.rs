// Copyright 2025 Lablup Inc. and Jeongkyu Shin
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

//! scp sink-mode uploads over any [`RemoteSession`].

pub mod protocol;
pub mod session;
pub mod timeout;
pub mod upload;

pub use protocol::DEFAULT_SCP_BINARY;
pub use session::RemoteSession;
pub use timeout::{copy_file_with_timeout, copy_with_timeout};
pub use upload::{copy, copy_file, TransferRequest};
