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

//! Upload files to remote hosts over SSH with the scp sink protocol.
//!
//! A connected [`SessionHandle`] runs `scp -rqt <path>` on the remote host and
//! streams a single `C` record into it: the control line, the raw bytes and a
//! NUL terminator. [`ScpClient`] wraps connection, upload and close behind one
//! handle with defaults taken from [`ScpConfig`].
//!
//! - [`ssh::tokio_client`]: russh transport, credentials and host key policy
//! - [`scp`]: framing, the upload engine and the timeout wrapper
//! - [`shared`]: remote path validation
//! - [`utils`]: tracing subscriber setup
//!
//! The engine only depends on the [`RemoteSession`] trait, so any transport
//! that can hand out a stdin pipe and run a command can carry an upload.
//!
//! ```no_run
//! use bscp::{AuthDescriptor, ScpClient, ServerCheckMethod};
//!
//! # async fn run() -> Result<(), bscp::Error> {
//! let auth = AuthDescriptor::from_password("deploy", "secret", ServerCheckMethod::NoCheck);
//! let client = ScpClient::new("build-01.example:22", auth);
//! client.connect().await?;
//! client.copy(&b"hello"[..], "/tmp/hello.txt", 644, 5).await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod scp;
pub mod shared;
pub mod ssh;
pub mod utils;

pub use config::ScpConfig;
pub use scp::{RemoteSession, TransferRequest};
pub use ssh::tokio_client::{AuthDescriptor, Error, ServerCheckMethod, SessionHandle};
pub use ssh::ScpClient;
