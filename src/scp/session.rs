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

//! Capabilities the upload engine needs from a remote shell session.
//!
//! The engine never touches the transport directly. Anything that can hand
//! out a stdin pipe and run a command line can carry an upload, which is how
//! the tests substitute an in-memory session.
//!
//! # Implementing RemoteSession
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bscp::scp::RemoteSession;
//! use bscp::Error;
//!
//! struct LocalSession;
//!
//! #[async_trait]
//! impl RemoteSession for LocalSession {
//!     type Stdin = tokio::io::Sink;
//!
//!     async fn open_stdin_pipe(&self) -> Result<Self::Stdin, Error> {
//!         Ok(tokio::io::sink())
//!     }
//!
//!     async fn run_command(&self, _command: &str) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::ssh::tokio_client::Error;

/// A command-execution session over an established connection.
///
/// Both methods take `&self` because the upload engine drives them
/// concurrently. Implementations are single-use: one session carries one
/// command.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Writable half bound to the remote command's standard input.
    type Stdin: AsyncWrite + Send + Unpin + 'static;

    /// Returns the sink feeding the remote command's standard input.
    ///
    /// Shutting the sink down delivers end-of-file to the remote command.
    async fn open_stdin_pipe(&self) -> Result<Self::Stdin, Error>;

    /// Runs `command` on the remote shell and waits for it to finish.
    ///
    /// A command that cannot be started or exits unsuccessfully is reported
    /// as [`Error::RemoteCommand`].
    async fn run_command(&self, command: &str) -> Result<(), Error>;
}
