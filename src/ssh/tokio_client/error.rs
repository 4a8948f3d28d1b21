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

//! Error type shared by the SSH client and the scp upload engine.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors returned by credential construction, session management and uploads.
///
/// Every failure is returned to the immediate caller. Nothing in this crate
/// retries on its own.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Private key material is malformed, encrypted without a passphrase,
    /// or could not be decrypted with the supplied passphrase.
    #[error("failed to parse private key: {0}")]
    KeyParse(#[source] russh::keys::Error),

    /// `SSH_AUTH_SOCK` is unset or the agent socket could not be reached.
    #[error("ssh agent unavailable: {0}")]
    AgentUnavailable(String),

    /// The target address could not be resolved.
    #[error("invalid target address '{address}': {source}")]
    AddressInvalid {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Network, handshake or host key verification failure.
    #[error("failed to connect to {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: russh::Error,
    },

    /// The server rejected the credential.
    #[error("authentication as '{username}' using {method} was rejected")]
    AuthenticationFailed {
        username: String,
        method: &'static str,
    },

    /// The session channel could not be negotiated.
    #[error("failed to open ssh session: {0}")]
    SessionOpen(#[source] russh::Error),

    #[error("session is not connected")]
    NotConnected,

    #[error("session is already connected")]
    AlreadyConnected,

    /// The stdin pipe of the session was already handed out.
    #[error("stdin pipe of the session has already been taken")]
    StdinUnavailable,

    #[error("invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// The remote command could not be started or exited unsuccessfully.
    #[error("remote command `{command}` failed: {message}")]
    RemoteCommand {
        command: String,
        exit_status: Option<u32>,
        message: String,
    },

    /// Reading the local stream or writing the stdin pipe failed.
    #[error("stream I/O error: {0}")]
    StreamIo(#[from] io::Error),

    /// The upload did not finish before the deadline.
    #[error("upload timed out after {0:?}")]
    Timeout(Duration),

    /// Releasing the connection or the session failed.
    #[error("failed to close session: {0}")]
    Close(#[source] russh::Error),

    /// The background upload task panicked or was aborted.
    #[error("upload task failed: {0}")]
    TaskFailed(String),

    #[error("ssh error: {0}")]
    Ssh(#[from] russh::Error),
}

impl Error {
    /// Returns true if the operation was abandoned because its deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns true for failures that happen while establishing the connection.
    pub fn is_dial_error(&self) -> bool {
        matches!(
            self,
            Error::AddressInvalid { .. } | Error::Dial { .. } | Error::AuthenticationFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout(Duration::from_secs(3));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "upload timed out after 3s");
    }

    #[test]
    fn test_remote_command_display() {
        let err = Error::RemoteCommand {
            command: "/usr/bin/scp -rqt /tmp".to_string(),
            exit_status: Some(1),
            message: "scp: /tmp/x: Permission denied".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("/usr/bin/scp -rqt /tmp"));
        assert!(text.contains("Permission denied"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_dial_family() {
        let err = Error::AuthenticationFailed {
            username: "root".to_string(),
            method: "password",
        };
        assert!(err.is_dial_error());
        assert!(!Error::NotConnected.is_dial_error());
    }

    #[test]
    fn test_io_error_converts_to_stream_io() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(err, Error::StreamIo(_)));
    }
}
