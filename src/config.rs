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

//! Client configuration, fixed at construction.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::scp::protocol::DEFAULT_SCP_BINARY;
use crate::ssh::tokio_client::session::DEFAULT_CONNECT_TIMEOUT;

/// Transfer deadline applied when none is configured.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ScpConfig {
    /// Path of the scp binary on the remote host.
    pub remote_binary: String,
    /// Deadline for a whole upload. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Bound on dial, handshake and authentication.
    pub connect_timeout: Duration,
    /// Transport settings passed to russh.
    pub ssh: Arc<russh::client::Config>,
}

impl Default for ScpConfig {
    fn default() -> Self {
        Self {
            remote_binary: DEFAULT_SCP_BINARY.to_string(),
            timeout: Some(DEFAULT_TRANSFER_TIMEOUT),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ssh: Arc::new(russh::client::Config::default()),
        }
    }
}

impl fmt::Debug for ScpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScpConfig")
            .field("remote_binary", &self.remote_binary)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl ScpConfig {
    pub fn with_remote_binary(mut self, binary: impl Into<String>) -> Self {
        self.remote_binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable the transfer deadline.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_ssh_config(mut self, config: russh::client::Config) -> Self {
        self.ssh = Arc::new(config);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScpConfig::default();
        assert_eq!(config.remote_binary, "/usr/bin/scp");
        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builders() {
        let config = ScpConfig::default()
            .with_remote_binary("/opt/openssh/bin/scp")
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(2));
        assert_eq!(config.remote_binary, "/opt/openssh/bin/scp");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));

        assert_eq!(config.without_timeout().timeout, None);
    }
}
