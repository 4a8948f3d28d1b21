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

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;

use super::tokio_client::{AuthDescriptor, Error, SessionHandle};
use crate::config::ScpConfig;
use crate::scp::{timeout, upload, TransferRequest};

/// Uploads files to one host over a single session.
///
/// ```no_run
/// use bscp::{AuthDescriptor, ScpClient, ServerCheckMethod};
///
/// # async fn demo() -> Result<(), bscp::Error> {
/// let auth = AuthDescriptor::from_private_key_file(
///     "deploy",
///     "/home/deploy/.ssh/id_ed25519",
///     None,
///     ServerCheckMethod::DefaultKnownHostsFile,
/// )?;
/// let client = ScpClient::new("build-01:22", auth);
/// client.connect().await?;
/// let result = client.copy_file("target/app.tar.gz", "/srv/app.tar.gz", 644).await;
/// client.close().await?;
/// result
/// # }
/// ```
#[derive(Debug)]
pub struct ScpClient {
    session: Arc<SessionHandle>,
    config: ScpConfig,
}

impl ScpClient {
    /// Client for `host` (`host:port`) with a one-minute transfer deadline.
    pub fn new(host: impl Into<String>, auth: AuthDescriptor) -> Self {
        Self::with_config(host, auth, ScpConfig::default())
    }

    /// Client with a custom transfer deadline.
    pub fn with_timeout(host: impl Into<String>, auth: AuthDescriptor, timeout: Duration) -> Self {
        Self::with_config(host, auth, ScpConfig::default().with_timeout(timeout))
    }

    pub fn with_config(host: impl Into<String>, auth: AuthDescriptor, config: ScpConfig) -> Self {
        let session =
            SessionHandle::with_config(host, auth, config.ssh.clone(), config.connect_timeout);
        Self {
            session: Arc::new(session),
            config,
        }
    }

    pub fn config(&self) -> &ScpConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionHandle> {
        &self.session
    }

    pub async fn connect(&self) -> Result<(), Error> {
        self.session.connect().await
    }

    /// Uploads `size` bytes from `source`, bounded by the configured deadline.
    pub async fn copy<R>(
        &self,
        source: R,
        remote_path: &str,
        mode: u32,
        size: u64,
    ) -> Result<(), Error>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let request = TransferRequest::new(source, remote_path, mode, size);
        match self.config.timeout {
            Some(deadline) => {
                timeout::copy_with_timeout(
                    self.session.clone(),
                    request,
                    self.config.remote_binary.clone(),
                    deadline,
                )
                .await
            }
            None => upload::copy(&*self.session, request, &self.config.remote_binary).await,
        }
    }

    /// Uploads a local file, bounded by the configured deadline.
    pub async fn copy_file(
        &self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
        mode: u32,
    ) -> Result<(), Error> {
        match self.config.timeout {
            Some(deadline) => {
                self.copy_file_with_timeout(local_path, remote_path, mode, deadline)
                    .await
            }
            None => {
                upload::copy_file(
                    &*self.session,
                    local_path,
                    remote_path,
                    mode,
                    &self.config.remote_binary,
                )
                .await
            }
        }
    }

    /// Uploads from `source` with an explicit deadline.
    pub async fn copy_with_timeout<R>(
        &self,
        source: R,
        remote_path: &str,
        mode: u32,
        size: u64,
        deadline: Duration,
    ) -> Result<(), Error>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        timeout::copy_with_timeout(
            self.session.clone(),
            TransferRequest::new(source, remote_path, mode, size),
            self.config.remote_binary.clone(),
            deadline,
        )
        .await
    }

    /// Uploads a local file with an explicit deadline.
    pub async fn copy_file_with_timeout(
        &self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
        mode: u32,
        deadline: Duration,
    ) -> Result<(), Error> {
        timeout::copy_file_with_timeout(
            self.session.clone(),
            local_path.as_ref(),
            remote_path,
            mode,
            self.config.remote_binary.clone(),
            deadline,
        )
        .await
    }

    pub async fn close(&self) -> Result<(), Error> {
        self.session.close().await
    }
}
