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

//! Deadline-bounded uploads.
//!
//! The upload runs as a spawned task. If the deadline passes first the caller
//! gets [`Error::Timeout`] and the task keeps running in the background until
//! it finishes on its own; it is neither cancelled nor awaited, and its
//! outcome is discarded.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;

use super::session::RemoteSession;
use super::upload::{self, TransferRequest};
use crate::ssh::tokio_client::Error;

/// Runs [`upload::copy`] and waits at most `timeout` for it.
pub async fn copy_with_timeout<S, R>(
    session: Arc<S>,
    request: TransferRequest<R>,
    binary: impl Into<String>,
    timeout: Duration,
) -> Result<(), Error>
where
    S: RemoteSession + 'static,
    R: AsyncRead + Send + Unpin + 'static,
{
    let binary = binary.into();
    let task = tokio::spawn(async move { upload::copy(&*session, request, &binary).await });
    wait_with_deadline(task, timeout).await
}

/// Runs [`upload::copy_file`] and waits at most `timeout` for it.
///
/// Opening the local file happens inside the deadline.
pub async fn copy_file_with_timeout<S>(
    session: Arc<S>,
    local_path: impl Into<PathBuf>,
    remote_path: impl Into<String>,
    mode: u32,
    binary: impl Into<String>,
    timeout: Duration,
) -> Result<(), Error>
where
    S: RemoteSession + 'static,
{
    let local_path = local_path.into();
    let remote_path = remote_path.into();
    let binary = binary.into();
    let task = tokio::spawn(async move {
        upload::copy_file(&*session, &local_path, &remote_path, mode, &binary).await
    });
    wait_with_deadline(task, timeout).await
}

async fn wait_with_deadline(
    task: JoinHandle<Result<(), Error>>,
    timeout: Duration,
) -> Result<(), Error> {
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::TaskFailed(join_err.to_string())),
        Err(_) => {
            // Dropping the JoinHandle detaches the task.
            tracing::warn!(
                ?timeout,
                "Upload deadline passed; leaving transfer to finish in background"
            );
            Err(Error::Timeout(timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let task: JoinHandle<Result<(), Error>> = tokio::spawn(async { Err(Error::NotConnected) });
        let result = wait_with_deadline(task, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        let result = wait_with_deadline(task, Duration::from_millis(100)).await;
        match result {
            Err(Error::Timeout(d)) => assert_eq!(d, Duration::from_millis(100)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let task: JoinHandle<Result<(), Error>> = tokio::spawn(async { panic!("writer exploded") });
        let result = wait_with_deadline(task, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(Error::TaskFailed(_))));
    }
}
