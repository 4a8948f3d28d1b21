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

//! Upload engine.
//!
//! An upload drives two activities over one session at the same time:
//!
//! - the **writer** opens the session's stdin pipe, sends the `C` control
//!   line, the stream's bytes and the terminating NUL, and closes the pipe
//!   on every exit path;
//! - the **command** runs `<scp> -rqt <remote path>` and waits for it to exit.
//!
//! Neither activity is cancelled when the other fails. Once both are done the
//! first recorded failure is returned; a later failure from the other
//! activity is logged and dropped.

use std::io;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::protocol::{self, SinkCommand};
use super::session::RemoteSession;
use crate::shared::validation::validate_remote_path;
use crate::ssh::tokio_client::Error;

/// A single-file upload.
///
/// `size` must equal the number of bytes `source` produces. The remote side
/// reads exactly `size` bytes before expecting the terminator, so a mismatch
/// corrupts the transfer; the engine only logs it.
#[derive(Debug)]
pub struct TransferRequest<R> {
    pub source: R,
    pub remote_path: String,
    /// Permission digits as written after `C0`, e.g. `644`.
    pub mode: u32,
    pub size: u64,
}

impl<R> TransferRequest<R> {
    pub fn new(source: R, remote_path: impl Into<String>, mode: u32, size: u64) -> Self {
        Self {
            source,
            remote_path: remote_path.into(),
            mode,
            size,
        }
    }
}

/// Single-assignment slot shared by the two activities. First failure wins.
#[derive(Default)]
struct FirstFailure(Mutex<Option<Error>>);

impl FirstFailure {
    fn record(&self, activity: &'static str, result: Result<(), Error>) {
        let Err(err) = result else {
            return;
        };
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            tracing::debug!(activity, error = %err, "Upload activity failed");
            *slot = Some(err);
        } else {
            tracing::debug!(activity, error = %err, "Discarding later upload failure");
        }
    }

    fn into_inner(self) -> Option<Error> {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Uploads `request.source` to `request.remote_path` through `session`.
///
/// `binary` is the path of scp on the remote host. The destination path is
/// validated before the session is touched.
pub async fn copy<S, R>(session: &S, request: TransferRequest<R>, binary: &str) -> Result<(), Error>
where
    S: RemoteSession + ?Sized,
    R: AsyncRead + Send + Unpin,
{
    let TransferRequest {
        source,
        remote_path,
        mode,
        size,
    } = request;

    validate_remote_path(&remote_path).map_err(|e| Error::InvalidRemotePath(e.to_string()))?;

    let header = protocol::file_header(mode, size, protocol::remote_file_name(&remote_path));
    let command = SinkCommand::new(binary, &remote_path).to_string();

    tracing::debug!(
        remote_path = %remote_path,
        size,
        mode,
        "Starting upload"
    );

    let failures = FirstFailure::default();
    let writer = async {
        let result = write_stream(session, source, header.as_bytes(), size).await;
        failures.record("writer", result);
    };
    let remote = async {
        let result = session.run_command(&command).await;
        failures.record("command", result);
    };
    tokio::join!(writer, remote);

    match failures.into_inner() {
        Some(err) => {
            tracing::warn!(remote_path = %remote_path, error = %err, "Upload failed");
            Err(err)
        }
        None => {
            tracing::info!(remote_path = %remote_path, size, "Upload complete");
            Ok(())
        }
    }
}

/// Uploads a local file, using its length as the declared size.
///
/// Failing to open or stat the file is reported as [`Error::StreamIo`]
/// before the session is used.
pub async fn copy_file<S, P>(
    session: &S,
    local_path: P,
    remote_path: &str,
    mode: u32,
    binary: &str,
) -> Result<(), Error>
where
    S: RemoteSession + ?Sized,
    P: AsRef<Path>,
{
    let local_path = local_path.as_ref();
    let file = tokio::fs::File::open(local_path).await.map_err(|e| {
        tracing::debug!(path = %local_path.display(), error = %e, "Cannot open local file");
        Error::StreamIo(e)
    })?;
    let size = file.metadata().await?.len();

    copy(session, TransferRequest::new(file, remote_path, mode, size), binary).await
}

/// Writer activity. The stdin pipe is shut down whatever happens.
async fn write_stream<S, R>(
    session: &S,
    mut source: R,
    header: &[u8],
    declared_size: u64,
) -> Result<(), Error>
where
    S: RemoteSession + ?Sized,
    R: AsyncRead + Send + Unpin,
{
    let mut stdin = session.open_stdin_pipe().await?;

    let result = send_file(&mut stdin, &mut source, header).await;
    let closed = stdin.shutdown().await;
    if let (Err(_), Err(e)) = (&result, &closed) {
        tracing::error!(error = %e, "Failed to close stdin pipe");
    }

    let written = result?;
    closed?;

    if written != declared_size {
        tracing::warn!(
            declared = declared_size,
            written,
            "Stream length differs from declared size"
        );
    }
    Ok(())
}

/// Control line, body, terminator. Returns the number of body bytes.
async fn send_file<W, R>(stdin: &mut W, source: &mut R, header: &[u8]) -> io::Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
    R: AsyncRead + Unpin + ?Sized,
{
    stdin.write_all(header).await?;
    let written = tokio::io::copy(source, stdin).await?;
    stdin.write_all(&[protocol::END_OF_FILE]).await?;
    stdin.flush().await?;
    Ok(written)
}
