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

//! In-memory session used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bscp::{Error, RemoteSession};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::AsyncWrite;

/// Stdin pipe that records everything written to it.
pub struct CapturingPipe {
    buffer: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
    fail_after: Option<usize>,
}

impl AsyncWrite for CapturingPipe {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut buffer = self.buffer.lock().unwrap();
        let accepted = match self.fail_after {
            Some(limit) if buffer.len() >= limit => {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "pipe closed by remote",
                )));
            }
            Some(limit) => buf.len().min(limit - buffer.len()),
            None => buf.len(),
        };
        buffer.extend_from_slice(&buf[..accepted]);
        Poll::Ready(Ok(accepted))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.closed.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Scriptable [`RemoteSession`].
#[derive(Default)]
pub struct FakeSession {
    written: Arc<Mutex<Vec<u8>>>,
    stdin_closed: Arc<AtomicBool>,
    command_finished: Arc<AtomicBool>,
    commands: Mutex<Vec<String>>,
    fail_after: Option<usize>,
    open_delay: Option<Duration>,
    command_delay: Option<Duration>,
    command_failure: Option<String>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stdin pipe breaks once `bytes` bytes have been accepted.
    pub fn failing_pipe_after(mut self, bytes: usize) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = Some(delay);
        self
    }

    /// Remote command exits with status 1 and `message` on stderr.
    pub fn with_command_failure(mut self, message: &str) -> Self {
        self.command_failure = Some(message.to_string());
        self
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn stdin_closed(&self) -> bool {
        self.stdin_closed.load(Ordering::SeqCst)
    }

    pub fn command_finished(&self) -> bool {
        self.command_finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSession for FakeSession {
    type Stdin = CapturingPipe;

    async fn open_stdin_pipe(&self) -> Result<Self::Stdin, Error> {
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(CapturingPipe {
            buffer: self.written.clone(),
            closed: self.stdin_closed.clone(),
            fail_after: self.fail_after,
        })
    }

    async fn run_command(&self, command: &str) -> Result<(), Error> {
        self.commands.lock().unwrap().push(command.to_string());
        if let Some(delay) = self.command_delay {
            tokio::time::sleep(delay).await;
        }
        self.command_finished.store(true, Ordering::SeqCst);
        match &self.command_failure {
            Some(message) => Err(Error::RemoteCommand {
                command: command.to_string(),
                exit_status: Some(1),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}
