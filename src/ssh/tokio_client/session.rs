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

//! Session handle over a russh connection.
//!
//! A [`SessionHandle`] owns one connection and one session channel on it.
//! It is created empty, [`connect`](SessionHandle::connect)ed once, used for
//! a single remote command and finally [`close`](SessionHandle::close)d.
//!
//! The stdin pipe handed to callers is an in-memory pipe. Its contents are
//! forwarded to the channel only after the remote command has been started,
//! so a writer may begin producing data before, during or after the exec
//! request without losing bytes.

use async_trait::async_trait;
use russh::client::{Config, Msg};
use russh::{Channel, ChannelMsg};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::Mutex;

use super::authentication::AuthDescriptor;
use super::connection::Client;
use super::Error;
use crate::scp::protocol::{self, SinkReply};
use crate::scp::RemoteSession;

/// Capacity of the in-memory stdin pipe (64 KB).
const STDIN_PIPE_BUFFER_SIZE: usize = 64 * 1024;

/// Initial capacity for captured stdout/stderr of the remote command (1 KB).
const SSH_RESPONSE_BUFFER_SIZE: usize = 1024;

/// Default bound for dial, handshake and authentication.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection and session owned by a connected handle. Both exist together.
struct Connected {
    client: Client,
    /// Taken by the first `run_command`.
    channel: Option<Channel<Msg>>,
    /// Taken by the first `open_stdin_pipe`.
    stdin_writer: Option<DuplexStream>,
    /// Taken together with the channel.
    stdin_reader: Option<DuplexStream>,
}

/// One remote-shell session over an authenticated connection.
///
/// Concurrent uploads on the same handle are not supported: the session
/// carries exactly one remote command.
pub struct SessionHandle {
    target: String,
    auth: AuthDescriptor,
    config: Arc<Config>,
    connect_timeout: Duration,
    state: Mutex<Option<Connected>>,
}

impl SessionHandle {
    /// Creates an unconnected handle for `target` (`host:port`).
    pub fn new(target: impl Into<String>, auth: AuthDescriptor) -> Self {
        Self::with_config(
            target,
            auth,
            Arc::new(Config::default()),
            DEFAULT_CONNECT_TIMEOUT,
        )
    }

    /// Same as `new`, with an explicit transport configuration.
    pub fn with_config(
        target: impl Into<String>,
        auth: AuthDescriptor,
        config: Arc<Config>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            auth,
            config,
            connect_timeout,
            state: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn auth(&self) -> &AuthDescriptor {
        &self.auth
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Dials the target, authenticates and opens one session channel.
    ///
    /// Fails with a dial-family error ([`Error::is_dial_error`]) or
    /// [`Error::SessionOpen`]. A second call on a connected handle returns
    /// [`Error::AlreadyConnected`].
    pub async fn connect(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let client = Client::connect(
            &self.target,
            &self.auth,
            self.config.clone(),
            self.connect_timeout,
        )
        .await?;

        let channel = match client.open_session().await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(disconnect_err) = client.disconnect().await {
                    tracing::debug!(error = %disconnect_err, "Disconnect after failed session open");
                }
                return Err(e);
            }
        };
        tracing::debug!(target = %self.target, "Session channel opened");

        let (stdin_writer, stdin_reader) = tokio::io::duplex(STDIN_PIPE_BUFFER_SIZE);
        *state = Some(Connected {
            client,
            channel: Some(channel),
            stdin_writer: Some(stdin_writer),
            stdin_reader: Some(stdin_reader),
        });
        Ok(())
    }

    /// Releases the connection, then the session.
    ///
    /// A session the peer already closed is not an error. Safe to call after
    /// a failed upload.
    pub async fn close(&self) -> Result<(), Error> {
        let connected = self.state.lock().await.take().ok_or(Error::NotConnected)?;

        if let Err(e) = connected.client.disconnect().await {
            if !is_already_closed(&e) {
                return Err(Error::Close(e));
            }
            tracing::debug!(error = %e, "Connection was already closed");
        }

        if let Some(channel) = connected.channel {
            if let Err(e) = channel.close().await {
                if !is_already_closed(&e) {
                    return Err(Error::Close(e));
                }
                tracing::debug!(error = %e, "Session was already closed by peer");
            }
        }

        tracing::debug!(target = %self.target, "Session closed");
        Ok(())
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("target", &self.target)
            .field("username", &self.auth.username())
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[async_trait]
impl RemoteSession for SessionHandle {
    type Stdin = DuplexStream;

    async fn open_stdin_pipe(&self) -> Result<Self::Stdin, Error> {
        let mut state = self.state.lock().await;
        let connected = state.as_mut().ok_or(Error::NotConnected)?;
        connected.stdin_writer.take().ok_or(Error::StdinUnavailable)
    }

    async fn run_command(&self, command: &str) -> Result<(), Error> {
        let (channel, stdin) = {
            let mut state = self.state.lock().await;
            let connected = state.as_mut().ok_or(Error::NotConnected)?;
            let channel = connected.channel.take().ok_or_else(|| Error::RemoteCommand {
                command: command.to_string(),
                exit_status: None,
                message: "session has already run a command".to_string(),
            })?;
            (channel, connected.stdin_reader.take())
        };
        run_on_channel(channel, command, stdin).await
    }
}

/// Execs `command`, feeds it `stdin` and waits until the channel closes.
async fn run_on_channel(
    mut channel: Channel<Msg>,
    command: &str,
    stdin: Option<DuplexStream>,
) -> Result<(), Error> {
    let failure = |exit_status: Option<u32>, message: String| Error::RemoteCommand {
        command: command.to_string(),
        exit_status,
        message,
    };

    channel
        .exec(true, command)
        .await
        .map_err(|e| failure(None, e.to_string()))?;
    tracing::debug!(command, "Remote command started");

    let mut channel_writer = channel.make_writer();
    let forward = async move {
        if let Some(mut stdin) = stdin {
            tokio::io::copy(&mut stdin, &mut channel_writer).await?;
        }
        // Delivers EOF to the remote command.
        channel_writer.shutdown().await
    };
    tokio::pin!(forward);

    let mut forwarding = true;
    let mut stdout = Vec::with_capacity(SSH_RESPONSE_BUFFER_SIZE);
    let mut stderr = Vec::with_capacity(SSH_RESPONSE_BUFFER_SIZE);
    let mut exit_status: Option<u32> = None;
    let mut abnormal: Option<String> = None;

    loop {
        tokio::select! {
            result = &mut forward, if forwarding => {
                forwarding = false;
                if let Err(e) = result {
                    tracing::debug!(error = %e, "Forwarding stdin to remote command stopped");
                }
            }
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { ref data }) => stdout.extend_from_slice(data),
                Some(ChannelMsg::ExtendedData { ref data, ext }) if ext == 1 => {
                    stderr.extend_from_slice(data)
                }
                // Don't stop on the exit status; data may still follow.
                Some(ChannelMsg::ExitStatus { exit_status: status }) => exit_status = Some(status),
                Some(ChannelMsg::ExitSignal { signal_name, error_message, .. }) => {
                    abnormal = Some(format!("terminated by signal {signal_name:?} {error_message}"));
                }
                // A refused exec leaves the channel open with nothing to wait for.
                Some(ChannelMsg::Failure) => {
                    tracing::debug!(command, "Remote side refused the exec request");
                    return Err(failure(
                        None,
                        "remote shell refused to execute the command".to_string(),
                    ));
                }
                Some(_) => {}
                None => break,
            }
        }
    }

    let reply = protocol::first_failure(&stdout);
    match exit_status {
        Some(0) if abnormal.is_none() => {
            if let Some(reply) = reply {
                tracing::warn!(command, message = %reply.message(), "Remote command reported a warning");
            }
            tracing::debug!(command, "Remote command finished");
            Ok(())
        }
        status => Err(failure(
            status,
            describe_failure(status, reply, &stderr, abnormal),
        )),
    }
}

/// Picks the most specific description of a failed remote command.
fn describe_failure(
    status: Option<u32>,
    reply: Option<SinkReply>,
    stderr: &[u8],
    abnormal: Option<String>,
) -> String {
    if let Some(reply) = reply {
        return reply.message().to_string();
    }
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    if let Some(abnormal) = abnormal {
        return abnormal;
    }
    match status {
        Some(code) => format!("exited with status {code}"),
        None => "exited without reporting a status".to_string(),
    }
}

/// Whether a close failure only means the other side is already gone.
pub(crate) fn is_already_closed(err: &russh::Error) -> bool {
    match err {
        russh::Error::Disconnect | russh::Error::HUP | russh::Error::SendError => true,
        russh::Error::IO(e) => matches!(
            e.kind(),
            io::ErrorKind::BrokenPipe
                | io::ErrorKind::NotConnected
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}
