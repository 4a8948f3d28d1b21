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

//! SSH connection management and establishment.
//!
//! This module handles the low-level SSH connection establishment,
//! including address resolution, connection attempts, and initial handshake.

use russh::client::{Config, Handle, Handler, Msg};
use russh::Channel;
use std::fmt::Debug;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use super::authentication::{AuthDescriptor, HostIdentity, ServerCheckMethod};
use super::Error;

/// Port used when the target address does not name one.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// An authenticated ssh connection to a remote server.
pub struct Client {
    connection_handle: Handle<ClientHandler>,
    username: String,
    address: SocketAddr,
}

impl Client {
    /// Open an authenticated ssh connection to `target`.
    ///
    /// `target` is `host:port`, `[ipv6]:port` or a bare host (port 22).
    /// If the host resolves to multiple addresses, each is attempted until a
    /// connection succeeds. Authentication is tried on the first successful
    /// connection and the whole process aborted if it fails. Dial, handshake
    /// and authentication together are bounded by `connect_timeout`.
    pub async fn connect(
        target: &str,
        auth: &AuthDescriptor,
        config: Arc<Config>,
        connect_timeout: Duration,
    ) -> Result<Self, Error> {
        match tokio::time::timeout(connect_timeout, Self::connect_inner(target, auth, config)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Dial {
                address: target.to_string(),
                source: russh::Error::ConnectionTimeout,
            }),
        }
    }

    async fn connect_inner(
        target: &str,
        auth: &AuthDescriptor,
        config: Arc<Config>,
    ) -> Result<Self, Error> {
        let (hostname, port) = split_host_port(target).map_err(|source| Error::AddressInvalid {
            address: target.to_string(),
            source,
        })?;

        let socket_addrs: Vec<SocketAddr> = tokio::net::lookup_host((hostname.as_str(), port))
            .await
            .map_err(|source| Error::AddressInvalid {
                address: target.to_string(),
                source,
            })?
            .collect();

        // Connection code inspired from std::net::TcpStream::connect and std::net::each_addr
        let mut connect_res = Err(Error::AddressInvalid {
            address: target.to_string(),
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                "could not resolve to any addresses",
            ),
        });
        for socket_addr in socket_addrs {
            let handler =
                ClientHandler::new(hostname.clone(), socket_addr, auth.server_check().clone());
            tracing::debug!(address = %socket_addr, "Dialing");
            match russh::client::connect(config.clone(), socket_addr, handler).await {
                Ok(h) => {
                    connect_res = Ok((socket_addr, h));
                    break;
                }
                Err(e) => {
                    tracing::debug!(address = %socket_addr, error = %e, "Connection attempt failed");
                    connect_res = Err(dial_error(target, e));
                }
            }
        }
        let (address, mut handle) = connect_res?;

        super::authentication::authenticate(&mut handle, auth)
            .await
            .map_err(|e| dial_error(target, e))?;

        tracing::info!(user = %auth.username(), address = %address, "Connected and authenticated");
        Ok(Self {
            connection_handle: handle,
            username: auth.username().to_string(),
            address,
        })
    }

    /// Open a new session channel on this connection.
    pub async fn open_session(&self) -> Result<Channel<Msg>, Error> {
        self.connection_handle
            .channel_open_session()
            .await
            .map_err(Error::SessionOpen)
    }

    /// The username this client is connected as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The address this client is connected to.
    pub fn address(&self) -> &SocketAddr {
        &self.address
    }

    /// Disconnect from the remote host.
    pub async fn disconnect(&self) -> Result<(), russh::Error> {
        self.connection_handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.connection_handle.is_closed()
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("address", &self.address)
            .field("connection_handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// Maps a handshake failure to [`Error::Dial`], keeping already classified errors.
fn dial_error(target: &str, err: Error) -> Error {
    match err {
        Error::Ssh(source) => Error::Dial {
            address: target.to_string(),
            source,
        },
        other => other,
    }
}

/// Splits `host:port`, `[v6]:port` or a bare host into its parts.
pub fn split_host_port(target: &str) -> io::Result<(String, u16)> {
    let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidInput, msg.to_string());

    if target.is_empty() {
        return Err(invalid("empty address"));
    }

    if let Some(rest) = target.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid("unterminated '[' in address"))?;
        return match tail.strip_prefix(':') {
            Some(port) => Ok((host.to_string(), parse_port(port)?)),
            None if tail.is_empty() => Ok((host.to_string(), DEFAULT_SSH_PORT)),
            None => Err(invalid("unexpected characters after ']'")),
        };
    }

    match target.rsplit_once(':') {
        // More than one ':' without brackets is a bare IPv6 address.
        Some((host, _)) if host.contains(':') => Ok((target.to_string(), DEFAULT_SSH_PORT)),
        Some((host, port)) if !host.is_empty() => Ok((host.to_string(), parse_port(port)?)),
        Some(_) => Err(invalid("missing host")),
        None => Ok((target.to_string(), DEFAULT_SSH_PORT)),
    }
}

fn parse_port(port: &str) -> io::Result<u16> {
    port.parse::<u16>().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid port '{port}': {e}"),
        )
    })
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    host: SocketAddr,
    server_check: ServerCheckMethod,
}

impl ClientHandler {
    /// Create a new client handler.
    pub fn new(hostname: String, host: SocketAddr, server_check: ServerCheckMethod) -> Self {
        Self {
            hostname,
            host,
            server_check,
        }
    }
}

impl Handler for ClientHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let accepted = self.server_check.verify(&HostIdentity {
            hostname: &self.hostname,
            port: self.host.port(),
            key: server_public_key,
        });
        if !accepted {
            tracing::warn!(host = %self.hostname, "Host key rejected by verification policy");
        }
        Ok(accepted)
    }
}
