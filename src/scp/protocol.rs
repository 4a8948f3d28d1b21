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

//! Wire framing for the upload (sink) side of the scp protocol.
//!
//! A single file is sent as:
//!
//! ```text
//! C<mode> <size> <name>\n
//! <size raw bytes>
//! \0
//! ```
//!
//! Only the `C` record is ever produced. Directory (`D`/`E`) and timestamp
//! (`T`) records are not part of this client.

use std::borrow::Cow;
use std::fmt;

/// Default location of the remote scp binary.
pub const DEFAULT_SCP_BINARY: &str = "/usr/bin/scp";

/// Byte terminating the file contents.
pub const END_OF_FILE: u8 = 0;

/// SCP protocol status codes.
const SCP_OK: u8 = 0;
const SCP_WARNING: u8 = 1;
const SCP_ERROR: u8 = 2;

/// Final path component of a remote path, as addressed by the `C` record.
///
/// Trailing slashes are ignored; a path of only slashes yields `/` and an
/// empty path yields `.`.
pub fn remote_file_name(remote_path: &str) -> &str {
    if remote_path.is_empty() {
        return ".";
    }
    let trimmed = remote_path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Control line announcing a single file.
///
/// `mode` holds the permission digits as the remote side reads them, so
/// `644` becomes `C0644`. The value is written out unchanged behind `C0`.
pub fn file_header(mode: u32, size: u64, file_name: &str) -> String {
    format!("C0{} {} {}\n", mode, size, file_name)
}

/// Remote scp invocation in sink mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkCommand<'a> {
    /// Path of the scp binary on the remote host.
    pub binary: &'a str,
    /// Destination path passed to `-t`.
    pub target: &'a str,
    /// Whether recursive mode is enabled (-r).
    pub recursive: bool,
    /// Quiet mode (-q).
    pub quiet: bool,
    /// Whether to preserve times (-p).
    pub preserve_times: bool,
}

impl<'a> SinkCommand<'a> {
    /// The invocation used for uploads: `<binary> -rqt <target>`.
    pub fn new(binary: &'a str, target: &'a str) -> Self {
        Self {
            binary,
            target,
            recursive: true,
            quiet: true,
            preserve_times: false,
        }
    }
}

impl fmt::Display for SinkCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = String::from("-");
        if self.recursive {
            flags.push('r');
        }
        if self.quiet {
            flags.push('q');
        }
        if self.preserve_times {
            flags.push('p');
        }
        flags.push('t');
        write!(f, "{} {} {}", self.binary, flags, quote_target(self.target))
    }
}

/// Single-quotes targets containing whitespace.
///
/// Validated remote paths never contain a quote, so wrapping is sufficient.
/// A leading `~/` stays outside the quotes so the remote shell still expands it.
fn quote_target(target: &str) -> Cow<'_, str> {
    if !target.chars().any(char::is_whitespace) {
        return Cow::Borrowed(target);
    }
    match target.strip_prefix("~/") {
        Some(rest) => Cow::Owned(format!("~/'{rest}'")),
        None => Cow::Owned(format!("'{target}'")),
    }
}

/// Status record reported by the remote sink on its stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkReply {
    Warning(String),
    Error(String),
}

impl SinkReply {
    pub fn message(&self) -> &str {
        match self {
            SinkReply::Warning(msg) | SinkReply::Error(msg) => msg,
        }
    }
}

/// Finds the first warning or error record in the sink's stdout.
///
/// Plain acknowledgements (`\0`) are skipped.
pub fn first_failure(output: &[u8]) -> Option<SinkReply> {
    let mut rest = output;
    while let Some((&status, tail)) = rest.split_first() {
        match status {
            SCP_OK => rest = tail,
            SCP_WARNING | SCP_ERROR => {
                let end = tail.iter().position(|&b| b == b'\n').unwrap_or(tail.len());
                let message = String::from_utf8_lossy(&tail[..end]).trim().to_string();
                return Some(if status == SCP_ERROR {
                    SinkReply::Error(message)
                } else {
                    SinkReply::Warning(message)
                });
            }
            // Anything else is not a status record; skip to the next line.
            _ => {
                let next = tail.iter().position(|&b| b == b'\n').map_or(tail.len(), |p| p + 1);
                rest = &tail[next..];
            }
        }
    }
    None
}
