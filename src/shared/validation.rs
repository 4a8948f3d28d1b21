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

//! Validation of destination paths before they reach the remote shell.
//!
//! The destination is interpolated into a shell command line and its final
//! component into the `C` control line, so it must not carry:
//! - shell metacharacters or command substitution
//! - path traversal sequences
//! - control characters (a newline would end the control line early)

use anyhow::Result;

/// Maximum accepted length of a remote path.
const MAX_PATH_LENGTH: usize = 4096;

/// Characters with special meaning to a POSIX shell.
const DANGEROUS_CHARS: &[char] = &[
    ';', '&', '|', '`', '$', '(', ')', '{', '}', '<', '>', '!', '*', '?', '[', ']', '\'', '"',
];

/// Validate a remote destination path.
///
/// Spaces are allowed; the command line quotes such paths.
///
/// # Errors
///
/// Returns an error if the path:
/// - is empty or longer than 4096 bytes
/// - contains control characters or shell metacharacters
/// - contains a `..` traversal component
/// - contains double slashes past the start
/// - contains symbols outside the usual path punctuation
///
/// Letters and digits from any script are accepted. A trailing `/` is kept
/// as is, since the recursive sink treats such a target as a directory.
///
/// # Examples
///
/// ```
/// use bscp::shared::validation::validate_remote_path;
///
/// assert!(validate_remote_path("/home/user/file.txt").is_ok());
/// assert!(validate_remote_path("~/documents/my report.pdf").is_ok());
///
/// assert!(validate_remote_path("/tmp/$(whoami)").is_err());
/// assert!(validate_remote_path("../etc/passwd").is_err());
/// ```
pub fn validate_remote_path(path: &str) -> Result<String> {
    if path.is_empty() {
        anyhow::bail!("Remote path cannot be empty");
    }

    if path.len() > MAX_PATH_LENGTH {
        anyhow::bail!("Remote path too long (max {MAX_PATH_LENGTH} characters)");
    }

    if let Some(ch) = path.chars().find(|c| c.is_control()) {
        anyhow::bail!("Remote path contains control character {ch:?}");
    }

    if let Some(ch) = path.chars().find(|c| DANGEROUS_CHARS.contains(c)) {
        anyhow::bail!("Remote path contains invalid character: '{ch}'");
    }

    if path.split(['/', '\\']).any(|component| component == "..") {
        anyhow::bail!("Remote path contains path traversal sequence");
    }

    if path.contains("//") && !path.starts_with("//") {
        anyhow::bail!("Remote path contains double slashes");
    }

    // Alphanumerics, spaces and common path punctuation only.
    let valid_chars = path.chars().all(|c| {
        c.is_alphanumeric()
            || matches!(
                c,
                '/' | '\\' | '.' | '-' | '_' | ' ' | '~' | '=' | ',' | ':' | '@' | '+' | '%'
            )
    });

    if !valid_chars {
        anyhow::bail!("Remote path contains invalid characters");
    }

    Ok(path.to_string())
}
