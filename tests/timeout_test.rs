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

mod common;

use bscp::scp::{copy_file_with_timeout, copy_with_timeout, TransferRequest, DEFAULT_SCP_BINARY};
use bscp::Error;
use common::FakeSession;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

async fn wait_until(condition: impl Fn() -> bool, limit: Duration) -> bool {
    let started = Instant::now();
    while started.elapsed() < limit {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn test_timeout_returns_before_slow_upload_finishes() {
    let session = Arc::new(FakeSession::new().with_command_delay(Duration::from_millis(1500)));
    let request = TransferRequest::new(&b"hello"[..], "/tmp/slow.txt", 644, 5);

    let started = Instant::now();
    let result = copy_with_timeout(
        session.clone(),
        request,
        DEFAULT_SCP_BINARY,
        Duration::from_millis(100),
    )
    .await;
    let elapsed = started.elapsed();

    assert!(result.as_ref().is_err_and(Error::is_timeout));
    match result {
        Err(Error::Timeout(d)) => assert_eq!(d, Duration::from_millis(100)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(elapsed < Duration::from_millis(1000), "took {elapsed:?}");
    assert!(!session.command_finished());

    // The detached upload keeps running to completion.
    assert!(wait_until(|| session.command_finished(), Duration::from_secs(5)).await);
    assert_eq!(session.written(), b"C0644 5 slow.txt\nhello\0");
}

#[tokio::test]
async fn test_fast_upload_within_deadline() {
    let session = Arc::new(FakeSession::new());
    let request = TransferRequest::new(&b"abc"[..], "/tmp/fast", 600, 3);

    copy_with_timeout(session.clone(), request, DEFAULT_SCP_BINARY, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(session.written(), b"C0600 3 fast\nabc\0");
}

#[tokio::test]
async fn test_failure_within_deadline_is_returned() {
    let session = Arc::new(FakeSession::new().with_command_failure("scp: no space left"));
    let request = TransferRequest::new(&b"abc"[..], "/tmp/full", 644, 3);

    let result = copy_with_timeout(
        session.clone(),
        request,
        DEFAULT_SCP_BINARY,
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(result, Err(Error::RemoteCommand { .. })));
}

#[tokio::test]
async fn test_copy_file_with_timeout() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"payload").unwrap();
    file.flush().unwrap();

    let session = Arc::new(FakeSession::new());
    copy_file_with_timeout(
        session.clone(),
        file.path(),
        "/srv/in/data.bin",
        644,
        DEFAULT_SCP_BINARY,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(session.written(), b"C0644 7 data.bin\npayload\0");
}

#[tokio::test]
async fn test_copy_file_with_timeout_missing_source() {
    let dir = tempfile::tempdir().unwrap();
    let session = Arc::new(FakeSession::new());

    let result = copy_file_with_timeout(
        session.clone(),
        dir.path().join("absent.bin"),
        "/tmp/absent.bin",
        644,
        DEFAULT_SCP_BINARY,
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(result, Err(Error::StreamIo(_))));
    assert!(session.commands().is_empty());
}

#[tokio::test]
async fn test_copy_file_with_timeout_slow_remote() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"x").unwrap();

    let session = Arc::new(FakeSession::new().with_command_delay(Duration::from_millis(1500)));
    let started = Instant::now();
    let result = copy_file_with_timeout(
        session.clone(),
        file.path(),
        "/tmp/x",
        644,
        DEFAULT_SCP_BINARY,
        Duration::from_millis(100),
    )
    .await;

    assert!(matches!(result, Err(Error::Timeout(_))));
    assert!(started.elapsed() < Duration::from_millis(1000));
}
