//! File transfer service tests: retry/backoff shape, audit-on-failure,
//! transient classification, and cancellation

mod helpers;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use helpers::create_test_db;
use profitshare_common::{Error, Result};
use profitshare_checkrun::db::audits;
use profitshare_checkrun::services::{FileTransferService, FileTransport, OutboxTransport};
use sqlx::{Row, SqlitePool};
use tokio_util::sync::CancellationToken;

/// Fails transiently a fixed number of times, then succeeds.
struct FlakyTransport {
    failures_before_success: u32,
    attempts: Arc<AtomicU32>,
}

#[async_trait::async_trait]
impl FileTransport for FlakyTransport {
    async fn send(&self, _destination: &str, _file_name: &str, _content: &[u8]) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures_before_success {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )))
        } else {
            Ok(())
        }
    }
}

/// Fails immediately with a non-transient error.
struct FatalTransport {
    attempts: Arc<AtomicU32>,
}

#[async_trait::async_trait]
impl FileTransport for FatalTransport {
    async fn send(&self, destination: &str, _file_name: &str, _content: &[u8]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::Config(format!("destination {} is not provisioned", destination)))
    }
}

async fn audit_rows(pool: &SqlitePool, file_name: &str) -> Vec<(bool, Option<String>, i64)> {
    sqlx::query(
        "SELECT is_success, error_message, file_size FROM file_transfer_audits WHERE file_name = ?",
    )
    .bind(file_name)
    .fetch_all(pool)
    .await
    .unwrap()
    .into_iter()
    .map(|row| {
        (
            row.get::<i64, _>("is_success") != 0,
            row.get("error_message"),
            row.get("file_size"),
        )
    })
    .collect()
}

#[tokio::test(start_paused = true)]
async fn two_transient_failures_then_success_takes_three_attempts() {
    let (_dir, pool) = create_test_db().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let service = FileTransferService::new(
        pool.clone(),
        FlakyTransport {
            failures_before_success: 2,
            attempts: attempts.clone(),
        },
    );

    let started = tokio::time::Instant::now();
    let cancel = CancellationToken::new();
    let audit = service
        .transfer(b"check file bytes", "/outbox", "PROFCHKS.txt", Some("jsmith"), None, &cancel)
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    // Backoff between attempts: 2s after the first failure, 4s after the second
    let elapsed = started.elapsed();
    assert!(elapsed >= std::time::Duration::from_secs(6), "elapsed {:?}", elapsed);
    assert!(elapsed < std::time::Duration::from_secs(7), "elapsed {:?}", elapsed);

    assert!(audit.is_success);
    assert_eq!(audit.file_size, 16);
    assert_eq!(audit.user_name.as_deref(), Some("jsmith"));

    let rows = audit_rows(&pool, "PROFCHKS.txt").await;
    assert_eq!(rows.len(), 1, "one audit row per transfer outcome, not per retry");
    assert!(rows[0].0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fail_and_still_leave_an_audit() {
    let (_dir, pool) = create_test_db().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let service = FileTransferService::new(
        pool.clone(),
        FlakyTransport {
            failures_before_success: u32::MAX,
            attempts: attempts.clone(),
        },
    );

    let cancel = CancellationToken::new();
    let err = service
        .transfer(b"check file bytes", "/outbox", "PROFCHKS.txt", Some("jsmith"), None, &cancel)
        .await
        .unwrap_err();

    assert_eq!(attempts.load(Ordering::SeqCst), 3, "bounded at three attempts");
    match err {
        Error::Transfer(msg) => {
            assert!(msg.contains("PROFCHKS.txt"), "failure names the file: {}", msg);
            assert!(msg.contains("connection reset"), "failure carries the cause: {}", msg);
        }
        other => panic!("expected transfer failure, got {:?}", other),
    }

    let rows = audit_rows(&pool, "PROFCHKS.txt").await;
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].0, "failed transfer must still produce an audit record");
    assert!(rows[0].1.as_deref().unwrap_or_default().contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn non_transient_errors_are_not_retried() {
    let (_dir, pool) = create_test_db().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let service = FileTransferService::new(pool.clone(), FatalTransport { attempts: attempts.clone() });

    let started = tokio::time::Instant::now();
    let cancel = CancellationToken::new();
    let err = service
        .transfer(b"bytes", "/outbox", "PROFCHKS.txt", None, None, &cancel)
        .await
        .unwrap_err();

    assert_eq!(attempts.load(Ordering::SeqCst), 1, "configuration errors fail immediately");
    assert_eq!(started.elapsed(), std::time::Duration::ZERO, "no backoff sleep");
    assert!(matches!(err, Error::Transfer(_)));

    let rows = audit_rows(&pool, "PROFCHKS.txt").await;
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_before_the_next_retry() {
    let (_dir, pool) = create_test_db().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let service = FileTransferService::new(
        pool.clone(),
        FlakyTransport {
            failures_before_success: u32::MAX,
            attempts: attempts.clone(),
        },
    );

    let cancel = CancellationToken::new();
    cancel.cancel();

    let started = tokio::time::Instant::now();
    let err = service
        .transfer(b"bytes", "/outbox", "PROFCHKS.txt", None, None, &cancel)
        .await
        .unwrap_err();

    // The in-flight attempt completes, but no retry sleep is entered
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), std::time::Duration::ZERO);
    match err {
        Error::Transfer(msg) => assert!(msg.contains("cancelled"), "{}", msg),
        other => panic!("expected transfer failure, got {:?}", other),
    }

    let rows = audit_rows(&pool, "PROFCHKS.txt").await;
    assert_eq!(rows.len(), 1, "cancelled transfers are audited too");
}

#[tokio::test]
async fn outbox_transport_lands_the_complete_file() {
    let (_dir, pool) = create_test_db().await;
    let outbox = tempfile::TempDir::new().unwrap();
    let destination = outbox.path().to_str().unwrap().to_string();
    let service = FileTransferService::new(pool.clone(), OutboxTransport);

    let cancel = CancellationToken::new();
    let audit = service
        .transfer(b"check file bytes", &destination, "PROFCHKS.txt", Some("jsmith"), None, &cancel)
        .await
        .unwrap();

    assert!(audit.is_success);
    let written = std::fs::read(outbox.path().join("PROFCHKS.txt")).unwrap();
    assert_eq!(written, b"check file bytes");
    // No partial temp file left behind
    assert!(!outbox.path().join(".PROFCHKS.txt.part").exists());

    assert_eq!(audits::count_for_file(&pool, "PROFCHKS.txt").await.unwrap(), 1);
}
