//! Tests for StateManager

use super::*;
use crate::error::Error;
use crate::storage::BlobStore;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

fn scope() -> StateScope {
    StateScope::new("demo", "case", false)
}

fn manager() -> StateManager {
    StateManager::new(BlobStore::in_memory())
}

// ============================================================================
// Key Tests
// ============================================================================

#[test]
fn test_scope_keys() {
    assert_eq!(
        scope().key(StateKind::LastSuccessfulJobTime),
        "demo/snowflake-copy/case/last_successful_job_time.txt"
    );
    assert_eq!(
        StateScope::new("demo", "case", true).key(StateKind::ApiLimit),
        "demo/snowflake-copy/case-test/api_limit.txt"
    );
}

// ============================================================================
// Last Successful Job Time Tests
// ============================================================================

#[tokio::test]
async fn test_missing_job_time_is_none() {
    let manager = manager();
    assert!(manager
        .last_successful_job_time(&scope())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_job_time_roundtrip() {
    let manager = manager();
    let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();

    manager
        .save_last_successful_job_time(&scope(), &ts)
        .await
        .unwrap();

    assert_eq!(
        manager
            .store()
            .get_text("demo/snowflake-copy/case/last_successful_job_time.txt")
            .await
            .unwrap(),
        "2024-03-01T12:00:00"
    );
    assert_eq!(
        manager.last_successful_job_time(&scope()).await.unwrap(),
        Some(ts)
    );
}

#[tokio::test]
async fn test_test_mode_state_is_separate() {
    let manager = manager();
    let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    manager
        .save_last_successful_job_time(&StateScope::new("demo", "case", true), &ts)
        .await
        .unwrap();

    assert!(manager
        .last_successful_job_time(&scope())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_corrupt_job_time_is_state_error() {
    let manager = manager();
    manager
        .store()
        .put_text(&scope().key(StateKind::LastSuccessfulJobTime), "yesterday")
        .await
        .unwrap();

    let err = manager.last_successful_job_time(&scope()).await.unwrap_err();
    assert!(matches!(err, Error::State { .. }));
}

// ============================================================================
// Api Limit Tests
// ============================================================================

#[tokio::test]
async fn test_api_limit_roundtrip() {
    let manager = manager();
    assert_eq!(manager.api_limit(&scope()).await.unwrap(), None);

    manager.save_api_limit(&scope(), 250).await.unwrap();
    assert_eq!(manager.api_limit(&scope()).await.unwrap(), Some(250));
}

#[tokio::test]
async fn test_api_limit_tolerates_whitespace() {
    let manager = manager();
    manager
        .store()
        .put_text(&scope().key(StateKind::ApiLimit), "1200\n")
        .await
        .unwrap();
    assert_eq!(manager.api_limit(&scope()).await.unwrap(), Some(1200));
}

#[tokio::test]
async fn test_invalid_api_limit_is_state_error() {
    let manager = manager();
    for bad in ["0", "-5", "lots"] {
        manager
            .store()
            .put_text(&scope().key(StateKind::ApiLimit), bad)
            .await
            .unwrap();
        assert!(matches!(
            manager.api_limit(&scope()).await,
            Err(Error::State { .. })
        ));
    }
}
