use crate::error::{Error, JobError};
use crate::machine::test_helpers::{
    VALID_URL, create_test_machine, drain, ready_job, wait_for_status,
};
use crate::types::{Event, JobState, Status};
use std::time::Duration;

// --- select_format() ---

#[tokio::test(start_paused = true)]
async fn test_unknown_format_is_rejected() {
    let machine = create_test_machine();
    match machine.select_format("flac-24").await {
        Err(Error::UnknownFormat(id)) => assert_eq!(id, "flac-24"),
        other => panic!("expected UnknownFormat, got {other:?}"),
    }
    assert!(machine.snapshot().format.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_selecting_before_analysis_carries_into_the_job() {
    let machine = create_test_machine();
    let mut rx = machine.subscribe();

    machine.select_format("mp3-128").await.unwrap();
    let id = machine.analyze(VALID_URL).await.unwrap();
    let ready = wait_for_status(&machine, Status::Ready).await;

    assert_eq!(ready.format.as_deref(), Some("mp3-128"));
    assert_eq!(
        drain(&mut rx)[0],
        Event::FormatSelected {
            id: None,
            format: "mp3-128".to_string()
        }
    );
    assert_eq!(ready.id, Some(id));
}

#[tokio::test(start_paused = true)]
async fn test_reselecting_the_same_format_emits_nothing() {
    let machine = create_test_machine();
    let id = ready_job(&machine, "mp4-720").await;
    let mut rx = machine.subscribe();

    machine.select_format("mp4-720").await.unwrap();
    assert!(drain(&mut rx).is_empty());

    machine.select_format("mp4-480").await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![Event::FormatSelected {
            id: Some(id),
            format: "mp4-480".to_string()
        }]
    );
}

// --- reset() ---

#[tokio::test(start_paused = true)]
async fn test_reset_after_completion_clears_everything() {
    let machine = create_test_machine();
    ready_job(&machine, "mp3-320").await;
    machine.download().await.unwrap();
    wait_for_status(&machine, Status::Complete).await;
    let mut rx = machine.subscribe();

    machine.reset().await.unwrap();

    assert_eq!(machine.snapshot(), JobState::default());
    assert_eq!(drain(&mut rx), vec![Event::Reset]);
}

#[tokio::test(start_paused = true)]
async fn test_reset_is_rejected_while_busy() {
    let machine = create_test_machine();
    machine.analyze(VALID_URL).await.unwrap();
    assert!(matches!(
        machine.reset().await,
        Err(Error::Job(JobError::InvalidState { .. }))
    ));

    machine.select_format("mp3-320").await.unwrap();
    wait_for_status(&machine, Status::Ready).await;
    machine.download().await.unwrap();
    assert!(matches!(
        machine.reset().await,
        Err(Error::Job(JobError::InvalidState { .. }))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_reset_from_ready_drops_the_job() {
    let machine = create_test_machine();
    ready_job(&machine, "mp3-320").await;

    machine.reset().await.unwrap();
    let state = machine.snapshot();
    assert_eq!(state.status, Status::Idle);
    assert!(state.id.is_none());
    assert!(state.format.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_reset_from_idle_is_quiet() {
    let machine = create_test_machine();
    let mut rx = machine.subscribe();
    machine.reset().await.unwrap();
    assert!(drain(&mut rx).is_empty());
}

// --- fail() ---

#[tokio::test(start_paused = true)]
async fn test_fail_during_download_stops_progress() {
    let machine = create_test_machine();
    let id = ready_job(&machine, "mp3-320").await;
    machine.download().await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let mut rx = machine.subscribe();

    machine.fail("network went away").await.unwrap();
    let failed = machine.snapshot();
    assert_eq!(failed.status, Status::Error);
    assert_eq!(failed.error.as_deref(), Some("network went away"));
    assert!(failed.result_url.is_none());

    tokio::time::sleep(Duration::from_secs(1)).await;
    let later = machine.snapshot();
    assert_eq!(later.status, Status::Error);
    assert_eq!(later.progress, failed.progress, "ticker must be cancelled");

    assert_eq!(
        drain(&mut rx),
        vec![Event::Failed {
            id: Some(id),
            error: "network went away".to_string()
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_error_is_terminal_until_reset() {
    let machine = create_test_machine();
    ready_job(&machine, "mp3-320").await;
    machine.fail("boom").await.unwrap();

    assert!(machine.analyze(VALID_URL).await.is_err());
    assert!(machine.download().await.is_err());
    assert!(machine.select_format("mp3-128").await.is_err());

    machine.reset().await.unwrap();
    assert_eq!(machine.snapshot().status, Status::Idle);
    machine.analyze(VALID_URL).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reset_from_error_restores_default_state() {
    let machine = create_test_machine();
    ready_job(&machine, "mp4-1080").await;
    machine.fail("analysis service unavailable").await.unwrap();
    assert_eq!(machine.snapshot().format.as_deref(), Some("mp4-1080"));

    machine.reset().await.unwrap();
    assert_eq!(machine.snapshot(), JobState::default());
}

#[tokio::test(start_paused = true)]
async fn test_fail_rejected_once_complete() {
    let machine = create_test_machine();
    ready_job(&machine, "mp3-320").await;
    machine.download().await.unwrap();
    let done = wait_for_status(&machine, Status::Complete).await;
    let mut rx = machine.subscribe();

    let result = machine.fail("late failure").await;
    assert!(matches!(
        result,
        Err(Error::Job(JobError::InvalidState { .. }))
    ));
    assert_eq!(machine.snapshot(), done);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fail_rejected_when_already_failed() {
    let machine = create_test_machine();
    ready_job(&machine, "mp3-320").await;
    machine.fail("first").await.unwrap();

    assert!(machine.fail("second").await.is_err());
    assert_eq!(machine.snapshot().error.as_deref(), Some("first"));
}
