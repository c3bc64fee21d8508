use super::*;
use crate::types::Status;
use std::sync::Mutex as StdMutex;
use tempfile::NamedTempFile;

fn recorder() -> (WatchCallback, Arc<StdMutex<Vec<JobRecord>>>) {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: WatchCallback = Arc::new(move |record: &JobRecord| {
        sink.lock().unwrap().push(record.clone());
    });
    (callback, seen)
}

fn start_patch() -> JobPatch {
    JobPatch {
        url: Some("https://youtu.be/abc123".to_string()),
        format: Some("mp3-320".to_string()),
        status: Some(Status::Downloading),
        progress: Some(0.0),
        ..Default::default()
    }
}

// --- WatchRegistry ---

#[test]
fn notify_reaches_only_the_matching_key() {
    let registry = WatchRegistry::new();
    let user = UserId::new("u1");
    let (callback, seen) = recorder();
    let _sub = registry.register(&user, JobId(1), callback);

    registry.notify(&JobRecord::empty(user.clone(), JobId(2)));
    registry.notify(&JobRecord::empty(UserId::new("u2"), JobId(1)));
    assert!(seen.lock().unwrap().is_empty());

    registry.notify(&JobRecord::empty(user, JobId(1)));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn unsubscribe_stops_notifications() {
    let registry = WatchRegistry::new();
    let user = UserId::new("u1");
    let (callback, seen) = recorder();
    let sub = registry.register(&user, JobId(1), callback);
    assert_eq!(sub.job_id(), JobId(1));
    assert_eq!(registry.watcher_count(&user, JobId(1)), 1);

    sub.unsubscribe();
    assert_eq!(registry.watcher_count(&user, JobId(1)), 0);

    registry.notify(&JobRecord::empty(user, JobId(1)));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn dropping_a_subscription_unregisters_it() {
    let registry = WatchRegistry::new();
    let user = UserId::new("u1");
    {
        let (callback, _seen) = recorder();
        let _sub = registry.register(&user, JobId(5), callback);
        assert_eq!(registry.watcher_count(&user, JobId(5)), 1);
    }
    assert_eq!(registry.watcher_count(&user, JobId(5)), 0);
}

#[test]
fn subscription_outliving_its_registry_is_harmless() {
    let (callback, _seen) = recorder();
    let sub = {
        let registry = WatchRegistry::new();
        registry.register(&UserId::new("u1"), JobId(1), callback)
    };
    sub.unsubscribe();
}

#[test]
fn callback_may_drop_subscriptions_during_notify() {
    let registry = WatchRegistry::new();
    let user = UserId::new("u1");
    let slot: Arc<StdMutex<Option<Subscription>>> = Arc::new(StdMutex::new(None));

    let slot_in_cb = slot.clone();
    let callback: WatchCallback = Arc::new(move |_record: &JobRecord| {
        slot_in_cb.lock().unwrap().take();
    });
    *slot.lock().unwrap() = Some(registry.register(&user, JobId(1), callback));

    registry.notify(&JobRecord::empty(user.clone(), JobId(1)));
    assert_eq!(registry.watcher_count(&user, JobId(1)), 0);
}

// --- MemoryStore ---

#[tokio::test]
async fn memory_put_creates_then_merges() {
    let store = MemoryStore::new();
    let user = UserId::new("u1");
    assert!(store.is_empty().await);

    let created = store.put(&user, JobId(9), &start_patch()).await.unwrap();
    assert_eq!(created.status, Status::Downloading);
    assert_eq!(created.user_id, user);

    let merged = store
        .put(&user, JobId(9), &JobPatch::progress(42.0))
        .await
        .unwrap();
    assert_eq!(merged.progress, 42.0);
    assert_eq!(merged.format.as_deref(), Some("mp3-320"));
    assert_eq!(merged.created_at, created.created_at);

    assert_eq!(store.len().await, 1);
    assert_eq!(store.get(&user, JobId(9)).await.unwrap(), Some(merged));
    assert!(store.get(&UserId::new("u2"), JobId(9)).await.unwrap().is_none());
}

#[tokio::test]
async fn memory_watch_sees_every_write_in_order() {
    let store = MemoryStore::new();
    let user = UserId::new("u1");
    let (callback, seen) = recorder();
    let sub = store.watch(&user, JobId(3), callback);

    store.put(&user, JobId(3), &start_patch()).await.unwrap();
    store
        .put(&user, JobId(3), &JobPatch::progress(10.0))
        .await
        .unwrap();
    store
        .put(&user, JobId(3), &JobPatch::progress(55.0))
        .await
        .unwrap();

    let progress: Vec<f32> = seen.lock().unwrap().iter().map(|r| r.progress).collect();
    assert_eq!(progress, vec![0.0, 10.0, 55.0]);

    sub.unsubscribe();
    store
        .put(&user, JobId(3), &JobPatch::progress(60.0))
        .await
        .unwrap();
    assert_eq!(seen.lock().unwrap().len(), 3);
    assert_eq!(store.watchers().watcher_count(&user, JobId(3)), 0);
}

// --- SqliteStore ---

#[tokio::test]
async fn sqlite_put_and_get_round_trip() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = SqliteStore::new(temp_file.path()).await.unwrap();
    let user = UserId::new("u1");

    assert!(store.get(&user, JobId(1)).await.unwrap().is_none());

    let created = store.put(&user, JobId(1), &start_patch()).await.unwrap();
    let fetched = store.get(&user, JobId(1)).await.unwrap().unwrap();
    assert_eq!(fetched.url, "https://youtu.be/abc123");
    assert_eq!(fetched.status, Status::Downloading);
    assert_eq!(
        fetched.created_at.timestamp_millis(),
        created.created_at.timestamp_millis()
    );

    store
        .put(
            &user,
            JobId(1),
            &JobPatch {
                status: Some(Status::Complete),
                progress: Some(100.0),
                result_url: Some(Some("https://files.example/1/mp3-320.mp3".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let done = store.get(&user, JobId(1)).await.unwrap().unwrap();
    assert_eq!(done.status, Status::Complete);
    assert_eq!(done.progress, 100.0);
    assert_eq!(done.format.as_deref(), Some("mp3-320"));
    assert!(done.result_url.is_some());

    store.close().await;
}

#[tokio::test]
async fn sqlite_namespaces_are_separate() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = SqliteStore::new(temp_file.path()).await.unwrap();
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");

    store.put(&alice, JobId(1), &start_patch()).await.unwrap();
    store.put(&alice, JobId(2), &start_patch()).await.unwrap();
    store.put(&bob, JobId(1), &start_patch()).await.unwrap();

    assert_eq!(store.count_for_user(&alice).await.unwrap(), 2);
    assert_eq!(store.count_for_user(&bob).await.unwrap(), 1);

    store.close().await;
}

#[tokio::test]
async fn sqlite_reopen_keeps_records_and_skips_applied_migrations() {
    let temp_file = NamedTempFile::new().unwrap();
    let user = UserId::new("u1");
    {
        let store = SqliteStore::new(temp_file.path()).await.unwrap();
        store.put(&user, JobId(77), &start_patch()).await.unwrap();
        store.close().await;
    }

    let store = SqliteStore::new(temp_file.path()).await.unwrap();
    let record = store.get(&user, JobId(77)).await.unwrap().unwrap();
    assert_eq!(record.format.as_deref(), Some("mp3-320"));
    store.close().await;
}

#[tokio::test]
async fn sqlite_watch_is_notified_after_commit() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = SqliteStore::new(temp_file.path()).await.unwrap();
    let user = UserId::new("u1");
    let (callback, seen) = recorder();
    let _sub = store.watch(&user, JobId(4), callback);

    store.put(&user, JobId(4), &start_patch()).await.unwrap();
    store
        .put(&user, JobId(4), &JobPatch::progress(12.5))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].progress, 12.5);
    assert_eq!(seen[1].status, Status::Downloading);
    drop(seen);

    store.close().await;
}
