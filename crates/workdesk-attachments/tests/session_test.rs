//! Attachment session integration tests: upload, hold, reconcile, commit.
//!
//! Run with: `cargo test -p workdesk-attachments --test session_test`

mod helpers;

use helpers::fakes::{Call, FakeAttacher, FakeLister, FakeUploader};
use helpers::{document, drain, photo, settle, tuple};
use serde_json::json;
use workdesk_core::{AssetKind, AttachError, AttachOutcome, AttachedFile, ParentId, UploadError};

#[tokio::test(start_paused = true)]
async fn test_upload_is_held_until_parent_id_then_committed() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);

    session
        .upload(document("quote.pdf"), AssetKind::Document)
        .await
        .expect("upload");

    assert_eq!(session.status(), tuple(false, false, 1, false));
    assert_eq!(attacher.call_count(), 0);

    session.set_parent_id(ParentId::Numeric(42));
    settle().await;

    let batches = attacher.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, ParentId::Numeric(42));
    assert_eq!(batches[0].1.len(), 1);
    assert_eq!(batches[0].1[0].reference, "https://files.test/quote.pdf");
    assert_eq!(batches[0].1[0].display_name, "quote.pdf");
    assert_eq!(batches[0].1[0].kind, AssetKind::Document);

    assert!(session.pending().is_empty());
    assert_eq!(session.status(), tuple(false, false, 0, true));
    assert_eq!(session.attached().len(), 1);
    assert!(session.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_subscriber_sees_every_transition() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);
    let mut rx = session.subscribe();

    session
        .upload(document("quote.pdf"), AssetKind::Document)
        .await
        .unwrap();
    session.set_parent_id(ParentId::Numeric(42));
    settle().await;

    assert_eq!(
        drain(&mut rx),
        vec![
            tuple(false, false, 0, false),
            tuple(true, false, 0, false),
            tuple(false, false, 1, false),
            tuple(false, false, 1, true),
            tuple(false, true, 1, true),
            tuple(false, false, 0, true),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_commit_keeps_items_and_next_append_commits_both() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    attacher.fail_next("backend unavailable");
    let session = helpers::session(&uploader, &attacher);

    session
        .upload(document("a.pdf"), AssetKind::Document)
        .await
        .unwrap();
    let before: Vec<_> = session.pending().iter().map(|i| i.id).collect();

    session.set_parent_id(ParentId::Numeric(42));
    settle().await;

    assert_eq!(attacher.call_count(), 1);
    let after: Vec<_> = session.pending().iter().map(|i| i.id).collect();
    assert_eq!(before, after);
    assert_eq!(session.status(), tuple(false, false, 1, true));
    assert!(session.last_error().is_some());

    // No hot retry loop after a failure.
    settle().await;
    assert_eq!(attacher.call_count(), 1);

    session
        .upload(document("a.pdf"), AssetKind::Document)
        .await
        .unwrap();
    settle().await;

    let batches = attacher.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].1.len(), 2);
    assert!(session.pending().is_empty());
    assert!(session.last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_item_appended_mid_flight_gets_its_own_follow_up_commit() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::gated();
    let session = helpers::session(&uploader, &attacher);
    session.set_parent_id(ParentId::Text("PR-7".to_string()));

    session.upload(photo("first.jpg"), AssetKind::Photo).await.unwrap();
    settle().await;
    assert_eq!(attacher.call_count(), 1);

    session.upload(photo("second.jpg"), AssetKind::Photo).await.unwrap();
    settle().await;
    assert_eq!(attacher.call_count(), 1, "trigger during a commit is ignored");
    assert_eq!(session.status(), tuple(false, true, 2, true));

    attacher.release(1);
    settle().await;
    assert_eq!(attacher.call_count(), 2);
    assert_eq!(session.pending().len(), 1);

    attacher.release(1);
    settle().await;

    let batches = attacher.batches();
    assert_eq!(batches[0].1[0].display_name, "first.jpg");
    assert_eq!(batches[1].1.len(), 1);
    assert_eq!(batches[1].1[0].display_name, "second.jpg");
    assert_eq!(attacher.max_concurrency(), 1);
    assert_eq!(session.status(), tuple(false, false, 0, true));
}

#[tokio::test(start_paused = true)]
async fn test_failed_commit_reevaluates_when_queue_changed_in_flight() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::gated();
    attacher.fail_next("timeout");
    let session = helpers::session(&uploader, &attacher);
    session.set_parent_id(ParentId::Numeric(9));

    session.upload(photo("a.jpg"), AssetKind::Photo).await.unwrap();
    session.upload(photo("b.jpg"), AssetKind::Photo).await.unwrap();
    attacher.release(2);
    settle().await;

    let batches = attacher.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].1.len(), 1);
    assert_eq!(batches[1].1.len(), 2);
    assert!(session.pending().is_empty());
    assert_eq!(attacher.max_concurrency(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_retry_after_failure() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);

    assert!(matches!(session.retry(), Err(AttachError::ParentUnknown)));

    attacher.push_result(Err(AttachError::Rejected {
        status: 422,
        message: "reference not found".to_string(),
    }));
    session.set_parent_id(ParentId::Numeric(42));
    session.upload(document("a.pdf"), AssetKind::Document).await.unwrap();
    settle().await;
    assert_eq!(session.pending().len(), 1);

    assert!(session.retry().unwrap());
    settle().await;

    assert_eq!(attacher.call_count(), 2);
    assert!(session.pending().is_empty());
    assert!(!session.retry().unwrap(), "nothing left to retry");
}

#[tokio::test(start_paused = true)]
async fn test_upload_with_known_parent_commits_immediately() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);
    session.set_parent_id(ParentId::Numeric(1));

    session.upload(photo("site.jpg"), AssetKind::Photo).await.unwrap();
    settle().await;

    assert_eq!(attacher.call_count(), 1);
    assert!(session.pending().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_uploads_never_create_pending_items() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);

    uploader.push_response(Err(anyhow::anyhow!("connection refused")));
    let err = session
        .upload(document("a.pdf"), AssetKind::Document)
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Transport { .. }));

    uploader.push_response(Ok(json!({ "id": 17 })));
    let err = session
        .upload(document("b.pdf"), AssetKind::Document)
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::MissingReference));

    let err = session
        .upload(document("c.pdf"), AssetKind::Photo)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        UploadError::WrongKind {
            expected: AssetKind::Photo,
            ..
        }
    ));

    assert_eq!(uploader.call_count(), 2, "wrong kind is rejected before the network");
    assert!(session.pending().is_empty());
    assert!(session.last_error().is_some());
    assert_eq!(session.status(), tuple(false, false, 0, false));
}

#[tokio::test(start_paused = true)]
async fn test_batch_of_five_uploads_strictly_in_sequence() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);
    let files: Vec<_> = (1..=5).map(|i| photo(&format!("{}.jpg", i))).collect();

    let results = session
        .upload_batch(files, AssetKind::Photo)
        .await
        .expect("within the cap");

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(uploader.call_count(), 5);
    assert_eq!(uploader.max_concurrency(), 1);

    let expected: Vec<Call> = (1..=5)
        .flat_map(|i| {
            let name = format!("{}.jpg", i);
            [Call::Started(name.clone()), Call::Finished(name)]
        })
        .collect();
    assert_eq!(uploader.calls(), expected);

    let pending: Vec<_> = session
        .pending()
        .iter()
        .map(|i| i.display_name.clone())
        .collect();
    assert_eq!(pending, vec!["5.jpg", "4.jpg", "3.jpg", "2.jpg", "1.jpg"]);
}

#[tokio::test(start_paused = true)]
async fn test_batch_failure_does_not_stop_the_rest() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);
    uploader.push_response(Ok(json!({ "url": "https://files.test/1.jpg" })));
    uploader.push_response(Err(anyhow::anyhow!("reset by peer")));

    let files: Vec<_> = (1..=3).map(|i| photo(&format!("{}.jpg", i))).collect();
    let results = session.upload_batch(files, AssetKind::Photo).await.unwrap();

    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
    assert_eq!(uploader.call_count(), 3);
    assert_eq!(uploader.max_concurrency(), 1);
    assert_eq!(session.pending().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_batch_over_the_cap_is_rejected_up_front() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);
    let files: Vec<_> = (1..=6).map(|i| photo(&format!("{}.jpg", i))).collect();

    let err = session.upload_batch(files, AssetKind::Photo).await.unwrap_err();

    assert!(matches!(err, UploadError::BatchTooLarge { max: 5, got: 6 }));
    assert_eq!(uploader.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_photo_and_document_uploads_overlap() {
    let uploader = FakeUploader::gated();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);

    let photo_task = tokio::spawn({
        let session = session.clone();
        async move { session.upload(photo("p.jpg"), AssetKind::Photo).await }
    });
    let document_task = tokio::spawn({
        let session = session.clone();
        async move { session.upload(document("d.pdf"), AssetKind::Document).await }
    });
    settle().await;
    assert!(session.status().uploading);

    uploader.release(1);
    settle().await;
    assert!(session.status().uploading, "one upload still outstanding");

    uploader.release(1);
    photo_task.await.unwrap().unwrap();
    document_task.await.unwrap().unwrap();
    assert_eq!(session.status(), tuple(false, false, 2, false));
    assert_eq!(uploader.max_concurrency(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_remove_pending_only_forgets_local_reference() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);

    session.upload(document("keep.pdf"), AssetKind::Document).await.unwrap();
    session.upload(document("drop.pdf"), AssetKind::Document).await.unwrap();

    assert!(session.remove_pending(5).is_none());
    let removed = session.remove_pending(0).expect("newest item");
    assert_eq!(removed.display_name, "drop.pdf");
    assert_eq!(session.status().pending_count, 1);

    session.set_parent_id(ParentId::Numeric(42));
    settle().await;

    let batches = attacher.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].1.len(), 1);
    assert_eq!(batches[0].1[0].display_name, "keep.pdf");
}

#[tokio::test(start_paused = true)]
async fn test_parent_id_is_set_once() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);

    session.set_parent_id(ParentId::Numeric(42));
    session.set_parent_id(ParentId::Numeric(43));

    assert_eq!(session.parent_id(), Some(ParentId::Numeric(42)));
}

#[tokio::test(start_paused = true)]
async fn test_acknowledged_commit_refreshes_through_lister() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    attacher.push_result(Ok(AttachOutcome::Acknowledged));
    let listed = AttachedFile {
        id: Some("77".to_string()),
        reference: "https://files.test/a.pdf".to_string(),
        display_name: "a.pdf".to_string(),
        kind: AssetKind::Document,
        attached_at: None,
    };
    let lister = FakeLister::with_files(vec![listed.clone()]);
    let session = helpers::session_with_lister(&uploader, &attacher, &lister);

    session.set_parent_id(ParentId::Numeric(42));
    session.upload(document("a.pdf"), AssetKind::Document).await.unwrap();
    settle().await;

    assert_eq!(lister.call_count(), 1);
    assert_eq!(session.attached(), vec![listed.clone()]);

    let refreshed = session.refresh_attached().await.unwrap();
    assert_eq!(refreshed, vec![listed]);
    assert_eq!(lister.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_close_discards_pending_and_rejects_later_calls() {
    let uploader = FakeUploader::new();
    let attacher = FakeAttacher::new();
    let session = helpers::session(&uploader, &attacher);
    let mut rx = session.subscribe();

    session.upload(photo("orphan.jpg"), AssetKind::Photo).await.unwrap();
    let orphaned = session.close();

    assert_eq!(orphaned.len(), 1);
    assert_eq!(orphaned[0].reference, "https://files.test/orphan.jpg");
    assert!(session.is_closed());
    assert!(session.close().is_empty());

    drain(&mut rx);
    assert_eq!(rx.recv().await, None, "status stream ends on close");

    let err = session
        .upload(photo("late.jpg"), AssetKind::Photo)
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::SessionClosed));
    assert!(matches!(session.retry(), Err(AttachError::SessionClosed)));

    session.set_parent_id(ParentId::Numeric(42));
    settle().await;
    assert_eq!(attacher.call_count(), 0);
    assert_eq!(uploader.call_count(), 1);
}
