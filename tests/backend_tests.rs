use std::time::Duration;

use bytes::Bytes;
use futures::TryStreamExt;
use tgstate::backend::{
    Backend, BackendError, Chat, MediaKind, MemoryBackend, Message, Reply, Update,
};

async fn read_all(backend: &MemoryBackend, reference: &str) -> Result<Bytes, BackendError> {
    let url = backend.get_object_url(reference).await?;
    let object = backend.fetch(&url).await?;
    let pieces: Vec<Bytes> = object.body.try_collect().await?;
    Ok(pieces.concat().into())
}

#[tokio::test]
async fn test_memory_put_fetch() {
    let backend = MemoryBackend::with_read_size(4);

    let message = backend
        .put_object("hello.txt", Bytes::from("hello world"))
        .await
        .unwrap();
    let reference = message.stored_reference().unwrap().to_string();

    assert_eq!(read_all(&backend, &reference).await.unwrap(), "hello world");
}

#[tokio::test]
async fn test_memory_fetch_reports_binary_type() {
    let backend = MemoryBackend::new();
    backend.insert("obj", "data");

    let url = backend.get_object_url("obj").await.unwrap();
    let object = backend.fetch(&url).await.unwrap();
    assert_eq!(
        object.content_type.as_deref(),
        Some("application/octet-stream")
    );
}

#[tokio::test]
async fn test_memory_fetch_in_pieces() {
    let backend = MemoryBackend::with_read_size(3);
    backend.insert("obj", "abcdefgh");

    let url = backend.get_object_url("obj").await.unwrap();
    let pieces: Vec<Bytes> = backend.fetch(&url).await.unwrap().body.try_collect().await.unwrap();
    assert_eq!(pieces, vec!["abc", "def", "gh"]);
}

#[tokio::test]
async fn test_memory_missing_reference() {
    let backend = MemoryBackend::new();

    let result = backend.get_object_url("missing").await;
    assert!(matches!(result, Err(BackendError::NotFound(_))));
}

#[tokio::test]
async fn test_memory_failing_fetch() {
    let backend = MemoryBackend::new();
    backend.insert("flaky", "data");
    backend.fail_fetch("flaky");

    let url = backend.get_object_url("flaky").await.unwrap();
    assert!(matches!(
        backend.fetch(&url).await,
        Err(BackendError::Request(_))
    ));
}

#[tokio::test]
async fn test_memory_media_kind() {
    let backend = MemoryBackend::new();
    backend.set_media_kind(MediaKind::Sticker);

    let message = backend.put_object("s.webp", Bytes::from("x")).await.unwrap();
    assert!(message.document.is_none());
    assert_eq!(message.sticker.unwrap().file_id, "obj-1");
}

#[tokio::test]
async fn test_memory_poll_respects_offset() {
    let backend = MemoryBackend::new();
    for update_id in [1, 2, 3] {
        backend.push_update(Update {
            update_id,
            message: Some(Message {
                message_id: update_id,
                chat: Chat { id: 5 },
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    let batch = backend.poll_events(2, Duration::ZERO).await.unwrap();
    let ids: Vec<i64> = batch.iter().map(|u| u.update_id).collect();
    assert_eq!(ids, vec![2, 3]);

    let batch = backend.poll_events(4, Duration::ZERO).await.unwrap();
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_memory_records_replies() {
    let backend = MemoryBackend::new();
    let reply = Reply {
        chat_id: -100,
        text: "https://files.example.com/d/x".to_string(),
        reply_to_message_id: 9,
    };

    backend.send_reply(&reply).await.unwrap();
    assert_eq!(backend.sent_replies(), vec![reply]);
    assert_eq!(backend.calls(), 1);
}
