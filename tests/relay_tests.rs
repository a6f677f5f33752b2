use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use tgstate::backend::{
    Backend, BackendError, ByteStream, FetchedObject, MemoryBackend, Message, Reply, Update,
};
use tgstate::manifest;
use tgstate::relay::{self, RelayError, RelayOptions, Relayed};
use tgstate::store::{self, StoreError, StoreLimits};

fn options() -> RelayOptions {
    RelayOptions {
        sniff_window: 10 * 1024 * 1024,
        manifest_hold: Duration::ZERO,
    }
}

fn body_of(data: &[u8], piece: usize) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> {
    let pieces: Vec<Result<Bytes, std::io::Error>> = data
        .chunks(piece)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    futures::stream::iter(pieces)
}

async fn collect(body: ByteStream) -> Vec<u8> {
    let pieces: Vec<Bytes> = body.try_collect().await.unwrap();
    pieces.concat()
}

fn backend() -> (Arc<MemoryBackend>, Arc<dyn Backend>) {
    let memory = Arc::new(MemoryBackend::with_read_size(7));
    let dynamic: Arc<dyn Backend> = memory.clone();
    (memory, dynamic)
}

/// Serves an HTML error page whose body breaks off before any byte arrives.
struct BrokenErrorPage;

#[async_trait]
impl Backend for BrokenErrorPage {
    async fn put_object(&self, _file_name: &str, _data: Bytes) -> Result<Message, BackendError> {
        Err(BackendError::Api("read-only".to_string()))
    }

    async fn get_object_url(&self, reference: &str) -> Result<String, BackendError> {
        Ok(format!("broken://{reference}"))
    }

    async fn fetch(&self, _url: &str) -> Result<FetchedObject, BackendError> {
        let body = futures::stream::once(async {
            Err::<Bytes, _>(BackendError::Request("connection reset".to_string()))
        });
        Ok(FetchedObject {
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.boxed(),
        })
    }

    async fn poll_events(
        &self,
        _offset: i64,
        _timeout: Duration,
    ) -> Result<Vec<Update>, BackendError> {
        Ok(Vec::new())
    }

    async fn send_reply(&self, _reply: &Reply) -> Result<(), BackendError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_non_binary_object_is_missing_without_reading_body() {
    let backend: Arc<dyn Backend> = Arc::new(BrokenErrorPage);

    let result = relay::open(backend, "page", &options()).await;
    assert!(matches!(result, Err(RelayError::NotFound)));
}

#[tokio::test]
async fn test_empty_reference_makes_no_backend_call() {
    let (memory, backend) = backend();

    let result = relay::open(backend, "", &options()).await;
    assert!(matches!(result, Err(RelayError::NotFound)));
    assert_eq!(memory.calls(), 0);
}

#[tokio::test]
async fn test_raw_object_streams_through() {
    let (memory, backend) = backend();
    let data: Vec<u8> = (0..200u8).collect();
    memory.insert("raw", data.clone());

    // A window smaller than the object exercises the pass-through remainder.
    let options = RelayOptions {
        sniff_window: 16,
        ..options()
    };
    match relay::open(backend, "raw", &options).await.unwrap() {
        Relayed::Raw { content_type, body } => {
            assert_eq!(content_type, "application/octet-stream");
            assert_eq!(collect(body).await, data);
        }
        Relayed::Manifest { .. } => panic!("expected raw object"),
    }
}

#[tokio::test]
async fn test_manifest_prefix_wins_over_garbage() {
    let (memory, backend) = backend();
    memory.insert("c1", "only-chunk");
    let mut payload = manifest::encode("a.bin", &["c1"]).unwrap().into_bytes();
    payload.extend_from_slice(b" \x00\x01\x02");
    memory.insert("m", payload);

    match relay::open(backend, "m", &options()).await.unwrap() {
        Relayed::Manifest { file_name, .. } => assert_eq!(file_name, "a.bin"),
        Relayed::Raw { .. } => panic!("expected manifest"),
    }
}

#[tokio::test]
async fn test_malformed_manifest() {
    let (memory, backend) = backend();
    memory.insert("m", "tgstate-blob");

    let result = relay::open(backend, "m", &options()).await;
    assert!(matches!(result, Err(RelayError::Manifest(_))));
}

#[tokio::test]
async fn test_chunk_relay_preserves_order() {
    let (memory, backend) = backend();
    memory.insert("b", "BBBBBBBBBB");
    memory.insert("a", "AAAAAAAAAA");
    memory.insert("c", "CC");

    let chunks = vec!["b".to_string(), "a".to_string(), "c".to_string()];
    let body = relay::chunk_relay(backend, chunks, Duration::ZERO);
    assert_eq!(collect(body).await, b"BBBBBBBBBBAAAAAAAAAACC");
}

#[tokio::test]
async fn test_chunk_relay_stops_at_first_failure() {
    let (memory, backend) = backend();
    memory.insert("ok", "first");
    memory.insert("bad", "never");
    memory.insert("late", "unreached");
    memory.fail_fetch("bad");

    let chunks = vec!["ok".to_string(), "bad".to_string(), "late".to_string()];
    let mut body = relay::chunk_relay(backend, chunks, Duration::ZERO);

    let mut delivered = Vec::new();
    let mut failed = false;
    while let Some(piece) = body.next().await {
        match piece {
            Ok(bytes) => delivered.extend_from_slice(&bytes),
            Err(_) => {
                failed = true;
                break;
            }
        }
    }
    assert!(failed);
    assert_eq!(delivered, b"first");
    assert!(body.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_chunk_relay_holds_after_last_chunk() {
    let (memory, backend) = backend();
    memory.insert("only", "x");

    let started = tokio::time::Instant::now();
    let body = relay::chunk_relay(backend, vec!["only".to_string()], Duration::from_secs(10));
    assert_eq!(collect(body).await, b"x");
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test]
async fn test_store_small_file_is_single_object() {
    let (memory, backend) = backend();
    let limits = StoreLimits {
        chunk_size: 64,
        max_size: None,
    };

    let reference = store::store_upload(backend.as_ref(), "a.png", body_of(b"tiny", 2), &limits)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(memory.len(), 1);
    assert_eq!(memory.get(&reference).unwrap(), "tiny");
}

#[tokio::test]
async fn test_store_exact_chunk_size_is_single_object() {
    let (memory, backend) = backend();
    let limits = StoreLimits {
        chunk_size: 8,
        max_size: None,
    };

    store::store_upload(backend.as_ref(), "a.bin", body_of(b"12345678", 3), &limits)
        .await
        .unwrap();
    assert_eq!(memory.len(), 1);
}

#[tokio::test]
async fn test_store_large_file_round_trips_through_relay() {
    let (memory, backend) = backend();
    let data: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 251) as u8).collect();
    let limits = StoreLimits {
        chunk_size: 128,
        max_size: None,
    };

    let reference = store::store_upload(
        backend.as_ref(),
        "big archive.tar",
        body_of(&data, 97),
        &limits,
    )
    .await
    .unwrap()
    .unwrap();

    let decoded = manifest::decode(&String::from_utf8_lossy(&memory.get(&reference).unwrap()))
        .unwrap();
    assert_eq!(decoded.file_name, "big_archive.tar");
    assert_eq!(decoded.chunks.len(), 8);
    for chunk in &decoded.chunks {
        assert!(memory.get(chunk).unwrap().len() <= 128);
    }

    // Downloading twice yields the same bytes.
    for _ in 0..2 {
        match relay::open(Arc::clone(&backend), &reference, &options()).await.unwrap() {
            Relayed::Manifest { file_name, body } => {
                assert_eq!(file_name, "big_archive.tar");
                assert_eq!(collect(body).await, data);
            }
            Relayed::Raw { .. } => panic!("expected manifest"),
        }
    }
}

#[tokio::test]
async fn test_store_enforces_max_size() {
    let (memory, backend) = backend();
    let limits = StoreLimits {
        chunk_size: 1024,
        max_size: Some(10),
    };

    let result =
        store::store_upload(backend.as_ref(), "a.png", body_of(&[1u8; 32], 8), &limits).await;
    assert!(matches!(result, Err(StoreError::TooLarge(10))));
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_store_read_error() {
    let (_memory, backend) = backend();
    let limits = StoreLimits {
        chunk_size: 1024,
        max_size: None,
    };
    let body = futures::stream::iter(vec![
        Ok(Bytes::from("abc")),
        Err(std::io::Error::other("connection reset")),
    ]);

    let result = store::store_upload(backend.as_ref(), "a.png", body, &limits).await;
    assert!(matches!(result, Err(StoreError::Read(_))));
}
