use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use super::types::{MediaFile, Message, Reply, Update};
use super::{Backend, BackendError, FetchedObject};

const URL_SCHEME: &str = "memory://";
const BINARY: &str = "application/octet-stream";

/// Media kind the in-memory backend reports for uploaded objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Document,
    Audio,
    Video,
    Sticker,
    /// Upload accepted but no media attached to the reply.
    Unrecognized,
}

struct StoredObject {
    content_type: String,
    data: Bytes,
}

/// In-memory backend for development and testing.
pub struct MemoryBackend {
    calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    media_kind: Mutex<MediaKind>,
    next_id: AtomicU64,
    objects: Mutex<HashMap<String, StoredObject>>,
    read_size: usize,
    sent: Mutex<Vec<Reply>>,
    updates: Mutex<VecDeque<Update>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_read_size(64 * 1024)
    }

    /// Fetched bodies are yielded in pieces of at most `read_size` bytes.
    pub fn with_read_size(read_size: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
            media_kind: Mutex::new(MediaKind::Document),
            next_id: AtomicU64::new(1),
            objects: Mutex::new(HashMap::new()),
            read_size: read_size.max(1),
            sent: Mutex::new(Vec::new()),
            updates: Mutex::new(VecDeque::new()),
        }
    }

    /// Store an object under a fixed reference with the generic binary type.
    pub fn insert(&self, reference: &str, data: impl Into<Bytes>) {
        self.insert_with_type(reference, data, BINARY);
    }

    pub fn insert_with_type(&self, reference: &str, data: impl Into<Bytes>, content_type: &str) {
        lock(&self.objects).insert(
            reference.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                data: data.into(),
            },
        );
    }

    pub fn get(&self, reference: &str) -> Option<Bytes> {
        lock(&self.objects).get(reference).map(|o| o.data.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make fetches of `reference` fail.
    pub fn fail_fetch(&self, reference: &str) {
        lock(&self.failing).insert(reference.to_string());
    }

    pub fn set_media_kind(&self, kind: MediaKind) {
        *lock(&self.media_kind) = kind;
    }

    pub fn push_update(&self, update: Update) {
        lock(&self.updates).push_back(update);
    }

    pub fn sent_replies(&self) -> Vec<Reply> {
        lock(&self.sent).clone()
    }

    /// Number of backend operations performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn put_object(&self, _file_name: &str, data: Bytes) -> Result<Message, BackendError> {
        self.record_call();
        let reference = format!("obj-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.insert(&reference, data);

        let media = Some(MediaFile::new(reference));
        let mut message = Message::default();
        match *lock(&self.media_kind) {
            MediaKind::Document => message.document = media,
            MediaKind::Audio => message.audio = media,
            MediaKind::Video => message.video = media,
            MediaKind::Sticker => message.sticker = media,
            MediaKind::Unrecognized => {}
        }
        Ok(message)
    }

    async fn get_object_url(&self, reference: &str) -> Result<String, BackendError> {
        self.record_call();
        if !lock(&self.objects).contains_key(reference) {
            return Err(BackendError::NotFound(reference.to_string()));
        }
        Ok(format!("{URL_SCHEME}{reference}"))
    }

    async fn fetch(&self, url: &str) -> Result<FetchedObject, BackendError> {
        self.record_call();
        let reference = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| BackendError::Request(format!("unsupported url: {url}")))?;

        if lock(&self.failing).contains(reference) {
            return Err(BackendError::Request(format!("fetch failed: {reference}")));
        }

        let (content_type, data) = {
            let objects = lock(&self.objects);
            let object = objects
                .get(reference)
                .ok_or_else(|| BackendError::NotFound(reference.to_string()))?;
            (object.content_type.clone(), object.data.clone())
        };

        let pieces: Vec<Result<Bytes, BackendError>> = (0..data.len())
            .step_by(self.read_size)
            .map(|start| {
                let end = (start + self.read_size).min(data.len());
                Ok(data.slice(start..end))
            })
            .collect();

        Ok(FetchedObject {
            content_type: Some(content_type),
            body: futures::stream::iter(pieces).boxed(),
        })
    }

    async fn poll_events(
        &self,
        offset: i64,
        timeout: Duration,
    ) -> Result<Vec<Update>, BackendError> {
        self.record_call();
        let batch: Vec<Update> = {
            let mut updates = lock(&self.updates);
            updates.retain(|u| u.update_id >= offset);
            updates.drain(..).collect()
        };

        if batch.is_empty() {
            tokio::time::sleep(timeout).await;
        }
        Ok(batch)
    }

    async fn send_reply(&self, reply: &Reply) -> Result<(), BackendError> {
        self.record_call();
        lock(&self.sent).push(reply.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
