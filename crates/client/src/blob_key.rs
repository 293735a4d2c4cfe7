use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use pinmap_shared::keys;

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Issues `image_<millis>.jpg` keys. Never issues the same millisecond twice:
/// a key requested in an already used millisecond is stamped with the next one.
pub struct BlobKeyGenerator {
    clock: Arc<dyn Clock>,
    last: AtomicI64,
}

impl BlobKeyGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        BlobKeyGenerator {
            clock,
            last: AtomicI64::new(i64::MIN),
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn next_key(&self) -> String {
        let now = self.clock.now_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        keys::blob_key(now.max(previous.saturating_add(1)))
    }
}

impl Default for BlobKeyGenerator {
    fn default() -> Self {
        Self::system()
    }
}
