use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

struct Inner {
    map: HashMap<(String, i64), Value>,
    /// Bumped on every invalidation. A fill computed under an older
    /// generation is discarded, so a write that lands between a miss and
    /// its `put` can never leave a stale page behind.
    generation: u64,
}

/// Read-through cache for rendered feed pages, keyed by feed identity and
/// requested page number. Purely a read optimization: every write to the
/// post set clears it, and running with it disabled must not change any
/// observable response.
#[derive(Clone, Default)]
pub struct FeedCache {
    inner: Option<Arc<Mutex<Inner>>>,
}

impl FeedCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: enabled.then(|| {
                Arc::new(Mutex::new(Inner {
                    map: HashMap::new(),
                    generation: 0,
                }))
            }),
        }
    }

    /// A disabled cache never has one.
    pub fn new_disabled() -> Self {
        Self::new(false)
    }

    /// Snapshot the current generation before computing a page to store.
    pub fn generation(&self) -> u64 {
        self.inner
            .as_ref()
            .and_then(|inner| inner.lock().ok().map(|g| g.generation))
            .unwrap_or(0)
    }

    pub fn get(&self, feed: &str, page: i64) -> Option<Value> {
        let inner = self.inner.as_ref()?;
        let guard = inner.lock().ok()?;
        guard.map.get(&(feed.to_string(), page)).cloned()
    }

    /// Store a page computed while `generation` was current. A no-op if an
    /// invalidation has happened since: the body may predate the write.
    pub fn put(&self, feed: &str, page: i64, generation: u64, body: Value) {
        if let Some(inner) = &self.inner {
            if let Ok(mut guard) = inner.lock() {
                if guard.generation != generation {
                    debug!("feed cache fill for '{feed}' page {page} discarded as stale");
                    return;
                }
                guard.map.insert((feed.to_string(), page), body);
            }
        }
    }

    /// Drop every cached page. Called whenever the post set changes.
    pub fn invalidate(&self) {
        if let Some(inner) = &self.inner {
            if let Ok(mut guard) = inner.lock() {
                if !guard.map.is_empty() {
                    debug!("feed cache invalidated ({} pages dropped)", guard.map.len());
                }
                guard.map.clear();
                guard.generation += 1;
            }
        }
    }

    pub fn entries(&self) -> usize {
        self.inner
            .as_ref()
            .and_then(|inner| inner.lock().ok().map(|g| g.map.len()))
            .unwrap_or(0)
    }
}
