// Incremental read state machine.
// Appends each page to the items already loaded until a short page arrives.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::SharedError;

use super::pagination::PageFetcher;

/// Snapshot of an [`InfiniteScroll`].
#[derive(Debug, Clone)]
pub struct InfiniteScrollState<T> {
    /// Every item loaded so far, in page order.
    pub items: Vec<T>,
    /// Next page to request (1-based).
    pub next_page: u32,
    pub page_size: u32,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<SharedError>,
}

impl<T> InfiniteScrollState<T> {
    fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            next_page: 1,
            page_size,
            has_more: true,
            loading: false,
            error: None,
        }
    }
}

struct Inner<T> {
    state: InfiniteScrollState<T>,
    // Bumped by reset so loads started before it are dropped.
    epoch: u64,
}

/// Clears `loading` if a load is dropped before its page is applied.
struct LoadGuard<'a, T> {
    inner: &'a Mutex<Inner<T>>,
    epoch: u64,
    armed: bool,
}

impl<T> Drop for LoadGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.epoch == self.epoch {
            inner.state.loading = false;
        }
    }
}

pub struct InfiniteScroll<T: Send + 'static> {
    fetcher: Arc<dyn PageFetcher<T>>,
    inner: Mutex<Inner<T>>,
}

impl<T> InfiniteScroll<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(fetcher: impl PageFetcher<T> + 'static, page_size: u32) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            inner: Mutex::new(Inner {
                state: InfiniteScrollState::new(page_size.max(1)),
                epoch: 0,
            }),
        }
    }

    /// Fetch the next page and append it.
    ///
    /// Returns false without fetching while a load is running or after the
    /// last page. A page shorter than `page_size` ends the sequence; a failed
    /// page is recorded and retried by the next call.
    pub async fn load_more(&self) -> bool {
        let (page, page_size, epoch) = {
            let mut inner = self.inner.lock();
            if inner.state.loading || !inner.state.has_more {
                return false;
            }
            inner.state.loading = true;
            (inner.state.next_page, inner.state.page_size, inner.epoch)
        };

        let mut guard = LoadGuard {
            inner: &self.inner,
            epoch,
            armed: true,
        };
        let result = self.fetcher.fetch(page, page_size).await;
        guard.armed = false;

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            debug!(page, "discarding page loaded before reset");
            return false;
        }

        let state = &mut inner.state;
        state.loading = false;
        match result {
            Ok(fetched) => {
                state.has_more = fetched.data.len() >= page_size as usize;
                state.items.extend(fetched.data);
                state.next_page = page + 1;
                state.error = None;
            }
            Err(err) => {
                debug!(page, error = %err, "infinite scroll page failed");
                state.error = Some(Arc::new(err));
            }
        }
        true
    }

    /// Drop all items and start again from page 1.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        let page_size = inner.state.page_size;
        inner.state = InfiniteScrollState::new(page_size);
    }

    pub fn has_more(&self) -> bool {
        self.inner.lock().state.has_more
    }

    pub fn items(&self) -> Vec<T> {
        self.inner.lock().state.items.clone()
    }

    pub fn snapshot(&self) -> InfiniteScrollState<T> {
        self.inner.lock().state.clone()
    }
}
