// Page-indexed read state machine.
// Replaces the visible data wholesale on each page change.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::api::Page;
use crate::error::{Result, SharedError};

/// Source of pages for [`Paginator`] and [`super::InfiniteScroll`].
///
/// Pages are 1-based. Implemented for any
/// `Fn(page, page_size) -> impl Future<Output = Result<Page<T>>>`.
#[async_trait]
pub trait PageFetcher<T: Send + 'static>: Send + Sync {
    async fn fetch(&self, page: u32, page_size: u32) -> Result<Page<T>>;
}

#[async_trait]
impl<T, F, Fut> PageFetcher<T> for F
where
    T: Send + 'static,
    F: Fn(u32, u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Page<T>>> + Send,
{
    async fn fetch(&self, page: u32, page_size: u32) -> Result<Page<T>> {
        (self)(page, page_size).await
    }
}

/// Snapshot of a [`Paginator`].
#[derive(Debug, Clone)]
pub struct PaginationState<T> {
    /// Items of the current page only.
    pub data: Vec<T>,
    pub current_page: u32,
    pub page_size: u32,
    pub total: u64,
    pub loading: bool,
    pub error: Option<SharedError>,
}

impl<T> PaginationState<T> {
    fn new(page_size: u32) -> Self {
        Self {
            data: Vec::new(),
            current_page: 1,
            page_size,
            total: 0,
            loading: false,
            error: None,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        let pages = self.total.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.current_page) * u64::from(self.page_size) < self.total
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }
}

struct Inner<T> {
    state: PaginationState<T>,
    seq: u64,
}

/// Clears `loading` if a load is dropped before its page is applied.
struct LoadGuard<'a, T> {
    inner: &'a Mutex<Inner<T>>,
    seq: u64,
    armed: bool,
}

impl<T> Drop for LoadGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.seq == self.seq {
            inner.state.loading = false;
        }
    }
}

/// Paged reads through a [`PageFetcher`].
///
/// `current_page` only moves when a page arrives; a failed load keeps the
/// previous page and records the error. When loads overlap, only the most
/// recently started one is applied.
pub struct Paginator<T: Send + 'static> {
    fetcher: Arc<dyn PageFetcher<T>>,
    inner: Mutex<Inner<T>>,
}

impl<T> Paginator<T>
where
    T: Clone + Send + 'static,
{
    pub fn new(fetcher: impl PageFetcher<T> + 'static, page_size: u32) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            inner: Mutex::new(Inner {
                state: PaginationState::new(page_size.max(1)),
                seq: 0,
            }),
        }
    }

    pub fn snapshot(&self) -> PaginationState<T> {
        self.inner.lock().state.clone()
    }

    /// Fetch `page` and make it current on success.
    pub async fn load(&self, page: u32) {
        let (seq, page_size) = {
            let mut inner = self.inner.lock();
            inner.seq += 1;
            inner.state.loading = true;
            (inner.seq, inner.state.page_size)
        };

        let mut guard = LoadGuard {
            inner: &self.inner,
            seq,
            armed: true,
        };
        let result = self.fetcher.fetch(page, page_size).await;
        guard.armed = false;

        let mut inner = self.inner.lock();
        if inner.seq != seq {
            debug!(page, seq, "discarding superseded page");
            return;
        }

        let state = &mut inner.state;
        state.loading = false;
        match result {
            Ok(fetched) => {
                state.data = fetched.data;
                state.total = fetched.total;
                state.current_page = page;
                state.error = None;
            }
            Err(err) => {
                debug!(page, error = %err, "page load failed");
                state.error = Some(Arc::new(err));
            }
        }
    }

    /// Load the next page. Returns false without fetching on the last page.
    pub async fn next_page(&self) -> bool {
        let target = {
            let inner = self.inner.lock();
            if !inner.state.has_next() {
                return false;
            }
            inner.state.current_page + 1
        };
        self.load(target).await;
        true
    }

    /// Load the previous page. Returns false without fetching on page 1.
    pub async fn prev_page(&self) -> bool {
        let target = {
            let inner = self.inner.lock();
            if !inner.state.has_prev() {
                return false;
            }
            inner.state.current_page - 1
        };
        self.load(target).await;
        true
    }

    /// Load `page` if it lies within the known page range (page 1 always does).
    pub async fn go_to_page(&self, page: u32) -> bool {
        {
            let inner = self.inner.lock();
            if page == 0 || (page > 1 && page > inner.state.total_pages()) {
                return false;
            }
        }
        self.load(page).await;
        true
    }

    /// Reload the current page.
    pub async fn refresh(&self) {
        let page = self.inner.lock().state.current_page;
        self.load(page).await;
    }
}
