//! Drives "list users" pagination through the retry layer.

use std::time::Duration;

use super::types::{Page, PageRequest};
use super::UserDirectory;
use crate::retry::{run_with_retry, CallError, RetryObserver, RetryPolicy};

/// Hard service maximum for `Limit` on the listing calls.
pub const PAGE_SIZE_MAX: i32 = 60;

/// Flat delay between successful page fetches, to proactively reduce
/// throttling. Failed attempts are paced by the backoff policy instead.
pub const PAGE_COOLDOWN: Duration = Duration::from_millis(200);

/// Stateful pagination over a user directory. Tracks the continuation
/// token and stops cleanly once the listing is exhausted.
pub struct Pager<'a, D: UserDirectory> {
    directory: &'a D,
    policy: RetryPolicy,
    page_size: i32,
    cooldown: Duration,
    token: Option<String>,
    fetched_any: bool,
    finished: bool,
}

impl<'a, D: UserDirectory> Pager<'a, D> {
    /// `starting_token` resumes pagination mid-listing (from a checkpoint
    /// or an explicit `--starting-token`).
    pub fn new(
        directory: &'a D,
        policy: RetryPolicy,
        page_size: i32,
        starting_token: Option<String>,
    ) -> Self {
        Self {
            directory,
            policy,
            page_size: page_size.clamp(1, PAGE_SIZE_MAX),
            cooldown: PAGE_COOLDOWN,
            token: starting_token.filter(|t| !t.is_empty()),
            fetched_any: false,
            finished: false,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Continuation token to persist in a checkpoint, if any remains.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    ///
    /// A `CallError` here means the retry budget ran out or the service
    /// rejected the request outright; the token is left pointing at the
    /// failed page so the caller can checkpoint and resume later.
    pub async fn next_page(&mut self, observer: &dyn RetryObserver) -> Result<Option<Page>, CallError> {
        if self.finished {
            return Ok(None);
        }
        if self.fetched_any {
            if self.token.is_none() {
                self.finished = true;
                return Ok(None);
            }
            tokio::time::sleep(self.cooldown).await;
        }

        let req = PageRequest {
            token: self.token.clone(),
            page_size: self.page_size,
        };
        let page = run_with_retry(&self.policy, observer, || self.directory.list_page(&req)).await?;

        self.fetched_any = true;
        // An empty-string token means the same as no token at all.
        self.token = page.next_token.clone().filter(|t| !t.is_empty());
        if self.token.is_none() {
            self.finished = true;
        }
        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::types::UserRecord;
    use crate::retry::{NullObserver, ServiceError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted directory: returns canned pages in order, recording the
    /// tokens and page sizes it was asked for.
    struct Scripted {
        pages: Mutex<Vec<Result<Page, ServiceError>>>,
        requests: Mutex<Vec<(Option<String>, i32)>>,
    }

    impl Scripted {
        fn new(pages: Vec<Result<Page, ServiceError>>) -> Self {
            let mut pages = pages;
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UserDirectory for Scripted {
        async fn list_page(&self, req: &PageRequest) -> Result<Page, ServiceError> {
            self.requests
                .lock()
                .unwrap()
                .push((req.token.clone(), req.page_size));
            self.pages.lock().unwrap().pop().expect("no more scripted pages")
        }
    }

    fn page(n: usize, next: Option<&str>) -> Page {
        Page {
            records: vec![UserRecord::default(); n],
            next_token: next.map(str::to_string),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn walks_pages_until_token_absent() {
        let dir = Scripted::new(vec![
            Ok(page(2, Some("t1"))),
            Ok(page(2, Some("t2"))),
            Ok(page(1, None)),
        ]);
        let mut pager = Pager::new(&dir, RetryPolicy::default(), 60, None);

        assert_eq!(pager.next_page(&NullObserver).await.unwrap().unwrap().records.len(), 2);
        assert_eq!(pager.token(), Some("t1"));
        assert_eq!(pager.next_page(&NullObserver).await.unwrap().unwrap().records.len(), 2);
        assert_eq!(pager.next_page(&NullObserver).await.unwrap().unwrap().records.len(), 1);
        assert!(pager.next_page(&NullObserver).await.unwrap().is_none());
        assert!(pager.token().is_none());

        let reqs = dir.requests.lock().unwrap();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].0, None);
        assert_eq!(reqs[1].0, Some("t1".to_string()));
        assert_eq!(reqs[2].0, Some("t2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_string_token_ends_pagination() {
        let dir = Scripted::new(vec![Ok(page(3, Some("")))]);
        let mut pager = Pager::new(&dir, RetryPolicy::default(), 60, None);

        assert!(pager.next_page(&NullObserver).await.unwrap().is_some());
        assert!(pager.token().is_none());
        assert!(pager.next_page(&NullObserver).await.unwrap().is_none());
        assert_eq!(dir.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clamps_page_size_to_service_maximum() {
        let dir = Scripted::new(vec![Ok(page(1, None))]);
        let mut pager = Pager::new(&dir, RetryPolicy::default(), 500, None);
        pager.next_page(&NullObserver).await.unwrap();
        assert_eq!(dir.requests.lock().unwrap()[0].1, PAGE_SIZE_MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_applies_between_successful_pages() {
        let dir = Scripted::new(vec![Ok(page(1, Some("t1"))), Ok(page(1, None))]);
        let mut pager = Pager::new(&dir, RetryPolicy::default(), 60, None);

        let start = tokio::time::Instant::now();
        pager.next_page(&NullObserver).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        pager.next_page(&NullObserver).await.unwrap();
        assert_eq!(start.elapsed(), PAGE_COOLDOWN);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_token_passed_to_first_request() {
        let dir = Scripted::new(vec![Ok(page(1, None))]);
        let mut pager = Pager::new(&dir, RetryPolicy::default(), 60, Some("resume-here".into()));
        pager.next_page(&NullObserver).await.unwrap();
        assert_eq!(
            dir.requests.lock().unwrap()[0].0,
            Some("resume-here".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_keeps_token_for_checkpoint() {
        let dir = Scripted::new(vec![
            Ok(page(1, Some("t1"))),
            Err(ServiceError::new("InternalErrorException", "boom")),
        ]);
        let mut pager = Pager::new(&dir, RetryPolicy::default(), 60, None);

        pager.next_page(&NullObserver).await.unwrap();
        let err = pager.next_page(&NullObserver).await.unwrap_err();
        assert!(matches!(err, CallError::Fatal(_)));
        assert_eq!(pager.token(), Some("t1"));
    }
}
