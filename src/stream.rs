//! Streaming pagination over tokened list endpoints.
//!
//! Providers expose listings as a stream of items; [`paginated`] drives the
//! page-token loop lazily, so consumers that stop early never pay for pages
//! they did not read.

use std::collections::VecDeque;
use std::future::Future;

use futures::Stream;

use crate::error::MailError;

/// One page of a tokened listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items on this page, in listing order.
    pub items: Vec<T>,
    /// Token for the next page, or `None` when this page is the last.
    pub next_page_token: Option<String>,
}

/// Adapts a page-fetching function into a stream of items.
///
/// `fetch` is called with `None` for the first page and with the previous
/// page's token afterwards. Fetching is lazy: the first call happens on the
/// first poll, and dropping the stream mid-page fetches nothing further. An
/// empty page without a token ends the stream; an empty page with a token
/// keeps going.
pub fn paginated<T, F, Fut>(fetch: F) -> impl Stream<Item = Result<T, MailError>> + Send
where
    T: Send,
    F: FnMut(Option<String>) -> Fut + Send,
    Fut: Future<Output = Result<Page<T>, MailError>> + Send,
{
    let state = (fetch, VecDeque::new(), Some(None::<String>));
    futures::stream::try_unfold(state, |(mut fetch, mut buffered, mut pending)| async move {
        loop {
            if let Some(item) = buffered.pop_front() {
                return Ok(Some((item, (fetch, buffered, pending))));
            }
            let token = match pending.take() {
                Some(token) => token,
                None => return Ok(None),
            };
            let page = fetch(token).await?;
            buffered = page.items.into();
            pending = page.next_page_token.map(Some);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, TryStreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn streams_items_across_pages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let stream = paginated(move |token: Option<String>| {
            let calls = counter.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                match token.as_deref() {
                    None => Ok(Page {
                        items: vec![1, 2],
                        next_page_token: Some("t1".to_string()),
                    }),
                    Some("t1") => Ok(Page {
                        items: vec![3],
                        next_page_token: None,
                    }),
                    other => panic!("unexpected token: {:?}", other),
                }
            }
        });

        let items: Vec<i32> = stream.try_collect().await.unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_page_without_token_ends_stream() {
        let stream = paginated(|_token: Option<String>| async move {
            Ok(Page::<i32> {
                items: Vec::new(),
                next_page_token: None,
            })
        });

        let items: Vec<i32> = stream.try_collect().await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn empty_page_with_token_continues() {
        let stream = paginated(|token: Option<String>| async move {
            match token.as_deref() {
                None => Ok(Page {
                    items: Vec::new(),
                    next_page_token: Some("more".to_string()),
                }),
                Some("more") => Ok(Page {
                    items: vec![5],
                    next_page_token: None,
                }),
                other => panic!("unexpected token: {:?}", other),
            }
        });

        let items: Vec<i32> = stream.try_collect().await.unwrap();
        assert_eq!(items, vec![5]);
    }

    #[tokio::test]
    async fn propagates_fetch_errors() {
        let stream = paginated(|token: Option<String>| async move {
            match token {
                None => Ok(Page {
                    items: vec![1],
                    next_page_token: Some("t1".to_string()),
                }),
                Some(_) => Err(MailError::network("connection reset")),
            }
        });

        let results: Vec<Result<i32, MailError>> = stream.collect().await;
        assert_eq!(results.len(), 2);
        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert!(matches!(results[1], Err(MailError::Network { .. })));
    }

    #[tokio::test]
    async fn early_termination_fetches_one_page() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let stream = paginated(move |_token: Option<String>| {
            let calls = counter.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Page {
                    items: vec![1, 2, 3],
                    next_page_token: Some("next".to_string()),
                })
            }
        });

        let taken: Vec<i32> = stream.take(2).try_collect().await.unwrap();
        assert_eq!(taken, vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nothing_is_fetched_until_polled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let stream = paginated(move |_token: Option<String>| {
            let calls = counter.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Page {
                    items: vec![1],
                    next_page_token: None,
                })
            }
        });

        drop(stream);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn passes_tokens_between_fetches() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();

        let stream = paginated(move |token: Option<String>| {
            let seen = record.clone();
            async move {
                seen.lock().unwrap().push(token.clone());
                match token {
                    None => Ok(Page {
                        items: vec![0],
                        next_page_token: Some("abc".to_string()),
                    }),
                    Some(_) => Ok(Page {
                        items: vec![1],
                        next_page_token: None,
                    }),
                }
            }
        });

        let _: Vec<i32> = stream.try_collect().await.unwrap();
        let tokens = seen.lock().unwrap().clone();
        assert_eq!(tokens, vec![None, Some("abc".to_string())]);
    }
}
