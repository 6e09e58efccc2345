//! Deadline helper for collaborator calls.

use std::future::Future;
use std::time::Duration;

use crate::{MuninnError, Result};

/// Await `fut`, failing with [`MuninnError::Timeout`] once `limit` elapses.
///
/// `None` means no deadline. A timed-out call is dropped (cancelled), never
/// retried here.
pub async fn with_timeout<T, F>(stage: &'static str, limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| MuninnError::Timeout { stage, after })?,
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, MuninnError>(1)
        };
        let err = with_timeout("search", Some(Duration::from_secs(1)), slow)
            .await
            .unwrap_err();
        assert!(matches!(err, MuninnError::Timeout { stage: "search", .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn no_deadline_passes_through() {
        let value = with_timeout("rerank", None, async { Ok::<_, MuninnError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
