//! Error Logger Task
//!
//! Background errors are only observable through a stream; this task
//! drains one into the log so it never fills up.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::CacheError;

/// Spawns a task logging every error received on `errors` as
/// `[prefix] - error`. Ends when the stream closes.
pub fn spawn_error_logger(
    prefix: impl Into<String>,
    mut errors: mpsc::Receiver<CacheError>,
) -> JoinHandle<()> {
    let prefix = prefix.into();

    tokio::spawn(async move {
        while let Some(err) = errors.recv().await {
            warn!("[{}] - {}", prefix, err);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logger_drains_until_closed() {
        let (tx, rx) = mpsc::channel(1);
        let handle = spawn_error_logger("test", rx);

        for key in 0..5 {
            tx.send(CacheError::EntryExpired { key }).await.unwrap();
        }
        drop(tx);

        handle.await.unwrap();
    }
}
