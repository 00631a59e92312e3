//! Cancellation for in-flight sync operations
//!
//! A screen that is torn down keeps the [`CancelHandle`] and hands the
//! [`CancelToken`] to the operation. Cancelling stops the operation at its
//! next await point and nothing is applied to the cache.

use crate::error::{AppError, Result};
use std::future::Future;
use tokio::sync::watch;

/// Sender side; cancelling is idempotent
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Receiver side passed into service calls
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a linked handle and token
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Fail fast if cancellation was already requested
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        Ok(())
    }

    /// Resolves once cancellation is requested. Never resolves if the
    /// handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let handle_dropped = rx.wait_for(|cancelled| *cancelled).await.is_err();
        if handle_dropped {
            std::future::pending::<()>().await;
        }
    }
}

/// Run `fut`, abandoning it with `Cancelled` if `token` fires first
pub(crate) async fn run_cancellable<T, F>(token: Option<&CancelToken>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(token) = token else {
        return fut.await;
    };

    token.checkpoint()?;

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AppError::Cancelled),
        result = fut => result,
    }
}
