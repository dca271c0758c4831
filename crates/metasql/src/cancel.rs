//! Cooperative cancellation.
//!
//! Every async operation takes a [`CancelSignal`] and checks it before doing
//! work (and, for guard evaluation, before each rule). Statements that are
//! already in flight can be raced against the signal with
//! [`CancelSignal::run`]. Cancelling never rolls anything back: the caller
//! owns the transaction.

use crate::error::{OrmError, OrmResult};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cloneable cancellation flag shared between the caller and an operation.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that is never cancelled.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the signal is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let mut notified = std::pin::pin!(self.inner.notify.notified());
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Drive `fut` to completion unless the signal fires first, in which case
    /// `fut` is dropped and [`OrmError::Cancelled`] returned.
    pub async fn run<T>(&self, fut: impl Future<Output = OrmResult<T>>) -> OrmResult<T> {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(OrmError::Cancelled),
            res = fut => res,
        }
    }

    /// Returns [`OrmError::Cancelled`] once [`cancel`](Self::cancel) was called.
    pub fn check(&self) -> OrmResult<()> {
        if self.is_cancelled() {
            Err(OrmError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let signal = CancelSignal::new();
        let handle = signal.clone();
        assert!(signal.check().is_ok());
        handle.cancel();
        assert!(matches!(signal.check(), Err(OrmError::Cancelled)));
    }

    #[tokio::test]
    async fn run_completes_when_not_cancelled() {
        let signal = CancelSignal::never();
        let value = signal.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn run_stops_pending_work_on_cancel() {
        let signal = CancelSignal::new();
        let handle = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            handle.cancel();
        });
        let err = signal
            .run(std::future::pending::<OrmResult<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, OrmError::Cancelled));
    }
}
