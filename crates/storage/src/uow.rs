//! Scoped transactional execution.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::time::Instant;

use crate::{Result, StoreError};

/// Point in time after which an operation must give up.
///
/// One deadline is computed per logical operation and shared by every store
/// call that operation makes, so a slow cart read leaves less time for the
/// transaction that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// Creates a deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }

    /// Returns the underlying instant.
    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Runs a store call, failing with `DeadlineExceeded` if it does not
    /// finish in time. The call's future is dropped on expiry.
    pub async fn run<T, E, F>(self, fut: F) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: From<StoreError>,
    {
        match tokio::time::timeout_at(self.0, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::DeadlineExceeded.into()),
        }
    }
}

/// Opens, commits and rolls back transactions against one store.
///
/// Transactions are plain values threaded through every mutating call;
/// dropping one without committing rolls it back.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// The transaction handle passed to repository calls.
    type Tx: Send;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Commits a transaction, making all its changes visible.
    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    /// Rolls a transaction back, discarding all its changes.
    async fn rollback(&self, tx: Self::Tx) -> Result<()>;
}

/// Extension trait providing scoped execution for any unit of work.
pub trait UnitOfWorkExt: UnitOfWork {
    /// Runs `f` inside one transaction.
    ///
    /// Commits if `f` returns `Ok`; otherwise rolls back and returns `f`'s
    /// error unmodified. A panic inside `f` rolls back before it is resumed.
    /// If the deadline passes while `f` is running, the transaction is rolled
    /// back and `DeadlineExceeded` is returned. Nothing is retried. Nested
    /// calls are not supported: steps of one operation share the handle.
    fn with_transaction<T, E, F>(
        &self,
        deadline: Deadline,
        f: F,
    ) -> impl Future<Output = std::result::Result<T, E>> + Send
    where
        T: Send,
        E: From<StoreError> + Send,
        F: for<'t> FnOnce(&'t mut Self::Tx) -> BoxFuture<'t, std::result::Result<T, E>> + Send,
    {
        async move {
            let mut tx = deadline.run(self.begin()).await?;

            let outcome = tokio::time::timeout_at(
                deadline.instant(),
                AssertUnwindSafe(f(&mut tx)).catch_unwind(),
            )
            .await;

            match outcome {
                Ok(Ok(Ok(value))) => {
                    self.commit(tx).await?;
                    Ok(value)
                }
                Ok(Ok(Err(err))) => {
                    self.rollback_logged(tx, "step failed").await;
                    Err(err)
                }
                Ok(Err(panic)) => {
                    self.rollback_logged(tx, "step panicked").await;
                    std::panic::resume_unwind(panic)
                }
                Err(_) => {
                    self.rollback_logged(tx, "deadline exceeded").await;
                    Err(StoreError::DeadlineExceeded.into())
                }
            }
        }
    }

    /// Rolls back, logging instead of returning a rollback failure so the
    /// caller still sees the error that caused it.
    fn rollback_logged(&self, tx: Self::Tx, cause: &'static str) -> impl Future<Output = ()> + Send {
        async move {
            match self.rollback(tx).await {
                Ok(()) => tracing::debug!(cause, "transaction rolled back"),
                Err(e) => tracing::error!(cause, error = %e, "transaction rollback failed"),
            }
        }
    }
}

impl<U: UnitOfWork + ?Sized> UnitOfWorkExt for U {}
