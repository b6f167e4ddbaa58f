//! Bounded worker pool for per-unit fan-out/fan-in.
//!
//! The pool is the only resource shared between requests. Each unit task owns
//! its permit, so the permit is returned when the task ends however it ends.
//! A failing task does not cancel its siblings: the pool drains every task of
//! a batch before reporting the first failure.

use std::sync::Arc;
use tokio::sync::Semaphore;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::models::RawUnit;

/// Failure of a unit task inside the pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unit task {position} failed: {message}")]
pub struct UnitTaskError {
    pub position: usize,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held by a running task.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Applies `f` to every unit on the pool and returns the outputs in unit
    /// order.
    pub async fn map_units<T, F>(
        &self,
        units: &Arc<Vec<RawUnit>>,
        f: F,
    ) -> Result<Vec<T>, UnitTaskError>
    where
        T: Send + 'static,
        F: Fn(&RawUnit) -> T + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let mut set = JoinSet::new();

        for position in 0..units.len() {
            let units = Arc::clone(units);
            let f = Arc::clone(&f);
            let semaphore = Arc::clone(&self.semaphore);

            set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| UnitTaskError {
                        position,
                        message: e.to_string(),
                    })?;
                Ok::<_, UnitTaskError>((position, f(&units[position])))
            });
        }

        let mut slots: Vec<Option<T>> = (0..units.len()).map(|_| None).collect();
        let mut first_error: Option<UnitTaskError> = None;

        while let Some(joined) = set.join_next().await {
            let outcome = joined.map_err(|e| UnitTaskError {
                position: usize::MAX,
                message: e.to_string(),
            });
            match outcome.and_then(|inner| inner) {
                Ok((position, value)) => slots[position] = Some(value),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| {
                slot.ok_or_else(|| UnitTaskError {
                    position,
                    message: "no output collected".to_string(),
                })
            })
            .collect()
    }
}
