//! Per-request worker threads.
//!
//! A [`WorkerPool`] answers one [`ComputationRequest`] by splitting its range into one
//! span per worker, computing each span's product on its own scoped thread, and folding the
//! partial products once every worker has been joined. Workers share only the immutable
//! request and each returns its own [`PartialResult`], so no locking is involved.
use std::{io, num::NonZeroUsize, thread};

use log::{debug, trace};
use thiserror::Error;

use crate::{
    arith::{factorial, fold_mod},
    partition::{PartitionError, Span, partition},
    protocol::{ComputationReply, ComputationRequest, PartialResult, RequestError},
};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error("failed to spawn worker {index}: {source}")]
    WorkerSpawn { index: usize, source: io::Error },
    #[error("worker computing {0} panicked")]
    WorkerPanicked(Span),
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: NonZeroUsize,
}

impl WorkerPool {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self { workers }
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Compute the reply for `req`, blocking until every worker has finished.
    pub fn compute(&self, req: &ComputationRequest) -> Result<ComputationReply, PoolError> {
        req.validate()?;
        let spans = partition(req.begin, req.end, self.workers.get())?;
        let modulus = req.modulus;

        let partials = thread::scope(|scope| -> Result<Vec<PartialResult>, PoolError> {
            let mut handles = Vec::with_capacity(spans.len());
            for (index, span) in spans.iter().copied().enumerate() {
                let handle = thread::Builder::new()
                    .name(format!("factorial-worker-{index}"))
                    .spawn_scoped(scope, move || PartialResult {
                        span,
                        value: factorial(span.begin, span.end, modulus),
                    })
                    .map_err(|source| PoolError::WorkerSpawn { index, source })?;
                handles.push((span, handle));
            }

            handles
                .into_iter()
                .map(|(span, handle)| handle.join().map_err(|_| PoolError::WorkerPanicked(span)))
                .collect::<Result<Vec<_>, _>>()
        })?;

        for partial in &partials {
            trace!("span {} -> {}", partial.span, partial.value);
        }

        let result = fold_mod(partials.iter().map(|p| p.value), modulus);
        debug!(
            "{} worker(s) computed {} to {} mod {modulus} = {result}",
            partials.len(),
            req.begin,
            req.end
        );

        Ok(ComputationReply { result })
    }
}
