use std::{
    io,
    num::NonZeroUsize,
    sync::{Arc, Mutex, mpsc},
    thread,
};

use log::{debug, warn};
use thiserror::Error;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum ThreadPoolError {
    #[error("failed to spawn connection handler {id}: {source}")]
    Spawn { id: usize, source: io::Error },
    #[error("connection handlers have shut down")]
    Closed,
}

/// Fixed set of threads that each run one connection to completion at a time.
///
/// When every handler is busy, accepted connections queue up until one frees.
#[derive(Debug)]
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<mpsc::Sender<Job>>,
}

impl ThreadPool {
    pub fn new(size: NonZeroUsize) -> Result<Self, ThreadPoolError> {
        let size = size.get();
        let mut workers = Vec::with_capacity(size);
        let (sender, receiver) = mpsc::channel();

        let receiver = Arc::new(Mutex::new(receiver));

        for id in 0..size {
            workers.push(Worker::new(id, Arc::clone(&receiver))?);
        }

        Ok(Self {
            workers,
            sender: Some(sender),
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn execute<F>(&self, f: F) -> Result<(), ThreadPoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let job = Box::new(f);
        self.sender
            .as_ref()
            .ok_or(ThreadPoolError::Closed)?
            .send(job)
            .map_err(|_| ThreadPoolError::Closed)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());

        for worker in self.workers.drain(..) {
            debug!("shutting down connection handler {}", worker.id);

            if worker.thread.join().is_err() {
                warn!("connection handler {} panicked", worker.id);
            }
        }
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn new(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) -> Result<Self, ThreadPoolError> {
        let thread = thread::Builder::new()
            .name(format!("connection-handler-{id}"))
            .spawn(move || {
                loop {
                    // A poisoned lock only means another handler panicked mid-recv.
                    let msg = match receiver.lock() {
                        Ok(rx) => rx.recv(),
                        Err(poisoned) => poisoned.into_inner().recv(),
                    };
                    match msg {
                        Ok(job) => {
                            debug!("handler {id} picked up a connection");
                            job();
                        }
                        Err(_) => {
                            debug!("handler {id} disconnected");
                            break;
                        }
                    }
                }
            })
            .map_err(|source| ThreadPoolError::Spawn { id, source })?;

        Ok(Self { id, thread })
    }
}
