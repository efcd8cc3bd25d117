//! Backend I/O off the interaction path.
//!
//! Jobs are submitted to an [`IoExecutor`] and their completions polled
//! without blocking. [`ThreadedExecutor`] runs them on one background thread
//! in submission order, which keeps a load queued behind a save for the same
//! image from overtaking it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::backend::{AnnotationBackend, BackendError};
use crate::model::{Category, ImageKey, NormalizedBox};
use crate::sync::coordinator::SaveRequest;
use crate::sync::scheduler::SaveTicket;

/// Identifies one load or class-list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket(pub(crate) u64);

impl std::fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch#{}", self.0)
    }
}

/// Work for the backend.
#[derive(Debug, Clone)]
pub enum IoJob {
    Save(SaveRequest),
    Load { ticket: FetchTicket, image: ImageKey },
    ListClasses { ticket: FetchTicket, dataset_id: String },
}

/// Result of an [`IoJob`].
#[derive(Debug)]
pub enum IoCompletion {
    Saved {
        ticket: SaveTicket,
        image: ImageKey,
        result: Result<(), BackendError>,
    },
    Loaded {
        ticket: FetchTicket,
        image: ImageKey,
        result: Result<Vec<NormalizedBox>, BackendError>,
    },
    Classes {
        ticket: FetchTicket,
        result: Result<Vec<Category>, BackendError>,
    },
}

impl IoJob {
    /// Run the job against a backend.
    pub fn run(self, backend: &dyn AnnotationBackend) -> IoCompletion {
        match self {
            IoJob::Save(request) => IoCompletion::Saved {
                result: backend.save_annotations(&request.image, &request.boxes),
                ticket: request.ticket,
                image: request.image,
            },
            IoJob::Load { ticket, image } => IoCompletion::Loaded {
                result: backend.load_annotations(&image),
                ticket,
                image,
            },
            IoJob::ListClasses { ticket, dataset_id } => IoCompletion::Classes {
                result: backend.list_classes(&dataset_id),
                ticket,
            },
        }
    }

    /// The completion reported when the job could not be delivered.
    fn fail(self, error: BackendError) -> IoCompletion {
        match self {
            IoJob::Save(request) => IoCompletion::Saved {
                ticket: request.ticket,
                image: request.image,
                result: Err(error),
            },
            IoJob::Load { ticket, image } => IoCompletion::Loaded {
                ticket,
                image,
                result: Err(error),
            },
            IoJob::ListClasses { ticket, .. } => IoCompletion::Classes {
                ticket,
                result: Err(error),
            },
        }
    }
}

/// Runs backend jobs asynchronously relative to the caller.
pub trait IoExecutor {
    /// Queue a job. Never blocks on the backend.
    fn submit(&mut self, job: IoJob);

    /// Take one finished job, oldest first. Non-blocking.
    fn try_next(&mut self) -> Option<IoCompletion>;

    /// Jobs submitted but not yet taken.
    fn in_flight(&self) -> usize;
}

/// Message sent to the I/O thread.
enum ThreadMessage {
    Run(IoJob),
    Shutdown,
}

/// Background thread executing backend jobs in order.
pub struct ThreadedExecutor {
    job_tx: Sender<ThreadMessage>,
    completion_rx: Receiver<IoCompletion>,
    thread_handle: Option<JoinHandle<()>>,
    /// Failures produced locally when the thread is gone.
    undelivered: VecDeque<IoCompletion>,
    in_flight: usize,
}

impl ThreadedExecutor {
    /// Spawn the I/O thread.
    pub fn spawn(backend: Arc<dyn AnnotationBackend>) -> Result<Self, BackendError> {
        let (job_tx, job_rx) = mpsc::channel::<ThreadMessage>();
        let (completion_tx, completion_rx) = mpsc::channel::<IoCompletion>();

        let thread_handle = thread::Builder::new()
            .name("annotation-io".to_string())
            .spawn(move || {
                log::info!("Annotation I/O thread started");
                Self::thread_loop(backend.as_ref(), job_rx, completion_tx);
                log::info!("Annotation I/O thread exiting");
            })?;

        Ok(Self {
            job_tx,
            completion_rx,
            thread_handle: Some(thread_handle),
            undelivered: VecDeque::new(),
            in_flight: 0,
        })
    }

    fn thread_loop(
        backend: &dyn AnnotationBackend,
        job_rx: Receiver<ThreadMessage>,
        completion_tx: Sender<IoCompletion>,
    ) {
        loop {
            match job_rx.recv() {
                Ok(ThreadMessage::Run(job)) => {
                    log::trace!("Running {:?}", job);
                    if completion_tx.send(job.run(backend)).is_err() {
                        log::warn!("Completion channel closed, I/O thread exiting");
                        break;
                    }
                }
                Ok(ThreadMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Job channel closed, I/O thread exiting");
                    break;
                }
            }
        }
    }

    /// Block up to `timeout` for the next completion.
    pub fn wait_next(&mut self, timeout: Duration) -> Option<IoCompletion> {
        if let Some(completion) = self.undelivered.pop_front() {
            self.in_flight = self.in_flight.saturating_sub(1);
            return Some(completion);
        }
        match self.completion_rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(completion)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("I/O thread disconnected");
                None
            }
        }
    }
}

impl IoExecutor for ThreadedExecutor {
    fn submit(&mut self, job: IoJob) {
        self.in_flight += 1;
        if let Err(mpsc::SendError(message)) = self.job_tx.send(ThreadMessage::Run(job)) {
            log::error!("Failed to send I/O job: channel closed");
            if let ThreadMessage::Run(job) = message {
                self.undelivered.push_back(job.fail(BackendError::Disconnected));
            }
        }
    }

    fn try_next(&mut self) -> Option<IoCompletion> {
        if let Some(completion) = self.undelivered.pop_front() {
            self.in_flight = self.in_flight.saturating_sub(1);
            return Some(completion);
        }
        match self.completion_rx.try_recv() {
            Ok(completion) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(completion)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("I/O thread disconnected");
                None
            }
        }
    }

    fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl Drop for ThreadedExecutor {
    fn drop(&mut self) {
        log::debug!("Shutting down annotation I/O thread");

        // Queued jobs run before the shutdown message is seen.
        let _ = self.job_tx.send(ThreadMessage::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("I/O thread panicked: {:?}", e);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn save_job(ticket: u64, image: &ImageKey, boxes: Vec<NormalizedBox>) -> IoJob {
        IoJob::Save(SaveRequest {
            ticket: SaveTicket(ticket),
            image: image.clone(),
            boxes,
        })
    }

    #[test]
    fn test_threaded_executor_runs_jobs_in_order() {
        let backend = Arc::new(MemoryBackend::new());
        let mut executor = ThreadedExecutor::spawn(backend.clone()).expect("spawn");
        let image = ImageKey::new("ds", "a.jpg");

        executor.submit(save_job(1, &image, vec![NormalizedBox::new(0, 0.5, 0.5, 0.2, 0.2)]));
        executor.submit(IoJob::Load {
            ticket: FetchTicket(1),
            image: image.clone(),
        });
        assert_eq!(executor.in_flight(), 2);

        let first = executor.wait_next(Duration::from_secs(5)).expect("save done");
        assert!(matches!(
            first,
            IoCompletion::Saved { ticket: SaveTicket(1), result: Ok(()), .. }
        ));

        match executor.wait_next(Duration::from_secs(5)).expect("load done") {
            IoCompletion::Loaded { result, .. } => {
                assert_eq!(result.expect("loaded").len(), 1);
            }
            other => panic!("unexpected completion {other:?}"),
        }
        assert_eq!(executor.in_flight(), 0);
        assert!(executor.try_next().is_none());
    }

    #[test]
    fn test_failures_come_back_as_completions() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_saves(true);
        let mut executor = ThreadedExecutor::spawn(backend).expect("spawn");

        executor.submit(save_job(7, &ImageKey::new("ds", "a.jpg"), vec![]));
        match executor.wait_next(Duration::from_secs(5)) {
            Some(IoCompletion::Saved { ticket, result, .. }) => {
                assert_eq!(ticket, SaveTicket(7));
                assert!(result.is_err());
            }
            other => panic!("unexpected completion {other:?}"),
        }
    }

    #[test]
    fn test_drop_finishes_queued_jobs() {
        let backend = Arc::new(MemoryBackend::new());
        {
            let mut executor = ThreadedExecutor::spawn(backend.clone()).expect("spawn");
            executor.submit(save_job(1, &ImageKey::new("ds", "a.jpg"), vec![]));
        }
        assert_eq!(backend.save_count(), 1);
    }
}
