//! Concurrent load against a shared server engine.

use crate::fixtures::{text_server, ClientSession, MemoryServer, RecordingSubscriber};
use diffsync_protocol::{PatchMessage, Synchronizer};
use diffsync_server::Subscriber;
use diffsync_synchronizer::{TextDiff, TextSynchronizer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        Self {
            total_ops: successful + failed,
            successful_ops: successful,
            failed_ops: failed,
            duration,
        }
    }

    /// Operations per second.
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_ops as f64 / secs
        } else {
            0.0
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Edits per client.
    pub edits: usize,
    /// Number of concurrent clients.
    pub threads: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            edits: 200,
            threads: 4,
        }
    }
}

/// Races `contents.len()` first attaches of `document_id`, one per thread,
/// released together by a barrier.
///
/// Returns each attacher's reply, in thread order.
pub fn first_add_race<S>(
    server: &Arc<MemoryServer<S>>,
    document_id: &str,
    contents: Vec<S::Content>,
) -> Vec<PatchMessage<S::Diff>>
where
    S: Synchronizer + 'static,
{
    let barrier = Arc::new(Barrier::new(contents.len()));
    let handles: Vec<_> = contents
        .into_iter()
        .enumerate()
        .map(|(i, content)| {
            let server = Arc::clone(server);
            let barrier = Arc::clone(&barrier);
            let document_id = document_id.to_string();
            thread::spawn(move || {
                let subscriber = RecordingSubscriber::<S::Diff>::new(format!("racer-{i}"));
                barrier.wait();
                server
                    .add_subscriber(subscriber, &document_id, Some(content))
                    .expect("add subscriber")
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .collect()
}

/// Each client edits its own document on a shared server.
///
/// Every edit is a request/response round trip; an operation fails if the
/// server rejects it or the document does not converge.
pub fn stress_independent_documents(config: &StressConfig) -> StressTestResult {
    let server = text_server();
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(config.threads));

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let server = Arc::clone(&server);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let barrier = Arc::clone(&barrier);
            let edits = config.edits;

            thread::spawn(move || {
                let document_id = format!("stress-{t}");
                let (session, _) =
                    ClientSession::attach(&server, TextSynchronizer, &document_id, String::new());
                barrier.wait();

                let mut content = String::new();
                for i in 0..edits {
                    content.push(char::from(b'a' + (i % 26) as u8));
                    let message = session.edit(content.clone());
                    let converged = session.send(message).is_ok() && {
                        session.pull();
                        session.content() == content
                    };
                    if converged {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Many clients repeatedly attach to and detach from one document while
/// the registry is read concurrently.
pub fn stress_subscriber_churn(config: &StressConfig) -> StressTestResult {
    let server = text_server();
    let document_id = "churn";
    server
        .add_subscriber(RecordingSubscriber::<TextDiff>::new("anchor"), document_id, Some("x".to_string()))
        .expect("seed document");

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(config.threads));

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let server = Arc::clone(&server);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let barrier = Arc::clone(&barrier);
            let rounds = config.edits;

            thread::spawn(move || {
                let subscriber: Arc<dyn Subscriber<TextDiff>> =
                    RecordingSubscriber::<TextDiff>::new(format!("churn-{t}"));
                barrier.wait();
                for _ in 0..rounds {
                    server.connect_subscriber(Arc::clone(&subscriber), document_id);
                    let seen = server
                        .subscribers(document_id)
                        .iter()
                        .any(|s| Arc::ptr_eq(s, &subscriber));
                    if seen && server.remove_subscriber(&subscriber, document_id) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stress_result_throughput() {
        let result = StressTestResult::new(90, 10, Duration::from_secs(2));
        assert_eq!(result.total_ops, 100);
        assert!((result.ops_per_second() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn small_independent_run() {
        let result = stress_independent_documents(&StressConfig {
            edits: 20,
            threads: 2,
        });
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 40);
    }

    #[test]
    fn small_churn_run() {
        let result = stress_subscriber_churn(&StressConfig {
            edits: 50,
            threads: 4,
        });
        assert_eq!(result.failed_ops, 0);
    }
}
