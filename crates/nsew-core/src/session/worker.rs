use std::sync::{mpsc, Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::debug;

use crate::error::{Result, StitchError};
use crate::pipeline::types::{CancelToken, ProgressEvent, ProgressReporter};
use crate::result::StitchedResult;

/// Progress reporter that forwards milestones over an mpsc channel.
pub struct ChannelProgressReporter {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelProgressReporter {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelProgressReporter {
    fn report(&self, event: ProgressEvent) {
        // The receiver may already be gone when the owner stopped listening.
        let _ = self.tx.send(event);
    }
}

/// Set once the worker thread has finished, whatever the outcome.
#[derive(Clone, Default)]
pub(crate) struct DoneSignal(Arc<(Mutex<bool>, Condvar)>);

impl DoneSignal {
    fn set(&self) {
        let (lock, cvar) = &*self.0;
        if let Ok(mut done) = lock.lock() {
            *done = true;
        }
        cvar.notify_all();
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0 .0.lock().map_or(true, |done| *done)
    }

    /// Block until the worker thread has finished.
    pub(crate) fn wait(&self) {
        let (lock, cvar) = &*self.0;
        let Ok(mut done) = lock.lock() else {
            return;
        };
        while !*done {
            done = match cvar.wait(done) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }
    }
}

/// Sets the signal when dropped, so a panicking worker still reports done.
struct SetOnDrop(DoneSignal);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.set();
    }
}

/// Handle to a stitch running on a background thread.
///
/// Progress and the terminal outcome arrive on separate channels. Dropping
/// the job detaches the thread; cancel first to stop its work.
pub struct StitchJob {
    progress: mpsc::Receiver<ProgressEvent>,
    result: mpsc::Receiver<Result<StitchedResult>>,
    cancel: CancelToken,
    done: DoneSignal,
    handle: Option<JoinHandle<()>>,
}

impl StitchJob {
    pub fn progress(&self) -> &mpsc::Receiver<ProgressEvent> {
        &self.progress
    }

    /// Request cancellation. The job ends with [`StitchError::Cancelled`] at
    /// its next milestone unless it is already writing.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(crate) fn done_signal(&self) -> DoneSignal {
        self.done.clone()
    }

    /// The outcome, if the job has finished.
    pub fn try_result(&self) -> Option<Result<StitchedResult>> {
        self.result.try_recv().ok()
    }

    /// Block until the job finishes and return its outcome.
    pub fn join(mut self) -> Result<StitchedResult> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| StitchError::Worker("stitch worker panicked".into()))?;
        }
        self.result
            .recv()
            .map_err(|_| StitchError::Worker("stitch worker exited without a result".into()))?
    }
}

/// Run `work` on a named thread, wiring its reporter and outcome to a new
/// [`StitchJob`].
pub(crate) fn spawn_job<F>(name: &str, cancel: CancelToken, work: F) -> Result<StitchJob>
where
    F: FnOnce(Arc<dyn ProgressReporter>, CancelToken) -> Result<StitchedResult> + Send + 'static,
{
    let (progress_tx, progress_rx) = mpsc::channel::<ProgressEvent>();
    let (result_tx, result_rx) = mpsc::channel::<Result<StitchedResult>>();
    let reporter: Arc<dyn ProgressReporter> = Arc::new(ChannelProgressReporter::new(progress_tx));
    let token = cancel.clone();
    let done = DoneSignal::default();
    let guard = SetOnDrop(done.clone());

    let handle = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // Dropped last, after the reporter and the result send.
            let _guard = guard;
            let outcome = work(reporter, token);
            if let Err(e) = &outcome {
                debug!(error = %e, "Stitch job finished with error");
            }
            let _ = result_tx.send(outcome);
        })?;

    Ok(StitchJob {
        progress: progress_rx,
        result: result_rx,
        cancel,
        done,
        handle: Some(handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_arrives_on_result_channel() {
        let job = spawn_job("test-job", CancelToken::new(), |reporter, _| {
            reporter.report(ProgressEvent {
                percent: 10,
                message: "started".into(),
            });
            Err(StitchError::NoTiles)
        })
        .unwrap();
        let progress = job.progress().recv().unwrap();
        assert_eq!(progress.percent, 10);
        assert!(matches!(job.join(), Err(StitchError::NoTiles)));
    }

    #[test]
    fn test_cancel_is_visible_to_worker() {
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let job = spawn_job("test-job", CancelToken::new(), move |_, cancel| {
            go_rx.recv().ok();
            cancel.check()?;
            Err(StitchError::Worker("not cancelled".into()))
        })
        .unwrap();
        job.cancel();
        go_tx.send(()).unwrap();
        assert!(matches!(job.join(), Err(StitchError::Cancelled)));
    }

    #[test]
    fn test_done_signal_set_after_worker_exits() {
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let job = spawn_job("test-job", CancelToken::new(), move |_, _| {
            go_rx.recv().ok();
            Err(StitchError::NoTiles)
        })
        .unwrap();
        let done = job.done_signal();
        assert!(!done.is_set());
        go_tx.send(()).unwrap();
        done.wait();
        assert!(done.is_set());
        assert!(matches!(job.join(), Err(StitchError::NoTiles)));
    }

    #[test]
    fn test_panicking_worker_still_signals_done() {
        let job = spawn_job("test-job", CancelToken::new(), |_, _| panic!("boom")).unwrap();
        job.done_signal().wait();
        assert!(matches!(job.join(), Err(StitchError::Worker(_))));
    }

    #[test]
    fn test_panic_becomes_worker_error() {
        let job = spawn_job("test-job", CancelToken::new(), |_, _| panic!("boom")).unwrap();
        assert!(matches!(job.join(), Err(StitchError::Worker(_))));
    }
}
