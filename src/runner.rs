use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    algo::{Snapshot, Solver},
    error::SolveError,
};

/// Sent to the consumer after every step
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Step(Snapshot),
    Failed(SolveError),
}

/// A solver stepping on a worker thread at a fixed interval
///
/// The task stops on its own once the solver converges or a step fails. Otherwise it runs
/// until [`cancel`](AutoRun::cancel) is called or the handle is dropped. The consumer polls the
/// [`Receiver`] returned by [`spawn`](AutoRun::spawn) for snapshots.
pub struct AutoRun<S> {
    cancel: Sender<()>,
    handle: JoinHandle<S>,
}

impl<S: Solver + Send + 'static> AutoRun<S> {
    /// Start stepping `solver`, waiting `interval` between steps
    pub fn spawn(mut solver: S, interval: Duration) -> (Self, Receiver<Update>) {
        let (tx, rx) = mpsc::channel();
        let (cancel, cancelled) = mpsc::channel();

        let handle = thread::spawn(move || {
            loop {
                let (update, more) = match solver.step() {
                    Ok(more) => (Update::Step(solver.state()), more),
                    Err(err) => (Update::Failed(err), false),
                };

                if tx.send(update).is_err() {
                    log::debug!("update receiver dropped, stopping");
                    break;
                }
                if !more {
                    break;
                }

                match cancelled.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        log::debug!("{} cancelled", solver.algorithm());
                        break;
                    }
                }
            }
            solver
        });

        (Self { cancel, handle }, rx)
    }

    /// Stop stepping and hand the solver back
    pub fn cancel(self) -> thread::Result<S> {
        // the worker may already have finished and dropped its receiver
        let _ = self.cancel.send(());
        self.handle.join()
    }

    /// Wait for the solver to converge or fail and hand it back
    pub fn join(self) -> thread::Result<S> {
        let Self { cancel, handle } = self;
        let solver = handle.join();
        drop(cancel);
        solver
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
