//! Cancellable background tasks.
//!
//! Each task runs on its own thread and sleeps on a channel with
//! `recv_timeout`. Cancelling, or dropping the handle, disconnects the
//! channel and wakes the thread, which then exits without running again.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Whether an interval task should keep ticking
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

/// Handle to a running background task; dropping it cancels the task
#[derive(Debug)]
pub struct TaskHandle {
    cancel: Option<Sender<()>>,
}

impl TaskHandle {
    /// Run `tick` every `period` until it returns [`Tick::Stop`] or the handle is cancelled
    pub fn interval<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Tick + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        thread::spawn(move || loop {
            match rx.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => {
                    if tick() == Tick::Stop {
                        break;
                    }
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self { cancel: Some(tx) }
    }

    /// Run `f` once after `delay` unless cancelled first
    pub fn delayed<F>(delay: Duration, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(delay) {
                f();
            }
        });
        Self { cancel: Some(tx) }
    }

    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_delayed_runs_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _handle = TaskHandle::delayed(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(150));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancelled_delay_never_runs() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let mut handle = TaskHandle::delayed(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();
        assert!(handle.is_cancelled());

        thread::sleep(Duration::from_millis(250));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropping_handle_cancels() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        drop(TaskHandle::delayed(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        thread::sleep(Duration::from_millis(250));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_interval_stops_itself() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _handle = TaskHandle::interval(Duration::from_millis(5), move || {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                Tick::Stop
            } else {
                Tick::Continue
            }
        });

        thread::sleep(Duration::from_millis(300));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
