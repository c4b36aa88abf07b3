//! Cancellable one-shot timeout running on its own thread

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Fires `on_expire` once after the timeout unless dropped first
///
/// Dropping the handle disconnects the channel the timer thread waits on,
/// which wakes it without running the callback.
#[derive(Debug)]
pub struct ArmTimer {
    _cancel: mpsc::Sender<()>,
}

impl ArmTimer {
    pub fn start<F>(timeout: Duration, on_expire: F) -> std::io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("chord-timeout".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(timeout) {
                    on_expire();
                }
            })?;

        Ok(Self { _cancel: cancel_tx })
    }

    /// Cancel without firing
    pub fn cancel(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fires_after_timeout() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = ArmTimer::start(Duration::from_millis(20), move || {
            flag.store(true, Ordering::SeqCst)
        })
        .unwrap();

        thread::sleep(Duration::from_millis(200));
        assert!(fired.load(Ordering::SeqCst));
        drop(timer);
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = ArmTimer::start(Duration::from_millis(50), move || {
            flag.store(true, Ordering::SeqCst)
        })
        .unwrap();

        timer.cancel();
        thread::sleep(Duration::from_millis(200));
        assert!(!fired.load(Ordering::SeqCst));
    }
}
