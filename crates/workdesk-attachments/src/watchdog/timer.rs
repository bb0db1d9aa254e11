use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::machine::WatchdogEvent;

/// One-shot timeout that delivers [`WatchdogEvent::TimerElapsed`].
///
/// Cancelled explicitly or by dropping the handle, so a discarded supervisor
/// never receives a stray tick.
#[derive(Debug)]
pub struct WatchdogTimer {
    task: JoinHandle<()>,
}

impl WatchdogTimer {
    pub fn start(after: Duration, events: mpsc::UnboundedSender<WatchdogEvent>) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(WatchdogEvent::TimerElapsed);
        });
        Self { task }
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for WatchdogTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
