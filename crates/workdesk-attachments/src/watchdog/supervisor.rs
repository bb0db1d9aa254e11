use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use workdesk_core::StatusTuple;

use super::machine::{RedirectReason, WatchdogAction, WatchdogEvent, WatchdogMachine, WatchdogState};
use super::timer::WatchdogTimer;
use crate::session::AttachmentSession;

/// The one-shot side effect performed when the watchdog fires.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, reason: RedirectReason);
}

pub struct RedirectSupervisor {
    machine: WatchdogMachine,
    status: mpsc::UnboundedReceiver<StatusTuple>,
    status_open: bool,
    events: mpsc::UnboundedReceiver<WatchdogEvent>,
    timer_events: mpsc::UnboundedSender<WatchdogEvent>,
    timer: Option<WatchdogTimer>,
    timeout: Duration,
    navigator: Arc<dyn Navigator>,
    cancel: CancellationToken,
    state_tx: watch::Sender<WatchdogState>,
}

impl RedirectSupervisor {
    /// Start supervising `session`. The supervisor stays idle until
    /// [`SupervisorHandle::save_requested`] is called.
    pub fn watch(
        session: &AttachmentSession,
        navigator: Arc<dyn Navigator>,
        timeout: Duration,
    ) -> SupervisorHandle {
        Self::spawn(session.subscribe(), navigator, timeout)
    }

    /// Drive a watchdog from any status stream. The end of the stream counts
    /// as teardown of the hosting session.
    pub fn spawn(
        status: mpsc::UnboundedReceiver<StatusTuple>,
        navigator: Arc<dyn Navigator>,
        timeout: Duration,
    ) -> SupervisorHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WatchdogState::Idle);
        let cancel = CancellationToken::new();

        let supervisor = Self {
            machine: WatchdogMachine::new(),
            status,
            status_open: true,
            events: events_rx,
            timer_events: events_tx.clone(),
            timer: None,
            timeout,
            navigator,
            cancel: cancel.clone(),
            state_tx,
        };
        let task = tokio::spawn(supervisor.run());

        SupervisorHandle {
            events: events_tx,
            state: state_rx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(mut self) -> Option<RedirectReason> {
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => WatchdogEvent::Teardown,
                // Status first: every tuple published before a save signal or a
                // timer tick is applied before that event.
                status = self.status.recv(), if self.status_open => match status {
                    Some(status) => WatchdogEvent::Status(status),
                    None => {
                        self.status_open = false;
                        WatchdogEvent::Teardown
                    }
                },
                Some(event) = self.events.recv() => event,
            };

            for action in self.machine.handle(event) {
                self.apply(action).await;
            }

            let state = self.machine.state();
            self.state_tx.send_replace(state);
            match state {
                WatchdogState::Fired(reason) => return Some(reason),
                WatchdogState::Disposed => {
                    tracing::debug!("Redirect watchdog disposed before firing");
                    return None;
                }
                _ => {}
            }
        }
    }

    async fn apply(&mut self, action: WatchdogAction) {
        match action {
            WatchdogAction::StartTimer => {
                tracing::debug!(timeout = ?self.timeout, "Redirect watchdog timer started");
                self.timer = Some(WatchdogTimer::start(self.timeout, self.timer_events.clone()));
            }
            WatchdogAction::CancelTimer => {
                if let Some(timer) = self.timer.take() {
                    timer.cancel();
                }
            }
            WatchdogAction::Navigate(reason) => {
                self.timer = None;
                let pending_count = self.machine.last_status().map_or(0, |s| s.pending_count);
                match reason {
                    RedirectReason::Settled => {
                        tracing::info!(reason = %reason, "Attachment work settled; navigating");
                    }
                    RedirectReason::TimedOut => {
                        tracing::warn!(
                            reason = %reason,
                            pending_count,
                            timeout = ?self.timeout,
                            "Redirect watchdog timed out; pending attachments may be orphaned"
                        );
                    }
                }
                self.navigator.navigate(reason).await;
            }
        }
    }
}

/// Handle to a running [`RedirectSupervisor`]. Dropping it tears the
/// supervisor down.
pub struct SupervisorHandle {
    events: mpsc::UnboundedSender<WatchdogEvent>,
    state: watch::Receiver<WatchdogState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Option<RedirectReason>>>,
}

impl SupervisorHandle {
    /// The parent record's own save succeeded; arm the watchdog.
    pub fn save_requested(&self) {
        let _ = self.events.send(WatchdogEvent::SaveRequested);
    }

    /// The hosting view went away. A running timer is cleared and no
    /// navigation happens afterwards.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> WatchdogState {
        *self.state.borrow()
    }

    /// Wait for the supervisor to stop. `Some` when it navigated.
    pub async fn finished(mut self) -> Option<RedirectReason> {
        let task = self.task.take()?;
        match task.await {
            Ok(reason) => reason,
            Err(e) => {
                tracing::error!(error = %e, "Redirect watchdog task failed");
                None
            }
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
