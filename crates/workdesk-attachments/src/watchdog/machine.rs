//! Pure transition function of the redirect watchdog.
//!
//! No timers and no I/O live here: the machine consumes [`WatchdogEvent`]s and
//! answers with the [`WatchdogAction`]s its driver must perform.

use std::fmt;

use serde::Serialize;
use workdesk_core::StatusTuple;

/// Why navigation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// All attachment work finished with the parent id known.
    Settled,
    /// The bound elapsed first; pending items may have been abandoned.
    TimedOut,
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectReason::Settled => write!(f, "settled"),
            RedirectReason::TimedOut => write!(f, "timed_out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Idle,
    Armed { timer_started: bool },
    /// Terminal. Navigation was requested exactly once.
    Fired(RedirectReason),
    /// Terminal. The hosting session went away before firing.
    Disposed,
}

impl WatchdogState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WatchdogState::Fired(_) | WatchdogState::Disposed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    SaveRequested,
    Status(StatusTuple),
    TimerElapsed,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    StartTimer,
    CancelTimer,
    Navigate(RedirectReason),
}

#[derive(Debug)]
pub struct WatchdogMachine {
    state: WatchdogState,
    last_status: Option<StatusTuple>,
}

impl Default for WatchdogMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchdogMachine {
    pub fn new() -> Self {
        Self {
            state: WatchdogState::Idle,
            last_status: None,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn last_status(&self) -> Option<StatusTuple> {
        self.last_status
    }

    pub fn handle(&mut self, event: WatchdogEvent) -> Vec<WatchdogAction> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        match (self.state, event) {
            (WatchdogState::Armed { timer_started }, WatchdogEvent::Teardown) => {
                self.state = WatchdogState::Disposed;
                if timer_started {
                    vec![WatchdogAction::CancelTimer]
                } else {
                    Vec::new()
                }
            }
            (_, WatchdogEvent::Teardown) => {
                self.state = WatchdogState::Disposed;
                Vec::new()
            }

            (WatchdogState::Idle, WatchdogEvent::Status(status)) => {
                self.last_status = Some(status);
                Vec::new()
            }
            (WatchdogState::Idle, WatchdogEvent::SaveRequested) => {
                self.state = WatchdogState::Armed {
                    timer_started: false,
                };
                match self.last_status {
                    Some(status) => self.evaluate(status),
                    None => Vec::new(),
                }
            }

            (WatchdogState::Armed { .. }, WatchdogEvent::Status(status)) => {
                self.last_status = Some(status);
                self.evaluate(status)
            }
            (WatchdogState::Armed { timer_started: true }, WatchdogEvent::TimerElapsed) => {
                self.state = WatchdogState::Fired(RedirectReason::TimedOut);
                vec![WatchdogAction::Navigate(RedirectReason::TimedOut)]
            }

            // Duplicate save signals and stale timer ticks.
            _ => Vec::new(),
        }
    }

    fn evaluate(&mut self, status: StatusTuple) -> Vec<WatchdogAction> {
        let WatchdogState::Armed { timer_started } = self.state else {
            return Vec::new();
        };
        if !status.has_parent_id {
            return Vec::new();
        }

        if status.is_idle() {
            self.state = WatchdogState::Fired(RedirectReason::Settled);
            let mut actions = Vec::with_capacity(2);
            if timer_started {
                actions.push(WatchdogAction::CancelTimer);
            }
            actions.push(WatchdogAction::Navigate(RedirectReason::Settled));
            actions
        } else if !timer_started {
            self.state = WatchdogState::Armed {
                timer_started: true,
            };
            vec![WatchdogAction::StartTimer]
        } else {
            Vec::new()
        }
    }
}
