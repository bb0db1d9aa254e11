//! Redirect watchdog.
//!
//! After the parent record is saved, waits for attachment work to settle and
//! then navigates exactly once, or navigates anyway when the bound elapses.

mod machine;
mod supervisor;
mod timer;

pub use machine::{RedirectReason, WatchdogAction, WatchdogEvent, WatchdogMachine, WatchdogState};
pub use supervisor::{Navigator, RedirectSupervisor, SupervisorHandle};
pub use timer::WatchdogTimer;
