//! Deferred attachment pipeline.
//!
//! Files are uploaded the moment they are selected, held in a pending queue
//! while the parent record has no identifier, and attached in one batch as
//! soon as the identifier is known. A redirect watchdog waits for that work to
//! settle after the record is saved, bounded by a timeout.
//!
//! The pieces, leaves first:
//! - [`AssetUploader`]: pre-checks a file and calls the upload primitive
//! - [`PendingQueue`]: uploaded-but-unattached references, newest first
//! - [`AttachmentCommitter`]: one batched attach call at a time
//! - [`reconcile`]: the rule deciding when a commit starts
//! - [`StatusAggregator`]: derives and broadcasts [`StatusTuple`] transitions
//! - [`AttachmentSession`]: owns all of the above for one parent-record session
//! - [`watchdog`]: the `Idle -> Armed -> Fired` redirect supervisor

pub mod committer;
pub mod queue;
pub mod reconcile;
pub mod session;
pub mod status;
pub mod uploader;
pub mod watchdog;

pub use committer::{AttachmentCommitter, CommitPermit};
pub use queue::PendingQueue;
pub use session::AttachmentSession;
pub use status::StatusAggregator;
pub use uploader::AssetUploader;
pub use watchdog::{
    Navigator, RedirectReason, RedirectSupervisor, SupervisorHandle, WatchdogAction,
    WatchdogEvent, WatchdogMachine, WatchdogState,
};

pub use workdesk_core::StatusTuple;
