//! Data models for the attachment pipeline
//!
//! Pending items and the wire types live in `attachment`; the derived status
//! tuple lives in `status`.

mod attachment;
mod status;

pub use attachment::*;
pub use status::*;
