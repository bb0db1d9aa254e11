use serde::Serialize;

/// Derived view of an attachment session, recomputed on every state transition.
///
/// `pending_count` is the pending queue length at the moment of computation and
/// `attaching` is true only while a commit call is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTuple {
    pub uploading: bool,
    pub attaching: bool,
    pub pending_count: usize,
    pub has_parent_id: bool,
}

impl StatusTuple {
    /// No upload or commit outstanding and nothing left to attach.
    pub fn is_idle(&self) -> bool {
        !self.uploading && !self.attaching && self.pending_count == 0
    }
}
