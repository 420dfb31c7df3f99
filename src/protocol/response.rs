use bincode::{Decode, Encode};

use crate::partition::Span;

/// Residue computed for a [`ComputationRequest`](super::ComputationRequest).
#[derive(Debug, Clone, Copy, Encode, Decode, PartialEq, Eq)]
pub struct ComputationReply {
    pub result: u64,
}

/// Product over one span, owned by whoever computed it until it is folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialResult {
    pub span: Span,
    pub value: u64,
}
