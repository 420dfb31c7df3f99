use bincode::{Decode, Encode};
use thiserror::Error;

use crate::partition::Span;

/// Request violates the `1 <= begin <= end`, `modulus >= 2` contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("range must start at 1 or later, got {0}")]
    ZeroBegin(u64),
    #[error("range {begin} to {end} is inverted")]
    Inverted { begin: u64, end: u64 },
    #[error("modulus must be at least 2, got {0}")]
    Modulus(u64),
}

/// Ask a server for `begin * (begin + 1) * ... * end mod modulus`.
///
/// Field order is the wire order: `begin | end | modulus`.
#[derive(Debug, Clone, Copy, Encode, Decode, PartialEq, Eq)]
pub struct ComputationRequest {
    pub begin: u64,
    pub end: u64,
    pub modulus: u64,
}

impl ComputationRequest {
    pub fn new(span: Span, modulus: u64) -> Self {
        Self {
            begin: span.begin,
            end: span.end,
            modulus,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.begin, self.end)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.begin == 0 {
            return Err(RequestError::ZeroBegin(self.begin));
        }
        if self.begin > self.end {
            return Err(RequestError::Inverted {
                begin: self.begin,
                end: self.end,
            });
        }
        if self.modulus < 2 {
            return Err(RequestError::Modulus(self.modulus));
        }
        Ok(())
    }
}
