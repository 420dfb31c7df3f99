//! Work partitioning.
//!
//! [`partition`] splits an inclusive integer range into `count` contiguous spans whose
//! lengths differ by at most one. The client uses it to hand each server a span of
//! `1..=k`, and every server uses it again to hand each worker thread a span of its own
//! assignment.
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("cannot split a range of {width} element(s) into {count} non-empty partition(s)")]
    InvalidPartition { count: usize, width: u128 },
}

/// Inclusive span `begin..=end` of integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub begin: u64,
    pub end: u64,
}

impl Span {
    pub fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    /// Number of integers covered by the span.
    pub fn len(&self) -> u128 {
        if self.begin > self.end {
            0
        } else {
            (self.end - self.begin) as u128 + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.begin, self.end)
    }
}

/// Split `begin..=end` into exactly `count` ordered, non-overlapping spans.
///
/// Every span holds `width / count` elements and the first `width % count` spans hold one
/// more. Fails if `count` is zero or larger than the range, since that would leave a
/// partition with nothing to do.
pub fn partition(begin: u64, end: u64, count: usize) -> Result<Vec<Span>, PartitionError> {
    let width = Span::new(begin, end).len();
    if count == 0 || count as u128 > width {
        return Err(PartitionError::InvalidPartition { count, width });
    }

    let chunk = width / count as u128;
    let remainder = width % count as u128;

    let mut spans = Vec::with_capacity(count);
    let mut cursor = begin;
    for i in 0..count as u128 {
        let len = chunk + u128::from(i < remainder);
        // `len >= 1` and the spans never reach past `end`, so this stays in range.
        let last = cursor + (len - 1) as u64;
        spans.push(Span::new(cursor, last));
        cursor = last.wrapping_add(1);
    }

    Ok(spans)
}
