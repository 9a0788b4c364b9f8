//! Byte ranges into loaded source buffers.

use thiserror::Error;

/// Index of a buffer in the [`SourceStore`](crate::SourceStore).
pub type Origin = usize;

/// Half-open byte range `[start, end)` inside the buffer identified by `origin`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Span {
    /// Buffer the offsets refer to.
    pub origin: Origin,
    /// First byte of the range.
    pub start: usize,
    /// One past the last byte of the range.
    pub end: usize,
}

impl Span {
    /// Creates a span, rejecting inverted ranges.
    pub fn new(origin: Origin, start: usize, end: usize) -> Result<Self, SpanError> {
        if start <= end {
            Ok(Self { origin, start, end })
        } else {
            Err(SpanError::Inverted { start, end })
        }
    }

    /// Empty span at the start of `origin`, used for generated nodes.
    pub fn synthetic(origin: Origin) -> Self {
        Self {
            origin,
            start: 0,
            end: 0,
        }
    }

    /// Number of bytes covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other` when they share an origin.
    pub fn merge(&self, other: &Span) -> Span {
        if self.origin != other.origin {
            return *self;
        }
        Span {
            origin: self.origin,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Invalid span construction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum SpanError {
    /// `start` was greater than `end`.
    #[error("inverted span: start {start} > end {end}")]
    Inverted {
        /// Requested start offset.
        start: usize,
        /// Requested end offset.
        end: usize,
    },
}
