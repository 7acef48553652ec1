//! Circular footage timeline and the allocator handing out slices of it.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocError {
    #[error("requested duration must be positive and finite, got {0}")]
    InvalidDuration(f64),
    #[error("footage timeline must have a positive duration, got {0}")]
    DegenerateTimeline(f64),
}

/// The shared backdrop footage. Read-only for the whole run.
#[derive(Debug, Clone)]
pub struct FootageTimeline {
    pub path: PathBuf,
    /// Total duration in seconds
    pub duration: f64,
    /// Whether the footage carries an audio stream to mix under the narration
    pub has_audio: bool,
}

/// Half-open `[start, end)` window on the timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0.0
    }
}

/// A reserved window of footage, possibly split across the wrap point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Contiguous(TimeRange),
    /// `first` runs to the end of the footage, `second` restarts at zero.
    Wrapped { first: TimeRange, second: TimeRange },
}

impl Segment {
    pub fn is_wrapped(&self) -> bool {
        matches!(self, Segment::Wrapped { .. })
    }

    pub fn start(&self) -> f64 {
        match self {
            Segment::Contiguous(range) => range.start,
            Segment::Wrapped { first, .. } => first.start,
        }
    }

    /// Total footage time covered by the segment.
    pub fn duration(&self) -> f64 {
        match self {
            Segment::Contiguous(range) => range.len(),
            Segment::Wrapped { first, second } => first.len() + second.len(),
        }
    }

    /// Parts in playback order.
    pub fn parts(&self) -> Vec<TimeRange> {
        match self {
            Segment::Contiguous(range) => vec![*range],
            Segment::Wrapped { first, second } => vec![*first, *second],
        }
    }
}

/// Owns the allocation cursor over a circular timeline.
///
/// Successive calls to [`TimelineAllocator::allocate`] tile the timeline
/// without overlap in the order the calls are serialized by the internal
/// lock. The lock only ever guards arithmetic.
#[derive(Debug)]
pub struct TimelineAllocator {
    total: f64,
    cursor: Mutex<f64>,
}

impl TimelineAllocator {
    pub fn new(total: f64) -> Result<Self, AllocError> {
        Self::starting_at(total, 0.0)
    }

    /// Like [`TimelineAllocator::new`] but with the cursor placed at
    /// `position`, folded into `[0, total)`.
    pub fn starting_at(total: f64, position: f64) -> Result<Self, AllocError> {
        if !total.is_finite() || total <= 0.0 {
            return Err(AllocError::DegenerateTimeline(total));
        }
        let position = if position.is_finite() {
            position.rem_euclid(total)
        } else {
            0.0
        };

        Ok(Self {
            total,
            cursor: Mutex::new(position),
        })
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn cursor(&self) -> f64 {
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve `duration` seconds of footage starting at the cursor.
    ///
    /// A request longer than the whole timeline still wraps only once: the
    /// second part then extends past the end of the footage, while the
    /// cursor is folded back into `[0, total)`.
    pub fn allocate(&self, duration: f64) -> Result<Segment, AllocError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(AllocError::InvalidDuration(duration));
        }

        let segment = {
            let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
            let start = *cursor;
            let end = start + duration;

            if end <= self.total {
                *cursor = if end == self.total { 0.0 } else { end };
                Segment::Contiguous(TimeRange::new(start, end))
            } else {
                let remainder = duration - (self.total - start);
                // an over-long request leaves `remainder` past the end
                *cursor = remainder.rem_euclid(self.total);
                Segment::Wrapped {
                    first: TimeRange::new(start, self.total),
                    second: TimeRange::new(0.0, remainder),
                }
            }
        };

        if let Segment::Wrapped { second, .. } = &segment {
            debug!(
                start = segment.start(),
                remainder = second.end,
                "allocation wrapped around the footage"
            );
            if second.end > self.total {
                warn!(
                    duration,
                    total = self.total,
                    "requested duration exceeds the footage, second part runs past its end"
                );
            }
        }

        Ok(segment)
    }
}
