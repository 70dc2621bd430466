//! Status and event modeling for front-ends observing a studio session.

use std::fmt;

use shared::domain::{ImageRef, OutfitKind};

/// Cosmetic stage labels cycled while a generation is in flight.
pub static PROGRESS_STAGES: [&str; 4] = [
    "CONNECTING TO NEURAL NET...",
    "SYNCING WARDROBE DATA...",
    "RENDERING SUBJECT...",
    "CALIBRATING NEON...",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Working(&'static str),
    Ready,
    Error,
}

impl Status {
    pub fn message(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Working(stage) => *stage,
            Status::Ready => "ready",
            Status::Error => "error",
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(self, Status::Working(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioEvent {
    StatusChanged(Status),
    DisplayChanged(ImageRef),
    HistoryUpdated { len: usize },
    /// Needs explicit user acknowledgment; emitted once per failed generation.
    GenerationFailed { preset: OutfitKind, message: String },
}
