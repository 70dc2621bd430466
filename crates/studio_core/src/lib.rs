//! Session core for the Neondoll wardrobe: the identity-preserving
//! generation workflow and the bounded result history.

pub mod controller;
pub mod events;
pub mod history;

pub use controller::{
    GenerationOutcome, IgnoreReason, StudioController, StudioOptions, StudioSnapshot,
    DEFAULT_PLACEHOLDER_IMAGE,
};
pub use events::{Status, StudioEvent, PROGRESS_STAGES};
pub use history::{History, HISTORY_CAPACITY};
