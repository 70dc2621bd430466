//! Identity-preserving outfit workflow.
//!
//! A session first generates the base character once, then renders every
//! other outfit as an edit of that base image so the face and pose stay the
//! same. One generation may be in flight at a time; requests arriving while
//! busy are dropped, not queued.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use generator::{compose_prompt, ImageGenerator};
use shared::{
    catalog,
    domain::{GenerationRequest, HistoryEntry, ImageRef, OutfitKind},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::{
    events::{Status, StudioEvent, PROGRESS_STAGES},
    history::{History, HISTORY_CAPACITY},
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub const DEFAULT_PLACEHOLDER_IMAGE: &str =
    "https://images.unsplash.com/photo-1605218427306-022248cebf77?q=80&w=2670&auto=format&fit=crop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Busy,
    IdentityMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Generated(ImageRef),
    /// BASE requested with an identity already on hand; no backend call made.
    RestoredIdentity,
    Ignored(IgnoreReason),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StudioOptions {
    pub placeholder: ImageRef,
    pub stage_interval: Duration,
    pub history_capacity: usize,
}

impl Default for StudioOptions {
    fn default() -> Self {
        Self {
            placeholder: ImageRef::from_url(DEFAULT_PLACEHOLDER_IMAGE),
            stage_interval: Duration::from_millis(1500),
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioSnapshot {
    pub identity: Option<ImageRef>,
    pub display: ImageRef,
    pub selected: OutfitKind,
    pub busy: bool,
    pub status: Status,
    pub history: Vec<HistoryEntry>,
}

struct StudioState {
    identity: Option<ImageRef>,
    display: ImageRef,
    selected: OutfitKind,
    status: Status,
    history: History,
    initialized: bool,
}

/// Clears the busy flag on every exit path, including early returns and
/// a dropped request future.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct StudioController {
    generator: Arc<dyn ImageGenerator>,
    events: broadcast::Sender<StudioEvent>,
    busy: AtomicBool,
    stage_interval: Duration,
    inner: Mutex<StudioState>,
}

impl StudioController {
    pub fn new(generator: Arc<dyn ImageGenerator>, options: StudioOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            generator,
            events,
            busy: AtomicBool::new(false),
            stage_interval: options.stage_interval,
            inner: Mutex::new(StudioState {
                identity: None,
                display: options.placeholder,
                selected: OutfitKind::Base,
                status: Status::Idle,
                history: History::with_capacity(options.history_capacity),
                initialized: false,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.events.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Generates the base character the first time a session starts. Later
    /// calls, or calls once an identity exists, do nothing and return `None`.
    pub async fn initialize(&self) -> Option<GenerationOutcome> {
        {
            let mut state = self.inner.lock().await;
            if state.initialized || state.identity.is_some() {
                return None;
            }
            state.initialized = true;
        }
        info!("bootstrapping base identity");
        Some(self.request_generation(OutfitKind::Base).await)
    }

    pub async fn request_generation(&self, kind: OutfitKind) -> GenerationOutcome {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!(preset = %kind, "generation already in flight; ignoring request");
            return GenerationOutcome::Ignored(IgnoreReason::Busy);
        };

        let preset = catalog::preset(kind);
        let request = {
            let mut state = self.inner.lock().await;
            match (kind.is_base(), state.identity.clone()) {
                (false, None) => {
                    debug!(preset = %kind, "no identity yet; ignoring variant request");
                    return GenerationOutcome::Ignored(IgnoreReason::IdentityMissing);
                }
                (true, Some(identity)) => {
                    state.display = identity.clone();
                    state.selected = OutfitKind::Base;
                    state.status = Status::Ready;
                    self.emit(StudioEvent::DisplayChanged(identity));
                    self.emit(StudioEvent::StatusChanged(Status::Ready));
                    debug!("restored cached base identity");
                    return GenerationOutcome::RestoredIdentity;
                }
                (true, None) => GenerationRequest::new(preset, None),
                (false, identity @ Some(_)) => GenerationRequest::new(preset, identity),
            }
        };

        self.begin(kind).await;
        info!(
            preset = %kind,
            edit = request.is_edit(),
            backend = self.generator.name(),
            "dispatching generation"
        );
        let result = self.generate_with_progress(&request).await;

        let mut state = self.inner.lock().await;
        match result {
            Ok(image) => {
                state.display = image.clone();
                if kind.is_base() {
                    if state.identity.is_none() {
                        state.identity = Some(image.clone());
                    } else {
                        warn!("base generation finished with an identity already set; keeping the original");
                    }
                }
                let prompt = compose_prompt(&request.prompt_modifier, request.is_edit());
                state
                    .history
                    .record(HistoryEntry::new(image.clone(), kind, prompt));
                state.status = Status::Ready;
                let history_len = state.history.len();
                drop(state);

                info!(preset = %kind, image = %image, "generation succeeded");
                self.emit(StudioEvent::DisplayChanged(image.clone()));
                self.emit(StudioEvent::HistoryUpdated { len: history_len });
                self.emit(StudioEvent::StatusChanged(Status::Ready));
                GenerationOutcome::Generated(image)
            }
            Err(err) => {
                state.status = Status::Error;
                drop(state);

                let message = err.to_string();
                error!(preset = %kind, error = %message, "generation failed");
                self.emit(StudioEvent::StatusChanged(Status::Error));
                self.emit(StudioEvent::GenerationFailed {
                    preset: kind,
                    message: message.clone(),
                });
                GenerationOutcome::Failed(message)
            }
        }
    }

    /// Shows a previously generated image. Leaves the selection, identity
    /// and history untouched; refused while a generation is in flight.
    pub async fn select_from_history(&self, entry: &HistoryEntry) -> bool {
        if self.is_busy() {
            debug!(entry = %entry.id, "generation in flight; ignoring history selection");
            return false;
        }
        let mut state = self.inner.lock().await;
        state.display = entry.image.clone();
        drop(state);
        self.emit(StudioEvent::DisplayChanged(entry.image.clone()));
        true
    }

    pub async fn snapshot(&self) -> StudioSnapshot {
        let state = self.inner.lock().await;
        StudioSnapshot {
            identity: state.identity.clone(),
            display: state.display.clone(),
            selected: state.selected,
            busy: self.is_busy(),
            status: state.status.clone(),
            history: state.history.entries(),
        }
    }

    async fn begin(&self, kind: OutfitKind) {
        let status = Status::Working(PROGRESS_STAGES[0]);
        let mut state = self.inner.lock().await;
        state.selected = kind;
        state.status = status.clone();
        drop(state);
        self.emit(StudioEvent::StatusChanged(status));
    }

    /// Awaits the backend while cycling cosmetic stage labels. The result is
    /// polled first so a stage tick never delays it.
    async fn generate_with_progress(
        &self,
        request: &GenerationRequest,
    ) -> Result<ImageRef, generator::GenerationError> {
        let generation = self.generator.generate(request);
        tokio::pin!(generation);
        let mut stages = PROGRESS_STAGES.iter().copied().cycle().skip(1);
        loop {
            tokio::select! {
                biased;
                result = &mut generation => return result,
                _ = tokio::time::sleep(self.stage_interval) => {
                    if let Some(stage) = stages.next() {
                        self.set_stage(stage).await;
                    }
                }
            }
        }
    }

    async fn set_stage(&self, stage: &'static str) {
        let status = Status::Working(stage);
        self.inner.lock().await.status = status.clone();
        self.emit(StudioEvent::StatusChanged(status));
    }

    fn emit(&self, event: StudioEvent) {
        // No subscribers is fine; the state is still readable via `snapshot`.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
