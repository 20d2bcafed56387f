//! Display Engine State Machine
//!
//! # Layers
//!
//! Two visual layers (A and B) alternate. New visual content is always
//! loaded into the *inactive* layer, which is then promoted while the
//! previous one is demoted. The demoted layer is torn down after the swap
//! delay, unless it has been promoted again in the meantime.
//!
//! # Tokens
//!
//! `show-item` bumps the playback token. Timers and element signals carry
//! the token that was current when they were created; anything older than
//! the engine's token is ignored. This is what keeps a slow teardown of
//! item A from touching the layer that item C was just loaded into.
//!
//! # Fallback
//!
//! Whenever there is nothing visual to show (audio without a companion
//! image, cleared item, media that ended) the engine shows the configured
//! background, or blacks out when there is none or the output is blanked.

use crate::events::DisplayEvent;
use crate::media::{MediaItem, MediaKind};
use crate::messages::DisplayCommand;

use super::element::{
    ElementId, ElementSignal, LayerElements, LayerId, MediaElement, PlaybackToken, RenderTargets,
    SignalKind,
};
use super::{DisplayConfig, DisplayError};

/// Lifecycle of the current item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnginePhase {
    /// No item
    #[default]
    Idle,
    /// Item loading, not confirmed ready
    Preparing,
    /// Item ready and on its layer
    Showing,
}

/// What a visual layer holds
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LayerContent {
    /// Nothing loaded
    #[default]
    Empty,
    /// Still image (item or companion)
    Image(String),
    /// Video
    Video(String),
    /// Background fallback image
    Background(String),
}

/// Deferred work the engine asks its runtime to schedule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Release a demoted layer if it is still hidden
    Teardown(LayerId),
    /// Fall back after media ended
    EndedFallback,
}

/// Timer payload delivered back to [`DisplayEngine::handle_timer`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerTask {
    /// Token current when the timer was scheduled
    pub token: PlaybackToken,
    /// What to do
    pub kind: TimerKind,
}

/// A timer to start
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledTimer {
    /// Delay from now
    pub delay: std::time::Duration,
    /// Payload
    pub task: TimerTask,
}

/// Output of one engine step
#[must_use]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reaction {
    /// Events for the control surface
    pub events: Vec<DisplayEvent>,
    /// Timers to start
    pub timers: Vec<ScheduledTimer>,
}

impl Reaction {
    /// Nothing to emit and nothing to schedule
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.timers.is_empty()
    }
}

/// What the audience sees
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Visible {
    /// Black output
    Blackout,
    /// One layer fully visible
    Layer {
        /// Which layer
        layer: LayerId,
        /// Its content
        content: LayerContent,
    },
}

/// Snapshot of the engine's observable output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Presentation {
    /// Visual output
    pub visible: Visible,
    /// Error banner text
    pub banner: Option<String>,
    /// Item lifecycle
    pub phase: EnginePhase,
    /// Whether timed media is playing
    pub playing: bool,
    /// Source on the audio channel while audio is the active media
    pub audio: Option<String>,
}

struct Layer<E> {
    elements: LayerElements<E>,
    content: LayerContent,
    visible: bool,
}

impl<E: MediaElement> Layer<E> {
    fn new(elements: LayerElements<E>) -> Self {
        Self {
            elements,
            content: LayerContent::Empty,
            visible: false,
        }
    }

    fn reset(&mut self) {
        self.elements.video.pause();
        self.elements.image.release();
        self.elements.video.release();
        self.content = LayerContent::Empty;
        self.visible = false;
    }

    fn shows_content(&self) -> bool {
        self.visible && self.content != LayerContent::Empty
    }

    fn shows_background(&self) -> bool {
        self.visible && matches!(self.content, LayerContent::Background(_))
    }
}

/// Dual-layer presentation state machine
pub struct DisplayEngine<E: MediaElement> {
    config: DisplayConfig,
    layers: [Layer<E>; 2],
    audio: E,
    active_layer: LayerId,
    current_item: Option<MediaItem>,
    active_media: Option<ElementId>,
    playing: bool,
    repeat: bool,
    blanked: bool,
    background: Option<String>,
    token: PlaybackToken,
    phase: EnginePhase,
    banner: Option<String>,
}

impl<E: MediaElement> DisplayEngine<E> {
    /// Build an engine over the given elements
    ///
    /// # Errors
    ///
    /// [`DisplayError::MissingTarget`] when any element is absent.
    pub fn new(targets: RenderTargets<E>, config: DisplayConfig) -> Result<Self, DisplayError> {
        let layer_a = targets
            .layer_a
            .ok_or(DisplayError::MissingTarget("layer A"))?;
        let layer_b = targets
            .layer_b
            .ok_or(DisplayError::MissingTarget("layer B"))?;
        let audio = targets.audio.ok_or(DisplayError::MissingTarget("audio"))?;

        Ok(Self {
            repeat: config.repeat,
            background: config.background.clone(),
            config,
            layers: [Layer::new(layer_a), Layer::new(layer_b)],
            audio,
            active_layer: LayerId::A,
            current_item: None,
            active_media: None,
            playing: false,
            blanked: false,
            token: PlaybackToken::default(),
            phase: EnginePhase::Idle,
            banner: None,
        })
    }

    /// Initial output: the configured background, if any
    pub fn start(&mut self) -> Reaction {
        let mut reaction = Reaction::default();
        if self.background.is_some() && !self.active().shows_content() {
            self.fall_back(&mut reaction);
        }
        reaction
    }

    /// Dispatch a command from the control surface
    pub fn handle_command(&mut self, cmd: DisplayCommand) -> Reaction {
        match cmd {
            DisplayCommand::ShowItem(item) => self.show_item(item),
            DisplayCommand::Play => self.play(),
            DisplayCommand::Pause => {
                self.pause();
                Reaction::default()
            }
            DisplayCommand::Black => {
                self.black();
                Reaction::default()
            }
            DisplayCommand::Unblack => self.unblack(),
            DisplayCommand::Seek { time } => {
                self.seek(time);
                Reaction::default()
            }
            DisplayCommand::SetRepeat { enabled } => {
                self.set_repeat(enabled);
                Reaction::default()
            }
            DisplayCommand::SetBackground { locator } => self.set_background(locator),
            DisplayCommand::GetBackground => {
                tracing::debug!("get-background reached the display; the relay answers it");
                Reaction::default()
            }
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Replace whatever is shown with `item` (or clear it)
    pub fn show_item(&mut self, item: Option<MediaItem>) -> Reaction {
        let mut reaction = Reaction::default();
        self.token = self.token.next();
        self.banner = None;
        self.halt_media();

        let Some(item) = item else {
            tracing::debug!(token = %self.token, "Item cleared");
            self.current_item = None;
            self.phase = EnginePhase::Idle;
            reaction.events.push(DisplayEvent::progress_reset());
            self.fall_back(&mut reaction);
            return reaction;
        };

        tracing::info!(
            token = %self.token,
            kind = %item.kind,
            source = %item.source,
            "Showing item"
        );

        let token = self.token;
        let target = self.active_layer.other();
        self.layers[target.index()].reset();

        match item.kind {
            MediaKind::Unsupported => {
                self.reject_unsupported(item, &mut reaction);
                return reaction;
            }
            MediaKind::Image => {
                let layer = &mut self.layers[target.index()];
                layer.elements.image.load(&item.source, token);
                layer.content = LayerContent::Image(item.source.clone());
                reaction.events.push(DisplayEvent::progress_reset());
            }
            MediaKind::Video => {
                let layer = &mut self.layers[target.index()];
                layer.elements.video.load(&item.source, token);
                layer.elements.video.set_looping(self.repeat);
                layer.content = LayerContent::Video(item.source.clone());
                self.active_media = Some(ElementId::Video(target));
            }
            MediaKind::Audio => {
                self.audio.load(&item.source, token);
                self.audio.set_looping(self.repeat);
                self.active_media = Some(ElementId::Audio);
                if let Some(companion) = item.effective_companion() {
                    let layer = &mut self.layers[target.index()];
                    layer.elements.image.load(companion, token);
                    layer.content = LayerContent::Image(companion.to_string());
                }
            }
        }

        self.current_item = Some(item);
        self.phase = EnginePhase::Preparing;

        if self.layers[target.index()].content == LayerContent::Empty {
            self.fall_back(&mut reaction);
        } else {
            self.promote(target, &mut reaction);
        }

        if let Some(id) = self.active_media {
            self.start_playback(id, &mut reaction);
        }
        reaction
    }

    /// Resume the active media element
    pub fn play(&mut self) -> Reaction {
        let mut reaction = Reaction::default();
        let Some(id) = self.active_media else {
            tracing::debug!("Play ignored, no active media");
            return reaction;
        };
        if let ElementId::Video(layer) = id {
            if !self.layers[layer.index()].visible {
                tracing::debug!("Play ignored, video layer not visible");
                return reaction;
            }
        }
        if self.element(id).source().is_none() {
            tracing::debug!("Play ignored, active element is empty");
            return reaction;
        }
        self.start_playback(id, &mut reaction);
        reaction
    }

    /// Pause both video elements and the audio channel; idempotent
    pub fn pause(&mut self) {
        for layer in &mut self.layers {
            layer.elements.video.pause();
        }
        self.audio.pause();
        self.playing = false;
    }

    /// Blank the output and pause playback
    pub fn black(&mut self) {
        tracing::info!("Output blanked");
        self.pause();
        self.blanked = true;
    }

    /// Lift blackout; fall back if nothing visual remains
    pub fn unblack(&mut self) -> Reaction {
        tracing::info!("Output unblanked");
        let mut reaction = Reaction::default();
        self.blanked = false;
        if !self.active().shows_content() {
            self.fall_back(&mut reaction);
        }
        reaction
    }

    /// Seek the active media, clamped to `[0, duration]`
    ///
    /// Returns the position actually applied, or `None` when the request was
    /// dropped (no active media, non-finite time, element refused).
    pub fn seek(&mut self, time: f64) -> Option<f64> {
        if !time.is_finite() {
            tracing::warn!(time, "Seek ignored, time is not finite");
            return None;
        }
        let Some(id) = self.active_media else {
            tracing::debug!("Seek ignored, no active media");
            return None;
        };
        let element = self.element_mut(id);
        let mut target = time.max(0.0);
        if let Some(duration) = element.duration().filter(|d| d.is_finite() && *d > 0.0) {
            target = target.min(duration);
        }
        match element.seek(target) {
            Ok(()) => Some(target),
            Err(e) => {
                tracing::warn!(error = %e, "Seek failed");
                None
            }
        }
    }

    /// Set the repeat flag and apply it to the active element
    pub fn set_repeat(&mut self, enabled: bool) {
        self.repeat = enabled;
        if let Some(id) = self.active_media {
            self.element_mut(id).set_looping(enabled);
        }
    }

    /// Change (or clear) the background image
    pub fn set_background(&mut self, locator: Option<String>) -> Reaction {
        let mut reaction = Reaction::default();
        let locator = locator.filter(|l| !l.trim().is_empty());
        let active = self.active();
        let showing_background = active.shows_background();
        let showing_anything = active.shows_content();
        let unchanged = showing_background
            && locator
                .as_ref()
                .is_some_and(|l| active.content == LayerContent::Background(l.clone()));

        let has_background = locator.is_some();
        self.background = locator;
        if has_background {
            if !self.blanked && !unchanged && (!showing_anything || showing_background) {
                self.fall_back(&mut reaction);
            }
        } else if showing_background {
            self.hide_active(&mut reaction);
        }
        reaction
    }

    // ========================================================================
    // Signals and timers
    // ========================================================================

    /// React to a notification from an element
    pub fn handle_signal(&mut self, signal: ElementSignal) -> Reaction {
        let mut reaction = Reaction::default();
        if signal.token != self.token {
            tracing::trace!(
                element = %signal.element,
                token = %signal.token,
                current = %self.token,
                "Stale element signal ignored"
            );
            return reaction;
        }

        let is_active = self.active_media == Some(signal.element);
        match signal.kind {
            SignalKind::Ready => {
                if self.phase == EnginePhase::Preparing && self.carries_item(signal.element) {
                    self.phase = EnginePhase::Showing;
                }
            }
            SignalKind::MetadataLoaded | SignalKind::DurationChange | SignalKind::TimeUpdate => {
                if is_active {
                    reaction.events.push(self.progress());
                }
            }
            SignalKind::Ended => {
                if is_active {
                    self.on_ended(&mut reaction);
                }
            }
            SignalKind::Error(message) => {
                if self.carries_item(signal.element) {
                    self.fail_load(message, &mut reaction);
                } else {
                    self.fail_background(signal.element, message, &mut reaction);
                }
            }
            SignalKind::PlayRejected(message) => {
                if is_active {
                    self.playing = false;
                    self.report_play_failure(message, &mut reaction);
                }
            }
        }
        reaction
    }

    /// Run an expired timer
    pub fn handle_timer(&mut self, task: TimerTask) -> Reaction {
        let mut reaction = Reaction::default();
        if task.token != self.token {
            tracing::trace!(kind = ?task.kind, token = %task.token, "Stale timer ignored");
            return reaction;
        }

        match task.kind {
            TimerKind::Teardown(layer) => {
                let layer_state = &mut self.layers[layer.index()];
                if !layer_state.visible {
                    layer_state.reset();
                    tracing::debug!(layer = ?layer, "Layer torn down");
                }
            }
            TimerKind::EndedFallback => {
                if self.active_media.take() == Some(ElementId::Audio) {
                    self.audio.release();
                }
                if !self.active().shows_background() {
                    self.fall_back(&mut reaction);
                }
            }
        }
        reaction
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Observable output
    #[must_use]
    pub fn presentation(&self) -> Presentation {
        let active = self.active();
        let visible = if !self.blanked && active.shows_content() {
            Visible::Layer {
                layer: self.active_layer,
                content: active.content.clone(),
            }
        } else {
            Visible::Blackout
        };
        let audio = if self.active_media == Some(ElementId::Audio) {
            self.audio.source()
        } else {
            None
        };
        Presentation {
            visible,
            banner: self.banner.clone(),
            phase: self.phase,
            playing: self.playing,
            audio,
        }
    }

    /// Current playback token
    #[must_use]
    pub fn token(&self) -> PlaybackToken {
        self.token
    }

    /// Item lifecycle
    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Item being shown
    #[must_use]
    pub fn current_item(&self) -> Option<&MediaItem> {
        self.current_item.as_ref()
    }

    /// Most recently promoted layer
    #[must_use]
    pub fn active_layer(&self) -> LayerId {
        self.active_layer
    }

    /// Element playing timed media
    #[must_use]
    pub fn active_media(&self) -> Option<ElementId> {
        self.active_media
    }

    /// Whether timed media is playing
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether output is blanked
    #[must_use]
    pub fn is_blanked(&self) -> bool {
        self.blanked
    }

    /// Repeat flag
    #[must_use]
    pub fn repeat(&self) -> bool {
        self.repeat
    }

    /// Configured background
    #[must_use]
    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    /// Content of a layer
    #[must_use]
    pub fn layer_content(&self, layer: LayerId) -> &LayerContent {
        &self.layers[layer.index()].content
    }

    /// Whether a layer is the visible one
    #[must_use]
    pub fn is_layer_visible(&self, layer: LayerId) -> bool {
        self.layers[layer.index()].visible
    }

    /// Borrow an element
    #[must_use]
    pub fn element(&self, id: ElementId) -> &E {
        match id {
            ElementId::Image(layer) => &self.layers[layer.index()].elements.image,
            ElementId::Video(layer) => &self.layers[layer.index()].elements.video,
            ElementId::Audio => &self.audio,
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn element_mut(&mut self, id: ElementId) -> &mut E {
        match id {
            ElementId::Image(layer) => &mut self.layers[layer.index()].elements.image,
            ElementId::Video(layer) => &mut self.layers[layer.index()].elements.video,
            ElementId::Audio => &mut self.audio,
        }
    }

    fn active(&self) -> &Layer<E> {
        &self.layers[self.active_layer.index()]
    }

    /// Pause everything timed and detach the active media
    fn halt_media(&mut self) {
        self.pause();
        self.audio.release();
        self.active_media = None;
    }

    fn carries_item(&self, id: ElementId) -> bool {
        match id {
            ElementId::Image(layer) => {
                matches!(self.layers[layer.index()].content, LayerContent::Image(_))
            }
            ElementId::Video(_) | ElementId::Audio => self.active_media == Some(id),
        }
    }

    fn schedule(&self, kind: TimerKind, reaction: &mut Reaction) {
        reaction.timers.push(ScheduledTimer {
            delay: self.config.swap_delay(),
            task: TimerTask {
                token: self.token,
                kind,
            },
        });
    }

    /// Make `target` the visible layer and schedule teardown of the other
    fn promote(&mut self, target: LayerId, reaction: &mut Reaction) {
        let previous = self.active_layer;
        self.layers[target.index()].visible = true;
        self.active_layer = target;
        if previous != target {
            self.layers[previous.index()].visible = false;
            self.schedule(TimerKind::Teardown(previous), reaction);
        }
    }

    fn hide_active(&mut self, reaction: &mut Reaction) {
        let active = self.active_layer;
        let layer = &mut self.layers[active.index()];
        if layer.visible {
            layer.visible = false;
            self.schedule(TimerKind::Teardown(active), reaction);
        }
    }

    /// Background if configured and not blanked, blackout otherwise
    fn fall_back(&mut self, reaction: &mut Reaction) {
        match self.background.clone() {
            Some(background) if !self.blanked => {
                let target = self.active_layer.other();
                let layer = &mut self.layers[target.index()];
                layer.reset();
                layer.elements.image.load(&background, self.token);
                layer.content = LayerContent::Background(background);
                self.promote(target, reaction);
            }
            _ => self.hide_active(reaction),
        }
    }

    fn start_playback(&mut self, id: ElementId, reaction: &mut Reaction) {
        match self.element_mut(id).play() {
            Ok(()) => self.playing = true,
            Err(e) => {
                self.playing = false;
                self.report_play_failure(e.to_string(), reaction);
            }
        }
    }

    fn report_play_failure(&self, message: String, reaction: &mut Reaction) {
        tracing::warn!(error = %message, "Playback could not start");
        reaction.events.push(DisplayEvent::Error {
            message,
            item: self.current_item.clone(),
        });
    }

    fn progress(&self) -> DisplayEvent {
        match self.active_media {
            Some(id) => {
                let element = self.element(id);
                DisplayEvent::PlaybackProgress {
                    current_time: element.current_time(),
                    duration: element
                        .duration()
                        .filter(|d| d.is_finite())
                        .unwrap_or(0.0),
                }
            }
            None => DisplayEvent::progress_reset(),
        }
    }

    fn on_ended(&mut self, reaction: &mut Reaction) {
        if self.repeat {
            if let Some(id) = self.active_media {
                if let Err(e) = self.element_mut(id).seek(0.0) {
                    tracing::warn!(error = %e, "Rewind for repeat failed");
                }
                self.start_playback(id, reaction);
            }
            return;
        }
        tracing::info!(token = %self.token, "Playback ended");
        self.playing = false;
        reaction.events.push(DisplayEvent::Ended);
        self.schedule(TimerKind::EndedFallback, reaction);
    }

    fn reject_unsupported(&mut self, item: MediaItem, reaction: &mut Reaction) {
        let message = format!("Unsupported media type: {}", item.display_name);
        tracing::warn!(source = %item.source, "{message}");
        self.current_item = None;
        self.phase = EnginePhase::Idle;
        self.hide_active(reaction);
        self.banner = Some(message.clone());
        reaction.events.push(DisplayEvent::Error {
            message,
            item: Some(item),
        });
    }

    /// Item failed to load: stop everything and black out
    fn fail_load(&mut self, message: String, reaction: &mut Reaction) {
        tracing::error!(error = %message, "Media failed to load");
        // Anything scheduled for the broken item is void
        self.token = self.token.next();
        for layer in &mut self.layers {
            layer.reset();
        }
        self.audio.pause();
        self.audio.release();
        self.active_media = None;
        self.playing = false;
        self.phase = EnginePhase::Idle;
        self.banner = Some(message.clone());
        reaction.events.push(DisplayEvent::Error {
            message,
            item: self.current_item.take(),
        });
        reaction.events.push(DisplayEvent::progress_reset());
    }

    fn fail_background(&mut self, element: ElementId, message: String, reaction: &mut Reaction) {
        tracing::warn!(element = %element, error = %message, "Background failed to load");
        if let ElementId::Image(layer) = element {
            if layer == self.active_layer {
                self.hide_active(reaction);
            }
        }
        reaction.events.push(DisplayEvent::Error {
            message,
            item: None,
        });
    }
}
