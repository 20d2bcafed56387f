//! Headless Media Elements
//!
//! Simulated image/video/audio elements for running the display without a
//! renderer: tests, the relay binary, rehearsals on a machine without a
//! screen. Timed media advances on a virtual clock ([`HeadlessBackend::tick`])
//! so behavior is deterministic under test and real-time under
//! [`HeadlessBackend::spawn_clock`].
//!
//! Signals are delivered on an unbounded channel; element notifications are
//! never dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::element::{
    ElementError, ElementId, ElementSignal, LayerElements, LayerId, MediaElement, PlaybackToken,
    RenderTargets, SignalKind,
};

/// Duration given to timed media with no explicit entry
pub const DEFAULT_MEDIA_DURATION: f64 = 30.0;

/// Observable state of one headless element
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadlessSnapshot {
    /// Loaded source
    pub source: Option<String>,
    /// Token of the current load
    pub token: PlaybackToken,
    /// Position in seconds
    pub current_time: f64,
    /// Duration of timed media
    pub duration: Option<f64>,
    /// Paused (or empty)
    pub paused: bool,
    /// Loops on end
    pub looping: bool,
    /// Reached natural end
    pub ended: bool,
}

/// How headless elements answer `play`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayRejection {
    /// Play always starts
    #[default]
    Never,
    /// `play` returns an error
    Immediate,
    /// `play` is accepted, then a `PlayRejected` signal follows
    Deferred,
}

#[derive(Debug)]
struct MediaTable {
    durations: HashMap<String, f64>,
    default_duration: f64,
    failing: HashSet<String>,
    play_rejection: PlayRejection,
}

#[derive(Debug)]
struct Registered {
    id: ElementId,
    timed: bool,
    state: Arc<Mutex<HeadlessSnapshot>>,
}

/// Factory and clock for headless elements
#[derive(Clone, Debug)]
pub struct HeadlessBackend {
    table: Arc<Mutex<MediaTable>>,
    elements: Arc<Mutex<Vec<Registered>>>,
    signals: mpsc::UnboundedSender<ElementSignal>,
}

impl HeadlessBackend {
    /// Create a backend and the receiver its elements signal on
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ElementSignal>) {
        let (signals, rx) = mpsc::unbounded_channel();
        let backend = Self {
            table: Arc::new(Mutex::new(MediaTable {
                durations: HashMap::new(),
                default_duration: DEFAULT_MEDIA_DURATION,
                failing: HashSet::new(),
                play_rejection: PlayRejection::Never,
            })),
            elements: Arc::new(Mutex::new(Vec::new())),
            signals,
        };
        (backend, rx)
    }

    /// Duration for timed sources without an explicit entry
    pub fn set_default_duration(&self, seconds: f64) {
        self.table.lock().default_duration = seconds;
    }

    /// Duration for one source
    pub fn set_duration(&self, source: &str, seconds: f64) {
        self.table.lock().durations.insert(source.to_string(), seconds);
    }

    /// Make loads of `source` fail with a decode error
    pub fn fail_source(&self, source: &str) {
        self.table.lock().failing.insert(source.to_string());
    }

    /// Refuse play requests (autoplay policy)
    pub fn set_play_rejection(&self, rejection: PlayRejection) {
        self.table.lock().play_rejection = rejection;
    }

    /// Elements for one display engine
    #[must_use]
    pub fn render_targets(&self) -> RenderTargets<HeadlessElement> {
        let layer = |id: LayerId| LayerElements {
            image: self.element(ElementId::Image(id), false),
            video: self.element(ElementId::Video(id), true),
        };
        RenderTargets::complete(
            layer(LayerId::A),
            layer(LayerId::B),
            self.element(ElementId::Audio, true),
        )
    }

    /// State of the most recently created element with this id
    #[must_use]
    pub fn snapshot(&self, id: ElementId) -> Option<HeadlessSnapshot> {
        self.elements
            .lock()
            .iter()
            .rev()
            .find(|e| e.id == id)
            .map(|e| e.state.lock().clone())
    }

    /// Advance every playing timed element by `elapsed` seconds
    pub fn tick(&self, elapsed: f64) {
        for registered in self.elements.lock().iter() {
            if !registered.timed {
                continue;
            }
            let mut state = registered.state.lock();
            if state.source.is_none() || state.paused || state.ended {
                continue;
            }
            let duration = state.duration.unwrap_or(f64::INFINITY);
            state.current_time += elapsed;

            if state.current_time >= duration {
                if state.looping && duration > 0.0 {
                    state.current_time %= duration;
                } else {
                    state.current_time = duration;
                    state.paused = true;
                    state.ended = true;
                }
            }
            self.emit(registered.id, state.token, SignalKind::TimeUpdate);
            if state.ended {
                self.emit(registered.id, state.token, SignalKind::Ended);
            }
        }
    }

    /// Tick in real time until the signal receiver is dropped
    pub fn spawn_clock(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let backend = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            while !backend.signals.is_closed() {
                ticker.tick().await;
                backend.tick(period.as_secs_f64());
            }
            tracing::debug!("Headless clock stopped");
        })
    }

    fn element(&self, id: ElementId, timed: bool) -> HeadlessElement {
        let state = Arc::new(Mutex::new(HeadlessSnapshot {
            paused: true,
            ..HeadlessSnapshot::default()
        }));
        self.elements.lock().push(Registered {
            id,
            timed,
            state: Arc::clone(&state),
        });
        HeadlessElement {
            id,
            timed,
            state,
            backend: self.clone(),
        }
    }

    fn emit(&self, element: ElementId, token: PlaybackToken, kind: SignalKind) {
        // Receiver gone means the runtime stopped
        let _ = self.signals.send(ElementSignal {
            element,
            token,
            kind,
        });
    }
}

/// One simulated element
#[derive(Debug)]
pub struct HeadlessElement {
    id: ElementId,
    timed: bool,
    state: Arc<Mutex<HeadlessSnapshot>>,
    backend: HeadlessBackend,
}

impl HeadlessElement {
    /// Copy of the element's state
    #[must_use]
    pub fn snapshot(&self) -> HeadlessSnapshot {
        self.state.lock().clone()
    }
}

impl MediaElement for HeadlessElement {
    fn load(&mut self, source: &str, token: PlaybackToken) {
        let (failing, duration) = {
            let table = self.backend.table.lock();
            let duration = self
                .timed
                .then(|| table.durations.get(source).copied().unwrap_or(table.default_duration));
            (table.failing.contains(source), duration)
        };

        {
            let mut state = self.state.lock();
            let looping = state.looping;
            *state = HeadlessSnapshot {
                source: Some(source.to_string()),
                token,
                current_time: 0.0,
                duration: if failing { None } else { duration },
                paused: true,
                looping,
                ended: false,
            };
        }

        if failing {
            self.backend.emit(
                self.id,
                token,
                SignalKind::Error(format!("Failed to decode {source}")),
            );
            return;
        }
        if self.timed {
            self.backend.emit(self.id, token, SignalKind::MetadataLoaded);
            self.backend.emit(self.id, token, SignalKind::DurationChange);
        }
        self.backend.emit(self.id, token, SignalKind::Ready);
    }

    fn release(&mut self) {
        let mut state = self.state.lock();
        let looping = state.looping;
        *state = HeadlessSnapshot {
            paused: true,
            looping,
            ..HeadlessSnapshot::default()
        };
    }

    fn play(&mut self) -> Result<(), ElementError> {
        let rejection = self.backend.table.lock().play_rejection;
        if rejection == PlayRejection::Immediate {
            return Err(ElementError::PlayRejected("autoplay blocked".to_string()));
        }
        let mut state = self.state.lock();
        if state.source.is_none() {
            return Err(ElementError::NoSource);
        }
        if rejection == PlayRejection::Deferred {
            let token = state.token;
            drop(state);
            self.backend.emit(
                self.id,
                token,
                SignalKind::PlayRejected("autoplay blocked".to_string()),
            );
            return Ok(());
        }
        if state.ended {
            state.ended = false;
            state.current_time = 0.0;
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().paused = true;
    }

    fn seek(&mut self, time: f64) -> Result<(), ElementError> {
        let mut state = self.state.lock();
        if state.source.is_none() {
            return Err(ElementError::NoSource);
        }
        if !self.timed {
            return Err(ElementError::SeekFailed("element is not seekable".to_string()));
        }
        state.current_time = time;
        state.ended = false;
        Ok(())
    }

    fn set_looping(&mut self, looping: bool) {
        self.state.lock().looping = looping;
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn source(&self) -> Option<String> {
        self.state.lock().source.clone()
    }

    fn is_paused(&self) -> bool {
        let state = self.state.lock();
        state.source.is_none() || state.paused
    }
}
