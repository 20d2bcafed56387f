//! Catalog and slot state machine

use crate::events::DisplayEvent;
use crate::media::{MediaId, MediaItem, MediaKind};
use crate::messages::DisplayCommand;

use super::{PreviewAudioPolicy, StagingConfig, StagingError};

/// A clearable staging slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Operator monitor
    Preview,
    /// Queued after Preview
    NextUp,
}

/// Result of [`StagingPipeline::add_items`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddReport {
    /// Ids of accepted items, in input order
    pub added: Vec<MediaId>,
    /// Locators with unrecognized extensions
    pub rejected: usize,
    /// Item auto-staged into Next-Up, if any
    pub staged: Option<MediaId>,
}

/// What the display last reported
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackStatus {
    /// Position of the Program item
    pub current_time: f64,
    /// Duration of the Program item (0 when unknown or untimed)
    pub duration: f64,
    /// Most recent error message
    pub last_error: Option<String>,
    /// Number of `ended` events seen
    pub ended_count: u64,
}

/// How the Preview slot is rendered on the operator monitor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreviewMonitor<'a> {
    /// Item in Preview
    pub item: &'a MediaItem,
    /// Whether its audio is muted
    pub muted: bool,
}

/// Catalog plus Preview / Next-Up / Program slots
#[derive(Debug, Default)]
pub struct StagingPipeline {
    config: StagingConfig,
    catalog: Vec<MediaItem>,
    next_up: Option<MediaId>,
    preview: Option<MediaId>,
    program: Option<MediaItem>,
    repeat: bool,
    background: Option<String>,
    status: PlaybackStatus,
}

impl StagingPipeline {
    /// Empty pipeline
    #[must_use]
    pub fn new(config: StagingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Classify and append locators; auto-stage when nothing is staged
    pub fn add_items<I, S>(&mut self, locators: I) -> AddReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = AddReport::default();
        for locator in locators {
            let locator = locator.as_ref();
            match MediaItem::from_locator(locator) {
                Some(item) => {
                    report.added.push(item.id.clone());
                    self.catalog.push(item);
                }
                None => {
                    tracing::debug!(locator, "Rejected unrecognized media");
                    report.rejected += 1;
                }
            }
        }

        if self.next_up.is_none() && self.preview.is_none() {
            if let Some(first) = report.added.first() {
                self.next_up = Some(first.clone());
                report.staged = Some(first.clone());
            }
        }

        tracing::info!(
            added = report.added.len(),
            rejected = report.rejected,
            "Catalog updated"
        );
        report
    }

    /// Move a catalog entry; slots are untouched
    ///
    /// # Errors
    ///
    /// [`StagingError::OutOfRange`] when either position is invalid.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), StagingError> {
        let len = self.catalog.len();
        for index in [from, to] {
            if index >= len {
                return Err(StagingError::OutOfRange { index, len });
            }
        }
        let item = self.catalog.remove(from);
        self.catalog.insert(to, item);
        Ok(())
    }

    /// Remove entries; removed ids vacate Preview and Next-Up
    ///
    /// Returns how many entries were removed. Program is left alone since it
    /// reflects what is on air.
    pub fn remove_selected(&mut self, ids: &[MediaId]) -> usize {
        let before = self.catalog.len();
        self.catalog.retain(|item| !ids.contains(&item.id));

        for slot in [&mut self.preview, &mut self.next_up] {
            if slot.as_ref().is_some_and(|id| ids.contains(id)) {
                *slot = None;
            }
        }
        before - self.catalog.len()
    }

    /// Attach a companion image to an audio item
    ///
    /// # Errors
    ///
    /// [`StagingError::UnknownItem`] or [`StagingError::NotAudio`].
    pub fn attach_companion_image(
        &mut self,
        id: &MediaId,
        locator: impl Into<String>,
    ) -> Result<(), StagingError> {
        let item = self
            .catalog
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| StagingError::UnknownItem(id.clone()))?;
        if item.kind != MediaKind::Audio {
            return Err(StagingError::NotAudio {
                id: id.clone(),
                kind: item.kind,
            });
        }
        item.companion_image = Some(locator.into());
        Ok(())
    }

    // ========================================================================
    // Slots
    // ========================================================================

    /// Put an item into Next-Up
    ///
    /// # Errors
    ///
    /// [`StagingError::UnknownItem`]; Next-Up is cleared in that case.
    pub fn stage(&mut self, id: &MediaId) -> Result<(), StagingError> {
        if self.find(id).is_none() {
            self.next_up = None;
            tracing::warn!(item = %id, "Stage of unknown item cleared Next-Up");
            return Err(StagingError::UnknownItem(id.clone()));
        }
        self.next_up = Some(id.clone());
        Ok(())
    }

    /// Put an item into Preview
    ///
    /// # Errors
    ///
    /// [`StagingError::UnknownItem`]; state is unchanged in that case.
    pub fn preview(&mut self, id: &MediaId) -> Result<(), StagingError> {
        if self.find(id).is_none() {
            tracing::warn!(item = %id, "Preview of unknown item ignored");
            return Err(StagingError::UnknownItem(id.clone()));
        }
        self.preview = Some(id.clone());
        Ok(())
    }

    /// Empty one slot
    pub fn clear_slot(&mut self, slot: Slot) {
        match slot {
            Slot::Preview => self.preview = None,
            Slot::NextUp => self.next_up = None,
        }
    }

    /// Go live with Preview (or Next-Up when Preview is empty)
    ///
    /// Returns the commands for the display: `show-item` then `play`.
    ///
    /// # Errors
    ///
    /// [`StagingError::NothingStaged`] when both slots are empty.
    pub fn push(&mut self) -> Result<Vec<DisplayCommand>, StagingError> {
        let (item, backfill) = if let Some(id) = &self.preview {
            (self.lookup(id)?, true)
        } else if let Some(id) = &self.next_up {
            (self.lookup(id)?, false)
        } else {
            tracing::warn!("Push with nothing staged");
            return Err(StagingError::NothingStaged);
        };

        // Nothing below can fail, so the transition is all-or-nothing
        if backfill {
            self.preview = self.next_up.take();
        } else {
            self.next_up = None;
        }
        tracing::info!(item = %item.id, name = %item.display_name, "Pushed to program");
        self.program = Some(item.clone());
        self.status.current_time = 0.0;
        self.status.duration = 0.0;
        self.status.last_error = None;

        Ok(vec![DisplayCommand::ShowItem(Some(item)), DisplayCommand::Play])
    }

    /// Push the catalog entry after Program (or the first one)
    ///
    /// # Errors
    ///
    /// [`StagingError::EndOfCatalog`] when Program is the last entry.
    pub fn next(&mut self) -> Result<Vec<DisplayCommand>, StagingError> {
        let target = match self.program_position() {
            Some(position) => position + 1,
            None => 0,
        };
        self.cue_and_push(target, "next")
    }

    /// Push the catalog entry before Program
    ///
    /// # Errors
    ///
    /// [`StagingError::EndOfCatalog`] when Program is the first entry (or
    /// not in the catalog).
    pub fn previous(&mut self) -> Result<Vec<DisplayCommand>, StagingError> {
        match self.program_position() {
            Some(position) if position > 0 => self.cue_and_push(position - 1, "previous"),
            _ => Err(StagingError::EndOfCatalog("previous")),
        }
    }

    // ========================================================================
    // Transport pass-throughs
    // ========================================================================

    /// Resume playback, when something is on air
    #[must_use]
    pub fn play(&self) -> Option<DisplayCommand> {
        self.program.as_ref().map(|_| DisplayCommand::Play)
    }

    /// Pause playback
    #[must_use]
    pub fn pause(&self) -> DisplayCommand {
        DisplayCommand::Pause
    }

    /// Blank the output
    #[must_use]
    pub fn black(&self) -> DisplayCommand {
        DisplayCommand::Black
    }

    /// Lift blackout
    #[must_use]
    pub fn unblack(&self) -> DisplayCommand {
        DisplayCommand::Unblack
    }

    /// Seek the Program item
    #[must_use]
    pub fn seek(&self, time: f64) -> DisplayCommand {
        DisplayCommand::Seek { time }
    }

    /// Toggle repeat
    pub fn set_repeat(&mut self, enabled: bool) -> DisplayCommand {
        self.repeat = enabled;
        DisplayCommand::SetRepeat { enabled }
    }

    /// Set or clear the background image
    pub fn set_background(&mut self, locator: Option<String>) -> DisplayCommand {
        self.background.clone_from(&locator);
        DisplayCommand::SetBackground { locator }
    }

    // ========================================================================
    // Display feedback
    // ========================================================================

    /// Absorb an event from the display
    ///
    /// Returns commands to send in response (auto-advance).
    pub fn handle_display_event(&mut self, event: DisplayEvent) -> Vec<DisplayCommand> {
        match event {
            DisplayEvent::PlaybackProgress {
                current_time,
                duration,
            } => {
                tracing::trace!(current_time, duration, "Progress");
                self.status.current_time = current_time;
                self.status.duration = duration;
                Vec::new()
            }
            DisplayEvent::Error { message, item } => {
                tracing::error!(
                    error = %message,
                    item = ?item.as_ref().map(|i| &i.display_name),
                    "Display reported an error"
                );
                self.status.last_error = Some(message);
                Vec::new()
            }
            DisplayEvent::Ended => {
                self.status.ended_count += 1;
                if !self.config.auto_advance {
                    return Vec::new();
                }
                match self.push() {
                    Ok(commands) => commands,
                    Err(e) => {
                        tracing::info!(reason = %e, "Auto-advance stopped");
                        Vec::new()
                    }
                }
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// All catalog entries in order
    #[must_use]
    pub fn catalog(&self) -> &[MediaItem] {
        &self.catalog
    }

    /// Catalog entry by id
    #[must_use]
    pub fn find(&self, id: &MediaId) -> Option<&MediaItem> {
        self.catalog.iter().find(|item| &item.id == id)
    }

    /// Item in Next-Up
    #[must_use]
    pub fn next_up(&self) -> Option<&MediaItem> {
        self.next_up.as_ref().and_then(|id| self.find(id))
    }

    /// Item in Preview
    #[must_use]
    pub fn preview_item(&self) -> Option<&MediaItem> {
        self.preview.as_ref().and_then(|id| self.find(id))
    }

    /// Item on air, as far as the pipeline knows
    #[must_use]
    pub fn program(&self) -> Option<&MediaItem> {
        self.program.as_ref()
    }

    /// Preview as the operator monitor should render it
    #[must_use]
    pub fn preview_monitor(&self) -> Option<PreviewMonitor<'_>> {
        self.preview_item().map(|item| PreviewMonitor {
            item,
            muted: self.config.preview_audio == PreviewAudioPolicy::Muted,
        })
    }

    /// Last reported playback status
    #[must_use]
    pub fn status(&self) -> &PlaybackStatus {
        &self.status
    }

    /// Repeat flag last sent
    #[must_use]
    pub fn repeat(&self) -> bool {
        self.repeat
    }

    /// Background last sent
    #[must_use]
    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    /// Staging behavior
    #[must_use]
    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    fn lookup(&self, id: &MediaId) -> Result<MediaItem, StagingError> {
        self.find(id)
            .cloned()
            .ok_or_else(|| StagingError::UnknownItem(id.clone()))
    }

    fn program_position(&self) -> Option<usize> {
        let program = self.program.as_ref()?;
        self.catalog.iter().position(|item| item.id == program.id)
    }

    fn cue_and_push(
        &mut self,
        position: usize,
        direction: &'static str,
    ) -> Result<Vec<DisplayCommand>, StagingError> {
        let id = self
            .catalog
            .get(position)
            .map(|item| item.id.clone())
            .ok_or(StagingError::EndOfCatalog(direction))?;
        self.preview = Some(id);
        self.push()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pipeline() -> StagingPipeline {
        StagingPipeline::new(StagingConfig::default())
    }

    fn ids(p: &StagingPipeline) -> Vec<String> {
        p.catalog().iter().map(|i| i.display_name.clone()).collect()
    }

    #[test]
    fn test_add_items_classifies_and_auto_stages() {
        let mut p = pipeline();
        let report = p.add_items(["/m/intro.mp4", "/m/notes.txt", "/m/logo.PNG"]);

        assert_eq!(report.added.len(), 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.staged.as_ref(), Some(&report.added[0]));
        assert_eq!(p.next_up().map(|i| i.kind), Some(MediaKind::Video));
        assert_eq!(p.catalog()[1].kind, MediaKind::Image);

        // Something staged already: no auto-stage
        let second = p.add_items(["/m/song.mp3"]);
        assert_eq!(second.staged, None);
        assert_eq!(p.next_up().map(|i| i.display_name.as_str()), Some("intro.mp4"));
    }

    #[test]
    fn test_stage_push_intro() {
        let mut p = pipeline();
        let report = p.add_items(["intro.mp4"]);
        let id = report.added[0].clone();
        p.stage(&id).unwrap();

        let commands = p.push().unwrap();
        let intro = p.find(&id).unwrap().clone();

        assert_eq!(
            commands,
            vec![DisplayCommand::ShowItem(Some(intro.clone())), DisplayCommand::Play]
        );
        assert_eq!(p.program(), Some(&intro));
        assert!(p.next_up().is_none());
        assert!(p.preview_item().is_none());
    }

    #[test]
    fn test_push_backfills_preview_from_next_up() {
        let mut p = pipeline();
        let added = p.add_items(["a.png", "b.png", "c.png"]).added;
        p.preview(&added[1]).unwrap();
        p.stage(&added[2]).unwrap();

        p.push().unwrap();

        assert_eq!(p.program().map(|i| &i.id), Some(&added[1]));
        assert_eq!(p.preview_item().map(|i| &i.id), Some(&added[2]));
        assert!(p.next_up().is_none());
    }

    #[test]
    fn test_push_with_nothing_staged_fails() {
        let mut p = pipeline();
        assert_eq!(p.push(), Err(StagingError::NothingStaged));
        assert!(p.program().is_none());
    }

    #[test]
    fn test_stage_unknown_clears_next_up() {
        let mut p = pipeline();
        p.add_items(["a.png"]);
        assert!(p.next_up().is_some());

        let bogus = MediaId::new("missing");
        assert_eq!(p.stage(&bogus), Err(StagingError::UnknownItem(bogus.clone())));
        assert!(p.next_up().is_none());
    }

    #[test]
    fn test_preview_unknown_leaves_state() {
        let mut p = pipeline();
        let added = p.add_items(["a.png", "b.png"]).added;
        p.preview(&added[1]).unwrap();

        assert!(p.preview(&MediaId::new("missing")).is_err());
        assert_eq!(p.preview_item().map(|i| &i.id), Some(&added[1]));
    }

    #[test]
    fn test_program_only_changes_on_push() {
        let mut p = pipeline();
        let added = p.add_items(["a.png", "b.mp4"]).added;
        p.stage(&added[0]).unwrap();
        p.preview(&added[1]).unwrap();
        p.clear_slot(Slot::NextUp);
        p.reorder(0, 1).unwrap();
        let _ = p.set_repeat(true);
        let _ = p.handle_display_event(DisplayEvent::PlaybackProgress {
            current_time: 1.0,
            duration: 2.0,
        });
        assert!(p.program().is_none());
    }

    #[test]
    fn test_add_then_remove_restores_catalog() {
        let mut p = pipeline();
        p.add_items(["a.png"]);
        let before = ids(&p);

        let added = p.add_items(["b.mp4"]).added;
        p.preview(&added[0]).unwrap();
        p.stage(&added[0]).unwrap();

        assert_eq!(p.remove_selected(&added), 1);
        assert_eq!(ids(&p), before);
        assert!(p.preview_item().is_none());
        assert!(p.next_up().is_none());
    }

    #[test]
    fn test_reorder_keeps_slots() {
        let mut p = pipeline();
        let added = p.add_items(["a.png", "b.png", "c.png"]).added;
        p.preview(&added[2]).unwrap();

        p.reorder(2, 0).unwrap();
        assert_eq!(ids(&p), vec!["c.png", "a.png", "b.png"]);
        assert_eq!(p.preview_item().map(|i| &i.id), Some(&added[2]));
        assert_eq!(p.next_up().map(|i| &i.id), Some(&added[0]));

        assert_eq!(
            p.reorder(0, 3),
            Err(StagingError::OutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_companion_image_only_for_audio() {
        let mut p = pipeline();
        let added = p.add_items(["song.mp3", "clip.mp4"]).added;

        p.attach_companion_image(&added[0], "art.png").unwrap();
        assert_eq!(p.find(&added[0]).unwrap().companion_image.as_deref(), Some("art.png"));

        assert!(matches!(
            p.attach_companion_image(&added[1], "art.png"),
            Err(StagingError::NotAudio {
                kind: MediaKind::Video,
                ..
            })
        ));
    }

    #[test]
    fn test_auto_advance_on_ended() {
        let mut p = pipeline();
        let added = p.add_items(["a.mp4", "b.mp4"]).added;
        p.push().unwrap();
        p.stage(&added[1]).unwrap();

        let commands = p.handle_display_event(DisplayEvent::Ended);
        assert_eq!(commands.len(), 2);
        assert_eq!(p.program().map(|i| &i.id), Some(&added[1]));
        assert_eq!(p.status().ended_count, 1);

        // Nothing left to push: auto-advance stops quietly
        assert!(p.handle_display_event(DisplayEvent::Ended).is_empty());
        assert_eq!(p.program().map(|i| &i.id), Some(&added[1]));
    }

    #[test]
    fn test_auto_advance_disabled() {
        let mut p = StagingPipeline::new(StagingConfig {
            auto_advance: false,
            ..StagingConfig::default()
        });
        p.add_items(["a.mp4", "b.mp4"]);
        p.push().unwrap();
        assert!(p.handle_display_event(DisplayEvent::Ended).is_empty());
    }

    #[test]
    fn test_error_event_keeps_program() {
        let mut p = pipeline();
        p.add_items(["a.mp4"]);
        p.push().unwrap();
        let program = p.program().cloned();

        let _ = p.handle_display_event(DisplayEvent::Error {
            message: "decode failed".into(),
            item: program.clone(),
        });
        assert_eq!(p.program().cloned(), program);
        assert_eq!(p.status().last_error.as_deref(), Some("decode failed"));
    }

    #[test]
    fn test_next_and_previous_navigation() {
        let mut p = pipeline();
        let added = p.add_items(["a.png", "b.png", "c.png"]).added;
        p.clear_slot(Slot::NextUp);

        p.next().unwrap();
        assert_eq!(p.program().map(|i| &i.id), Some(&added[0]));
        p.next().unwrap();
        p.next().unwrap();
        assert_eq!(p.program().map(|i| &i.id), Some(&added[2]));
        assert_eq!(p.next(), Err(StagingError::EndOfCatalog("next")));

        p.previous().unwrap();
        assert_eq!(p.program().map(|i| &i.id), Some(&added[1]));
    }

    #[test]
    fn test_play_requires_program() {
        let mut p = pipeline();
        assert_eq!(p.play(), None);
        p.add_items(["a.mp4"]);
        p.push().unwrap();
        assert_eq!(p.play(), Some(DisplayCommand::Play));
    }

    #[test]
    fn test_preview_monitor_policy() {
        let mut p = StagingPipeline::new(StagingConfig {
            preview_audio: PreviewAudioPolicy::Muted,
            ..StagingConfig::default()
        });
        let added = p.add_items(["song.mp3"]).added;
        assert!(p.preview_monitor().is_none());

        p.preview(&added[0]).unwrap();
        assert!(p.preview_monitor().is_some_and(|m| m.muted));
    }
}
