//! The annotation session state machine.
//!
//! A session walks its image list once, front to back. Each eligible image is
//! decoded, normalised and shown; selections made on it are appended to the
//! annotation map under its identifier. The session ends when the list is
//! exhausted or the host asks it to close, and saves the map either way.

use std::path::{Path, PathBuf};

use crate::brightness::{BrightnessDirection, BrightnessWindow};
use crate::data::{ImageDecoder, PixelGrid};
use crate::error::SessionError;
use crate::format::paths::{parent_dir_name, path_key};
use crate::format::{AnnotationMap, ExportOptions};
use crate::keybindings::KeyBindings;
use crate::model::{Point, Roi, normalize};
use crate::selection::{SelectionAdapter, selector_for};

use super::config::SessionConfig;
use super::events::{EventSource, HostEvent, Poll, PointerEvent};
use super::presenter::Presenter;

// ============================================================================
// States and Commands
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// Every image was handled.
    Exhausted,
    /// The host closed the session early.
    Closed,
}

/// Where a session is in its traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    /// Showing the image at this index.
    Annotating(usize),
    Terminal(TerminalReason),
}

/// An input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    NextImage,
    Save,
    /// Raise the upper brightness level
    BrightnessUp,
    /// Lower the upper brightness level
    BrightnessDown,
    MinUp,
    MinDown,
    Undo,
    SelectShape(Point, Point),
    Close,
}

// ============================================================================
// Session
// ============================================================================

/// One annotation pass over an ordered list of images.
pub struct Session<D: ImageDecoder, P: Presenter> {
    config: SessionConfig,
    identifiers: Vec<String>,
    decoder: D,
    presenter: P,
    bindings: KeyBindings,
    markings: AnnotationMap,
    brightness: BrightnessWindow,
    selector: Box<dyn SelectionAdapter>,
    phase: Phase,
    /// Index of the last image landed on, or the list length once exhausted.
    index: Option<usize>,
    /// Normalised pixels of the current image.
    image: Option<PixelGrid>,
    on_exit: Option<Box<dyn FnOnce()>>,
}

impl<D: ImageDecoder, P: Presenter> Session<D, P> {
    /// Validate the configuration and load any previous markings.
    ///
    /// With a relativization base, identifiers and the base are made
    /// absolute against the working directory, so saved keys join back to
    /// the same identifiers on the next run.
    pub fn new(mut config: SessionConfig, decoder: D, presenter: P) -> Result<Self, SessionError> {
        config.validate()?;
        let identifiers = config.resolve_identifiers()?;
        let markings = config.load_markings()?;

        let already = identifiers
            .iter()
            .filter(|id| markings.contains(id))
            .count();
        log::info!(
            "Session over {} images ({} already annotated), shape: {}",
            identifiers.len(),
            already,
            config.shape_kind
        );

        let brightness = BrightnessWindow::new()
            .with_steps(config.max_level_step, config.min_level_step)
            .with_clipping(config.clipping);

        Ok(Self {
            selector: selector_for(config.shape_kind),
            config,
            identifiers,
            decoder,
            presenter,
            bindings: KeyBindings::default(),
            markings,
            brightness,
            phase: Phase::NotStarted,
            index: None,
            image: None,
            on_exit: None,
        })
    }

    /// Use custom keybindings for [`handle_key`](Self::handle_key).
    pub fn with_keybindings(mut self, bindings: KeyBindings) -> Self {
        for (kept, shadowed) in bindings.conflicts() {
            log::warn!(
                "Key {:?} is bound to both {} and {}, only {} will trigger",
                bindings.key_for(kept),
                kept.name(),
                shadowed.name(),
                kept.name()
            );
        }
        self.bindings = bindings;
        self
    }

    /// Call `callback` once when the session terminates.
    pub fn with_exit_callback(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_exit = Some(Box::new(callback));
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the current image; the list length once exhausted.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Terminal(_))
    }

    /// Identifier of the image being annotated.
    pub fn current_identifier(&self) -> Option<&str> {
        match self.phase {
            Phase::Annotating(i) => self.identifiers.get(i).map(String::as_str),
            _ => None,
        }
    }

    /// The current image and its most recent ROI.
    pub fn current_marking(&self) -> Option<(&str, Roi)> {
        let identifier = self.current_identifier()?;
        let roi = self.markings.get(identifier)?.last().copied()?;
        Some((identifier, roi))
    }

    /// The internal map, keyed by session identifiers.
    pub fn markings(&self) -> &AnnotationMap {
        &self.markings
    }

    /// The map as it is saved, with relativization and identifier dropping.
    pub fn export_view(&self) -> AnnotationMap {
        self.markings.export_view(&self.export_options())
    }

    pub fn brightness(&self) -> &BrightnessWindow {
        &self.brightness
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn save_destination(&self) -> Option<&Path> {
        self.config.save_destination.as_deref()
    }

    /// Change (or disable, with `None`) where markings are saved.
    pub fn set_save_destination(&mut self, destination: Option<PathBuf>) {
        log::debug!("Save destination set to {:?}", destination);
        self.config.save_destination = destination;
    }

    fn export_options(&self) -> ExportOptions {
        self.config.export_options()
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Apply one command.
    pub fn dispatch(&mut self, command: Command) -> Result<(), SessionError> {
        log::debug!("Command: {:?}", command);
        match command {
            Command::NextImage => self.next_image(),
            Command::Save => self.save().map(|_| ()),
            Command::BrightnessUp => {
                self.adjust_brightness(BrightnessDirection::MaxUp);
                Ok(())
            }
            Command::BrightnessDown => {
                self.adjust_brightness(BrightnessDirection::MaxDown);
                Ok(())
            }
            Command::MinUp => {
                self.adjust_brightness(BrightnessDirection::MinUp);
                Ok(())
            }
            Command::MinDown => {
                self.adjust_brightness(BrightnessDirection::MinDown);
                Ok(())
            }
            Command::Undo => {
                self.undo();
                Ok(())
            }
            Command::SelectShape(p0, p1) => {
                self.select_shape(p0, p1);
                Ok(())
            }
            Command::Close => self.request_close(),
        }
    }

    /// Land on the first eligible image, or terminate if there is none.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::NotStarted {
            log::warn!("Session already started");
            return Ok(());
        }
        self.next_image()
    }

    /// Move past the current image to the next eligible one.
    ///
    /// Before the session has started this lands on the first eligible image.
    /// Reaching the end of the list saves the markings and notifies the
    /// presenter. Does nothing once terminal.
    pub fn next_image(&mut self) -> Result<(), SessionError> {
        let from = match self.phase {
            Phase::NotStarted => 0,
            Phase::Annotating(i) => i + 1,
            Phase::Terminal(_) => return Ok(()),
        };

        match (from..self.identifiers.len()).find(|&i| self.is_eligible(i)) {
            Some(i) => self.land(i),
            None => {
                self.index = Some(self.identifiers.len());
                self.finish(TerminalReason::Exhausted)
            }
        }
    }

    /// Whether the image at `i` should be shown.
    ///
    /// Without a reselect set, images already in the map are skipped. With
    /// one, only images whose parent directory name or identifier is in the
    /// set are shown.
    fn is_eligible(&self, i: usize) -> bool {
        let identifier = &self.identifiers[i];
        match &self.config.reselect {
            None => !self.markings.contains(identifier),
            Some(names) => {
                names.contains(identifier)
                    || names.contains(&path_key(&self.config.images[i]))
                    || parent_dir_name(identifier).is_some_and(|name| names.contains(&name))
            }
        }
    }

    /// Show the image at `i`. Nothing changes if it cannot be decoded.
    fn land(&mut self, i: usize) -> Result<(), SessionError> {
        let grid = self.decoder.decode(&self.config.images[i])?.normalized();

        self.phase = Phase::Annotating(i);
        self.index = Some(i);

        let identifier = self.identifiers[i].clone();
        self.markings.reset(&identifier);

        if self.selector.is_active() {
            self.presenter.show_preview(None);
        }
        self.selector = selector_for(self.config.shape_kind);

        self.presenter.set_title(&identifier);
        log::info!("Annotating image {}/{}", i + 1, self.identifiers.len());
        log::debug!(
            "{}: {}x{} pixels",
            identifier,
            grid.width(),
            grid.height()
        );
        self.image = Some(grid);

        self.presenter.clear_highlights();
        let crop = self
            .config
            .crops
            .get(&identifier)
            .or_else(|| self.config.crops.get(&path_key(&self.config.images[i])))
            .copied();
        if let Some(crop) = crop {
            self.presenter.set_viewport(crop);
        }
        self.redraw();
        Ok(())
    }

    /// Record a selection on the current image.
    pub fn select_shape(&mut self, p0: Point, p1: Point) {
        let Phase::Annotating(i) = self.phase else {
            log::debug!("Selection ignored outside annotation");
            return;
        };

        let roi = normalize(self.config.shape_kind, p0, p1);
        let outside = self
            .image
            .as_ref()
            .is_some_and(|image| !roi.fits_within(image.width(), image.height()));
        if outside {
            log::warn!("Selection {:?} extends past the image", roi);
        }

        self.markings.push(&self.identifiers[i], roi);
        log::debug!(
            "Selected {:?} on {} ({} total)",
            roi,
            self.identifiers[i],
            self.markings.get(&self.identifiers[i]).map_or(0, <[Roi]>::len)
        );

        if roi.kind().keeps_highlight() {
            self.presenter.add_highlight(&roi);
        }
    }

    /// Remove the most recent selection on the current image, if any.
    pub fn undo(&mut self) {
        let Phase::Annotating(i) = self.phase else {
            return;
        };

        match self.markings.pop(&self.identifiers[i]) {
            Some(roi) => {
                log::debug!("↩️ Undo: removed {:?}", roi);
                if roi.kind().keeps_highlight() {
                    self.presenter.remove_last_highlight();
                }
            }
            None => log::debug!("Nothing to undo on {}", self.identifiers[i]),
        }
    }

    /// Step the brightness window and redraw. Stored ROIs are unaffected.
    pub fn adjust_brightness(&mut self, direction: BrightnessDirection) {
        if !matches!(self.phase, Phase::Annotating(_)) {
            return;
        }
        self.brightness.adjust(direction);
        self.redraw();
    }

    /// Write the markings to the save destination.
    ///
    /// Returns whether a file was written; without a destination this does
    /// nothing.
    pub fn save(&self) -> Result<bool, SessionError> {
        let written = self
            .markings
            .export(self.save_destination(), &self.export_options())?;
        Ok(written)
    }

    /// End the session early. Saves, but does not notify completion.
    pub fn request_close(&mut self) -> Result<(), SessionError> {
        if self.is_finished() {
            return Ok(());
        }
        log::info!("Session closed");
        self.finish(TerminalReason::Closed)
    }

    fn finish(&mut self, reason: TerminalReason) -> Result<(), SessionError> {
        self.phase = Phase::Terminal(reason);
        self.image = None;

        let saved = self.save();
        if saved.is_ok() && reason == TerminalReason::Exhausted {
            log::info!(
                "All images processed, markings saved at {:?}",
                self.config.save_destination
            );
            self.presenter
                .notify_complete(self.config.save_destination.as_deref());
        }

        // Runs even when saving failed
        if let Some(callback) = self.on_exit.take() {
            callback();
        }
        saved.map(|_| ())
    }

    fn redraw(&mut self) {
        if let Some(image) = &self.image {
            let rendered = self.brightness.render(image.view());
            self.presenter.show_image(rendered.view(), 0.0, 1.0);
        }
    }

    // ------------------------------------------------------------------------
    // Host Events
    // ------------------------------------------------------------------------

    /// Translate a key press through the keybindings.
    pub fn handle_key(&mut self, key: &str) -> Result<(), SessionError> {
        match self.bindings.command_for_key(key) {
            Some(command) => self.dispatch(command),
            None => {
                log::trace!("Unbound key {:?}", key);
                Ok(())
            }
        }
    }

    /// Feed a pointer event to the selection adapter.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if !matches!(self.phase, Phase::Annotating(_)) {
            return;
        }
        log::trace!("Pointer: {:?}", event);

        match event {
            PointerEvent::Press(at) => self.selector.on_press(at),
            PointerEvent::Drag(at) => {
                if let Some(preview) = self.selector.on_drag(at) {
                    self.presenter.show_preview(Some(&preview));
                }
            }
            PointerEvent::Release(at) => {
                let was_active = self.selector.is_active();
                let selection = self.selector.on_release(at);
                if was_active {
                    self.presenter.show_preview(None);
                }
                if let Some((p0, p1)) = selection {
                    self.select_shape(p0, p1);
                }
            }
        }
    }

    pub fn handle_event(&mut self, event: HostEvent) -> Result<(), SessionError> {
        match event {
            HostEvent::Key(key) => self.handle_key(&key),
            HostEvent::Pointer(pointer) => {
                self.handle_pointer(pointer);
                Ok(())
            }
            HostEvent::WindowClosed => self.request_close(),
        }
    }

    /// Drive the session from `events` until it terminates.
    ///
    /// Starts the session if needed, then polls at the configured interval.
    /// A disconnected source closes the session. Returns the markings as
    /// saved.
    pub fn run(&mut self, events: &mut dyn EventSource) -> Result<AnnotationMap, SessionError> {
        if self.phase == Phase::NotStarted {
            self.start()?;
        }

        while !self.is_finished() {
            match events.poll(self.config.poll_interval) {
                Poll::Event(event) => self.handle_event(event)?,
                Poll::Idle => {}
                Poll::Disconnected => {
                    log::debug!("Event source disconnected");
                    self.request_close()?;
                }
            }
        }

        Ok(self.export_view())
    }
}
