//! Session configuration.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::UserPreferences;
use crate::constants::{DEFAULT_MAX_LEVEL_STEP, DEFAULT_MIN_LEVEL_STEP, DEFAULT_POLL_INTERVAL_MS};
use crate::error::{ConfigError, SessionError};
use crate::format::paths::{absolute_lexically, path_key};
use crate::format::{AnnotationMap, ExportOptions, ImportOptions, LegacyKeyPolicy};
use crate::model::{CropWindow, ShapeKind};

/// Where a session takes previously saved markings from.
#[derive(Debug, Clone, Default)]
pub enum MarkingsSource {
    /// Start with an empty map.
    #[default]
    None,
    /// Load from this file. A missing file is logged and treated as empty.
    Path(PathBuf),
    /// Use an already loaded map.
    Map(AnnotationMap),
    /// Load from the session's save destination, if it exists.
    DefaultLocation,
}

/// Everything needed to start an annotation session.
///
/// Built with chained setters:
///
/// ```rust,ignore
/// let config = SessionConfig::new(images)
///     .save_to("markings.json")
///     .shape_kind_str("arrow")?
///     .markings(MarkingsSource::DefaultLocation);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Images in traversal order.
    pub images: Vec<PathBuf>,

    /// Markings file written on save. `None` disables saving.
    pub save_destination: Option<PathBuf>,

    pub shape_kind: ShapeKind,

    pub markings: MarkingsSource,

    /// Parent directory names (or full identifiers) forcing re-annotation.
    pub reselect: Option<HashSet<String>>,

    /// Save identifiers relative to this directory.
    pub relative_to: Option<PathBuf>,

    /// Save ROI lists keyed by parent directory.
    pub drop_identifier: bool,

    /// Handling of absolute identifiers in relative markings files.
    pub legacy_keys: LegacyKeyPolicy,

    /// Clip displayed images to the brightness window.
    pub clipping: bool,

    /// Display viewports by identifier.
    pub crops: HashMap<String, CropWindow>,

    pub max_level_step: f32,
    pub min_level_step: f32,

    /// How long the run loop waits for each host event.
    pub poll_interval: Duration,
}

impl SessionConfig {
    /// Create a configuration for the given images with defaults otherwise.
    pub fn new<I, P>(images: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            images: images.into_iter().map(Into::into).collect(),
            save_destination: None,
            shape_kind: ShapeKind::default(),
            markings: MarkingsSource::None,
            reselect: None,
            relative_to: None,
            drop_identifier: false,
            legacy_keys: LegacyKeyPolicy::default(),
            clipping: true,
            crops: HashMap::new(),
            max_level_step: DEFAULT_MAX_LEVEL_STEP,
            min_level_step: DEFAULT_MIN_LEVEL_STEP,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn save_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_destination = Some(path.into());
        self
    }

    pub fn shape_kind(mut self, kind: ShapeKind) -> Self {
        self.shape_kind = kind;
        self
    }

    /// Set the shape kind from its name, `"box"` or `"arrow"`.
    pub fn shape_kind_str(mut self, name: &str) -> Result<Self, ConfigError> {
        self.shape_kind = name.parse()?;
        Ok(self)
    }

    pub fn markings(mut self, source: MarkingsSource) -> Self {
        self.markings = source;
        self
    }

    /// Force re-annotation of images whose parent directory name (or full
    /// identifier) is in `names`.
    pub fn reselect<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reselect = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn relative_to(mut self, base: impl Into<PathBuf>) -> Self {
        self.relative_to = Some(base.into());
        self
    }

    pub fn drop_identifier(mut self, drop: bool) -> Self {
        self.drop_identifier = drop;
        self
    }

    pub fn legacy_keys(mut self, policy: LegacyKeyPolicy) -> Self {
        self.legacy_keys = policy;
        self
    }

    pub fn clipping(mut self, clipping: bool) -> Self {
        self.clipping = clipping;
        self
    }

    /// Restrict the displayed viewport of one image.
    pub fn crop(mut self, image: impl AsRef<Path>, window: CropWindow) -> Self {
        self.crops.insert(path_key(image.as_ref()), window);
        self
    }

    pub fn brightness_steps(mut self, max_step: f32, min_step: f32) -> Self {
        self.max_level_step = max_step;
        self.min_level_step = min_step;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Apply the persisted user preferences.
    pub fn with_preferences(self, preferences: &UserPreferences) -> Self {
        self.clipping(preferences.clipping)
            .brightness_steps(preferences.max_level_step, preferences.min_level_step)
            .poll_interval(Duration::from_millis(preferences.poll_interval_ms))
    }

    /// Check the configuration before a session is built from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.relative_to {
            Some(base) if !base.is_dir() => {
                Err(ConfigError::InvalidBaseDirectory { path: base.clone() })
            }
            _ => Ok(()),
        }
    }

    /// Session identifiers of the images, in traversal order.
    ///
    /// Without a relativization base these are the image paths as given.
    /// With one, the base and every identifier are made absolute against the
    /// working directory, so relative image paths and an absolute base (or
    /// the reverse) still produce keys that join back on load.
    pub(crate) fn resolve_identifiers(&mut self) -> Result<Vec<String>, ConfigError> {
        let Some(base) = &self.relative_to else {
            return Ok(self.images.iter().map(|p| path_key(p)).collect());
        };

        let cwd = std::env::current_dir()?;
        let base = absolute_lexically(base, &cwd);
        log::debug!("Identifiers resolved against {:?}, saved relative to {:?}", cwd, base);
        self.relative_to = Some(base);

        Ok(self
            .images
            .iter()
            .map(|p| path_key(&absolute_lexically(p, &cwd)))
            .collect())
    }

    /// Options applied when saving markings.
    pub fn export_options(&self) -> ExportOptions {
        let options = ExportOptions::new().drop_identifier(self.drop_identifier);
        match &self.relative_to {
            Some(base) => options.relative_to(base),
            None => options,
        }
    }

    /// Options applied when loading markings from a file.
    pub fn import_options(&self) -> ImportOptions {
        let options = ImportOptions::new().legacy_keys(self.legacy_keys);
        match &self.relative_to {
            Some(base) => options.relative_to(base),
            None => options,
        }
    }

    /// Resolve the configured markings source into a map.
    pub(crate) fn load_markings(&mut self) -> Result<AnnotationMap, SessionError> {
        let path = match std::mem::take(&mut self.markings) {
            MarkingsSource::None => return Ok(AnnotationMap::new()),
            MarkingsSource::Map(map) => return Ok(map),
            MarkingsSource::Path(path) => {
                if !path.is_file() {
                    log::warn!("Couldn't import old markings, {:?} is not a file", path);
                    return Ok(AnnotationMap::new());
                }
                path
            }
            MarkingsSource::DefaultLocation => match &self.save_destination {
                Some(path) if path.is_file() => path.clone(),
                Some(path) => {
                    log::info!("No previous markings at {:?}, starting fresh", path);
                    return Ok(AnnotationMap::new());
                }
                None => {
                    log::warn!("Markings requested from the save destination, but none is set");
                    return Ok(AnnotationMap::new());
                }
            },
        };

        let map = AnnotationMap::import(&path, self.shape_kind, &self.import_options())?;
        Ok(map)
    }
}
