//! Pipeline configuration
//!
//! Every field has a serde default, so an empty JSON object is a valid
//! configuration that reproduces the stock cadences.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use blendcast_core::{BlendcastError, BlendcastResult, ChannelId};
use blendcast_visual::{OrientationStrategy, ViewSize};
use blendcast_wire::RecordLayout;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sampling tick period (seconds)
    #[serde(default = "default_image_process_interval")]
    pub image_process_interval_secs: f64,
    /// Change-gated publish period (seconds)
    #[serde(default = "default_message_interval")]
    pub message_interval_secs: f64,
    /// Artifact persistence period (seconds)
    #[serde(default = "default_file_save_interval")]
    pub file_save_interval_secs: f64,
    #[serde(default)]
    pub orientation_strategy: OrientationStrategy,
    #[serde(default = "default_true")]
    pub overlay_enabled: bool,
    #[serde(default)]
    pub record_layout: RecordLayout,
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Directory the session directory is created in
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
    #[serde(default = "default_session_dir")]
    pub session_dir: String,
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_secs: f64,
    /// Records of this length or shorter are never persisted
    #[serde(default = "default_min_record_len")]
    pub min_record_len: usize,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub image_target: ImageTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_view_width")]
    pub view_width: f32,
    #[serde(default = "default_view_height")]
    pub view_height: f32,
    #[serde(default = "default_marker_diameter")]
    pub marker_diameter: f32,
}

/// Resolution and quality of persisted snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTarget {
    #[serde(default = "default_target_width")]
    pub width: u32,
    #[serde(default = "default_target_height")]
    pub height: u32,
    #[serde(default = "default_quality")]
    pub quality: u8,
}

fn default_image_process_interval() -> f64 { 0.1 }
fn default_message_interval() -> f64 { 0.33 }
fn default_file_save_interval() -> f64 { 1.0 }
fn default_true() -> bool { true }
fn default_channel() -> String { "blendshapes".to_string() }
fn default_storage_root() -> String { ".".to_string() }
fn default_session_dir() -> String { "mopac".to_string() }
fn default_publish_timeout() -> f64 { 1.0 }
fn default_min_record_len() -> usize { 10 }
fn default_view_width() -> f32 { 1280.0 }
fn default_view_height() -> f32 { 720.0 }
fn default_marker_diameter() -> f32 { 20.0 }
fn default_target_width() -> u32 { 640 }
fn default_target_height() -> u32 { 360 }
fn default_quality() -> u8 { 80 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_process_interval_secs: default_image_process_interval(),
            message_interval_secs: default_message_interval(),
            file_save_interval_secs: default_file_save_interval(),
            orientation_strategy: OrientationStrategy::default(),
            overlay_enabled: true,
            record_layout: RecordLayout::default(),
            channel: default_channel(),
            storage_root: default_storage_root(),
            session_dir: default_session_dir(),
            publish_timeout_secs: default_publish_timeout(),
            min_record_len: default_min_record_len(),
            overlay: OverlayConfig::default(),
            image_target: ImageTarget::default(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            view_width: default_view_width(),
            view_height: default_view_height(),
            marker_diameter: default_marker_diameter(),
        }
    }
}

impl Default for ImageTarget {
    fn default() -> Self {
        Self {
            width: default_target_width(),
            height: default_target_height(),
            quality: default_quality(),
        }
    }
}

impl OverlayConfig {
    pub fn view(&self) -> ViewSize {
        ViewSize::new(self.view_width, self.view_height)
    }
}

impl PipelineConfig {
    /// Read a JSON configuration file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> BlendcastResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(content: &str) -> BlendcastResult<Self> {
        let config: PipelineConfig =
            serde_json::from_str(content).map_err(|e| BlendcastError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BlendcastResult<()> {
        for (name, value) in [
            ("image_process_interval_secs", self.image_process_interval_secs),
            ("message_interval_secs", self.message_interval_secs),
            ("file_save_interval_secs", self.file_save_interval_secs),
            ("publish_timeout_secs", self.publish_timeout_secs),
        ] {
            let in_range = Duration::try_from_secs_f64(value)
                .map_or(false, |period| (MIN_PERIOD..=MAX_PERIOD).contains(&period));
            if !in_range {
                return Err(BlendcastError::InvalidConfig(format!(
                    "{} must be between {:?} and {:?}, got {}",
                    name, MIN_PERIOD, MAX_PERIOD, value
                )));
            }
        }

        if self.image_target.width == 0 || self.image_target.height == 0 {
            return Err(BlendcastError::InvalidConfig(
                "image_target resolution must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.image_target.quality) {
            return Err(BlendcastError::InvalidConfig(format!(
                "image_target.quality must be in 1..=100, got {}",
                self.image_target.quality
            )));
        }
        if self.channel.is_empty() {
            return Err(BlendcastError::InvalidConfig("channel must not be empty".into()));
        }
        if self.session_dir.is_empty() {
            return Err(BlendcastError::InvalidConfig("session_dir must not be empty".into()));
        }
        Ok(())
    }

    pub fn image_process_interval(&self) -> Duration {
        secs(self.image_process_interval_secs)
    }

    pub fn message_interval(&self) -> Duration {
        secs(self.message_interval_secs)
    }

    pub fn file_save_interval(&self) -> Duration {
        secs(self.file_save_interval_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        secs(self.publish_timeout_secs)
    }

    pub fn channel_id(&self) -> ChannelId {
        ChannelId::from(self.channel.as_str())
    }
}

/// Shortest timer period or publish timeout a session accepts
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Longest timer period or publish timeout a session accepts
pub const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

// Clamped into [MIN_PERIOD, MAX_PERIOD] so the timers always get a usable
// period, even for a config that skipped `validate`.
fn secs(value: f64) -> Duration {
    match Duration::try_from_secs_f64(value) {
        Ok(period) => period.clamp(MIN_PERIOD, MAX_PERIOD),
        Err(_) if value > 0.0 => MAX_PERIOD,
        Err(_) => MIN_PERIOD,
    }
}
