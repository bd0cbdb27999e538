use crate::{
    error::{SimError, SimResult},
    types::{Rgba, Seconds, BLACK},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BITRATE: u32 = 1800;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub width:      u32,
    pub height:     u32,
    /// Seconds between timer fires.
    pub interval:   Seconds,
    pub real_time:  bool,
    pub show_fps:   bool,
    pub caption:    String,
    pub background: Rgba,
    pub recording:  RecordingConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width:      500,
            height:     500,
            interval:   0.05,
            real_time:  true,
            show_fps:   false,
            caption:    "Complex Systems".to_string(),
            background: BLACK,
            recording:  RecordingConfig::default(),
        }
    }
}

impl DisplayConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.interval.is_finite() || self.interval <= 0.0 {
            return Err(SimError::InvalidInterval { interval: self.interval });
        }
        if self.width == 0 || self.height == 0 {
            return Err(SimError::InvalidCanvas { width: self.width, height: self.height });
        }
        Ok(())
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_interval(mut self, interval: Seconds) -> Self {
        self.interval = interval;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecordingConfig {
    /// Target of the start-recording command. A timestamped name is used
    /// when absent.
    pub filename: Option<String>,
    /// Frames per second. Derived from the tick interval when absent.
    pub fps:      Option<f64>,
    /// Encoder bitrate, in kbit/s.
    pub bitrate:  u32,
    pub encoder:  EncoderConfig,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            filename: None,
            fps:      None,
            bitrate:  DEFAULT_BITRATE,
            encoder:  EncoderConfig::default(),
        }
    }
}

impl RecordingConfig {
    pub fn movie_filename(&self) -> String {
        self.filename.clone().unwrap_or_else(|| {
            format!("simcx_{}.mp4", chrono::Local::now().format("%Y%m%d_%H%M%S"))
        })
    }
}

/// External encoder process used by the ffmpeg sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    pub program:      String,
    pub codec:        String,
    pub pixel_format: String,
    pub extra_args:   Vec<String>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program:      "ffmpeg".to_string(),
            codec:        "h264".to_string(),
            pixel_format: "yuv420p".to_string(),
            extra_args:   Vec::new(),
        }
    }
}
