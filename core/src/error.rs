use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Cannot start encoder '{program}': {source}")]
    EncoderSpawn {
        program: String,
        #[source]
        source:  std::io::Error,
    },

    #[error("Frame grab failed: {reason}{}", diagnostic_suffix(.diagnostic))]
    FrameGrab {
        reason:     String,
        diagnostic: Option<String>,
    },

    #[error("Recorder is {actual}, expected {expected}")]
    RecorderState {
        expected: &'static str,
        actual:   &'static str,
    },

    #[error("Simulator '{name}' does not support reset")]
    ResetUnsupported { name: String },

    #[error("Invalid tick interval: {interval}")]
    InvalidInterval { interval: f64 },

    #[error("Invalid placement: visual '{name}' {reason}")]
    InvalidPlacement { name: String, reason: &'static str },

    #[error("Visual '{name}' needs a simulator with at least one series")]
    NoSeries { name: &'static str },

    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn diagnostic_suffix(diagnostic: &Option<String>) -> String {
    match diagnostic {
        Some(text) if !text.trim().is_empty() => format!("\nencoder output:\n{}", text.trim_end()),
        _ => String::new(),
    }
}

pub type SimResult<T> = Result<T, SimError>;
