use thiserror::Error;

/// Errors raised while loading or validating controller configuration.
///
/// The engines themselves never fail at runtime; these only surface at construction.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Input id `{0}` is registered more than once")]
    DuplicateChannel(String),

    #[error("Directional gesture `{gesture}` reads unknown axis `{axis}`")]
    UnknownAxis { gesture: String, axis: String },

    #[error("Invalid frame window: button window {button} must be within 1..={full}")]
    InvalidWindow { button: usize, full: usize },

    #[error("Invalid buffer update rate: {0} Hz")]
    InvalidFrameRate(f32),

    #[error("Invalid movement setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("Failed to parse controller config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
