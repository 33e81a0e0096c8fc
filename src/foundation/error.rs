/// Convenience result type used across the crate.
pub type DailiesResult<T> = Result<T, DailiesError>;

/// Error taxonomy for a dailies invocation.
///
/// The variant decides how far a failure propagates: configuration errors stop the whole
/// invocation, discovery errors stop one input path, frame errors skip one frame and delivery
/// errors degrade the run without stopping it.
#[derive(thiserror::Error, Debug)]
pub enum DailiesError {
    /// Invalid codec/profile/transform name, missing or malformed configuration file.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No image sequence found, or an input location could not be read.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Decode, color transform, resize or overlay failure for a single frame.
    #[error("frame {frame} error: {message}")]
    Frame {
        /// Source frame number of the failing frame.
        frame: i64,
        /// Failure description.
        message: String,
    },

    /// Pipe write failure or encoder process failure.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DailiesError {
    /// Build a [`DailiesError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`DailiesError::Discovery`] value.
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Build a [`DailiesError::Frame`] value for source frame `frame`.
    pub fn frame(frame: i64, msg: impl Into<String>) -> Self {
        Self::Frame {
            frame,
            message: msg.into(),
        }
    }

    /// Build a [`DailiesError::Delivery`] value.
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// `true` when the error must stop the whole invocation rather than one sequence.
    pub fn aborts_invocation(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
