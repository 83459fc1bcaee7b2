use thiserror::Error;

/// Errors returned by the RailDriver accessor layer
///
/// These abstract over whatever backend implements [`RawDriver`](crate::RawDriver)
/// and describe failures in terms of controllers and values rather than
/// the underlying transport.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Controller is not present on the currently loaded loco
    ///
    /// Raised when a controller is looked up by name and the name does not
    /// appear in the controller list. The set of controllers changes whenever
    /// the player switches loco, so a name that was valid a moment ago can
    /// start failing with this error.
    #[error("Controller not found: {0}")]
    ControllerNotFound(String),

    /// Invalid parameter value
    ///
    /// Returned when a percentage control is set outside its allowed range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Simulation clock readings do not form a valid time of day
    #[error("Invalid time: {hours:02}:{minutes:02}:{seconds:02}")]
    InvalidTime { hours: u32, minutes: u32, seconds: u32 },

    /// The backend failed to answer a call
    #[error("Driver error: {0}")]
    Driver(String),
}

impl ApiError {
    /// Whether this error means the controller is missing rather than broken
    pub fn is_controller_not_found(&self) -> bool {
        matches!(self, ApiError::ControllerNotFound(_))
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
