//! Error types for the LIS3DH driver.
//!
//! [`TransportError`] is what the external register bus and interrupt line
//! report. [`DriverError`] is what driver operations return; it carries the
//! operation and register that failed so a log line is enough for postmortem
//! diagnosis.

use thiserror::Error;

use crate::types::FailureReason;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Failure reported by the register bus or the interrupt line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The addressed device did not acknowledge.
    #[error("No acknowledge from device")]
    Nack,

    /// The transfer did not complete within the transport's own timeout.
    #[error("Transfer timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The transport is gone (controller removed, channel closed).
    #[error("Transport disconnected: {0}")]
    Disconnected(String),

    /// Any other transport specific failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new disconnected error.
    pub fn disconnected(what: impl Into<String>) -> Self {
        Self::Disconnected(what.into())
    }

    /// Create a generic transport error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Errors produced by the driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A single register transfer failed.
    #[error("Bus {operation} of register 0x{register:02X} failed: {source}")]
    Transport {
        /// `"read"` or `"write"`.
        operation: &'static str,
        register: u8,
        #[source]
        source: TransportError,
    },

    /// The identity register returned something other than the LIS3DH id.
    #[error("Unexpected identity 0x{actual:02X} (expected 0x{expected:02X})")]
    UnexpectedIdentity { expected: u8, actual: u8 },

    /// Reset or idle mode setup failed during initialization.
    #[error("Initialization failed during {step}: {source}")]
    Init {
        step: &'static str,
        #[source]
        source: Box<DriverError>,
    },

    /// The interrupt line could not be acquired, configured or enabled.
    #[error("Interrupt setup failed during {step}: {message}")]
    InterruptSetup { step: &'static str, message: String },

    /// The register bus is not ready to be used.
    #[error("Register bus unavailable")]
    BusUnavailable,

    /// The requested power state change is not a legal edge.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// The event channel was closed by the other side.
    #[error("Event channel closed")]
    ChannelClosed,

    /// A configuration value is out of range.
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl DriverError {
    /// Wrap a failed register read.
    pub fn read(register: u8, source: TransportError) -> Self {
        Self::Transport {
            operation: "read",
            register,
            source,
        }
    }

    /// Wrap a failed register write.
    pub fn write(register: u8, source: TransportError) -> Self {
        Self::Transport {
            operation: "write",
            register,
            source,
        }
    }

    /// Wrap an error raised by an initialization step.
    pub fn init(step: &'static str, source: DriverError) -> Self {
        Self::Init {
            step,
            source: Box::new(source),
        }
    }

    /// Create a new interrupt setup error.
    pub fn interrupt_setup(step: &'static str, message: impl Into<String>) -> Self {
        Self::InterruptSetup {
            step,
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Terminal reason this error puts the device in when initialization
    /// aborts on it.
    ///
    /// A bare transfer failure only escapes initialization from identity
    /// verification (reset and idle failures arrive wrapped in
    /// [`DriverError::Init`]), and a device that cannot be identified is not
    /// recognized.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::UnexpectedIdentity { .. } | Self::Transport { .. } => {
                FailureReason::UnexpectedIdentity
            }
            Self::InterruptSetup { .. } => FailureReason::InterruptSetupError,
            _ => FailureReason::InitError,
        }
    }
}
