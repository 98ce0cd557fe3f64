use thiserror::Error;

use crate::function::AggregateKind;
use crate::window::WindowType;

pub type Result<T> = std::result::Result<T, AggregateError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregateError {
    #[error("unsupported window type: '{0}'")]
    UnsupportedWindowType(String),
    #[error("unsupported aggregate function: '{0}'")]
    UnsupportedFunction(String),
    #[error("invalid additional settings: '{0}'")]
    InvalidSettingsFormat(String),
    #[error("invalid window settings: {0}")]
    InvalidWindowSettings(String),
    #[error("missing required setting '{0}'")]
    MissingSetting(&'static str),
    #[error("invalid value for setting '{key}': '{value}'")]
    InvalidSetting { key: &'static str, value: String },
    #[error("shared state is not supported by this activity host")]
    SharedStateUnsupported,
    #[error("shared state entry '{key}' does not hold a window")]
    SharedStateMismatch { key: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("{function} does not support {found} samples")]
    UnsupportedType {
        function: AggregateKind,
        found: &'static str,
    },
    #[error("{0} windows are not advanced by a timer")]
    NotTimeWindow(WindowType),
    #[error("timer unavailable: {0}")]
    TimerUnavailable(String),
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}
