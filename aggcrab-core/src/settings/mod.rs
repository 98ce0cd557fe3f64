//! # Settings
//!
//! Typed activity configuration, validated once at construction.
//!
//! Hosts hand over settings either as a flat string map ([`AggregateSettings::from_map`])
//! or as a JSON/serde document with camelCase keys. Both routes end in
//! [`AggregateSettings::validate`], so an `AggregateSettings` value is always
//! usable as-is.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AggregateError, Result};
use crate::function::AggregateKind;
use crate::window::{WindowSettings, WindowType};

pub const KEY_FUNCTION: &str = "function";
pub const KEY_WINDOW_TYPE: &str = "windowType";
pub const KEY_WINDOW_SIZE: &str = "windowSize";
pub const KEY_RESOLUTION: &str = "resolution";
pub const KEY_PROCEED_ONLY_ON_EMIT: &str = "proceedOnlyOnEmit";
pub const KEY_ADDITIONAL_SETTINGS: &str = "additionalSettings";
pub const KEY_RESET_TIMER_ON_SAMPLE: &str = "resetTimerOnSample";

/// Configuration of one aggregate activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSettings", into = "RawSettings")]
pub struct AggregateSettings {
    pub function: AggregateKind,
    pub window_type: WindowType,
    /// Sample count for count windows, milliseconds for time windows.
    pub window_size: u64,
    /// Slot length in milliseconds for `timeSliding`; ignored otherwise.
    pub resolution: u64,
    /// When set, an evaluation that did not hit a boundary reports `done = false`.
    pub proceed_only_on_emit: bool,
    /// Passed to the timer's `update_timer` on every sample.
    pub reset_timer_on_sample: bool,
    pub additional_settings: HashMap<String, String>,
}

impl AggregateSettings {
    /// Minimal settings with every optional key at its default.
    pub fn new(function: AggregateKind, window_type: WindowType, window_size: u64) -> Self {
        Self {
            function,
            window_type,
            window_size,
            resolution: 0,
            proceed_only_on_emit: false,
            reset_timer_on_sample: false,
            additional_settings: HashMap::new(),
        }
    }

    pub fn with_resolution(mut self, resolution: u64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_proceed_only_on_emit(mut self, proceed_only_on_emit: bool) -> Self {
        self.proceed_only_on_emit = proceed_only_on_emit;
        self
    }

    pub fn with_reset_timer_on_sample(mut self, reset_timer_on_sample: bool) -> Self {
        self.reset_timer_on_sample = reset_timer_on_sample;
        self
    }

    pub fn with_additional_settings(mut self, additional_settings: HashMap<String, String>) -> Self {
        self.additional_settings = additional_settings;
        self
    }

    /// Build and validate settings from the host's flat key/value map.
    ///
    /// `function`, `windowType` and `windowSize` are required; empty values
    /// for the optional keys mean "use the default".
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        let lookup = |key: &'static str| {
            values
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| lookup(key).ok_or(AggregateError::MissingSetting(key));

        let settings = Self {
            function: required(KEY_FUNCTION)?.parse()?,
            window_type: required(KEY_WINDOW_TYPE)?.parse()?,
            window_size: parse_number(KEY_WINDOW_SIZE, required(KEY_WINDOW_SIZE)?)?,
            resolution: lookup(KEY_RESOLUTION)
                .map(|v| parse_number(KEY_RESOLUTION, v))
                .transpose()?
                .unwrap_or(0),
            proceed_only_on_emit: lookup(KEY_PROCEED_ONLY_ON_EMIT)
                .map(|v| parse_flag(KEY_PROCEED_ONLY_ON_EMIT, v))
                .transpose()?
                .unwrap_or(false),
            reset_timer_on_sample: lookup(KEY_RESET_TIMER_ON_SAMPLE)
                .map(|v| parse_flag(KEY_RESET_TIMER_ON_SAMPLE, v))
                .transpose()?
                .unwrap_or(false),
            additional_settings: parse_additional_settings(
                values.get(KEY_ADDITIONAL_SETTINGS).map_or("", String::as_str),
            )?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check the window sizing for the configured window type.
    pub fn validate(&self) -> Result<()> {
        self.window_settings(false).validate(self.window_type)
    }

    /// Window sizing derived from these settings.
    pub fn window_settings(&self, external_timer: bool) -> WindowSettings {
        WindowSettings::new(self.window_size)
            .with_resolution(self.resolution)
            .with_external_timer(external_timer)
            .with_additional_settings(self.additional_settings.clone())
    }
}

/// Parse `k=v,k=v` into a map.
///
/// The empty string is the empty map. Every comma-separated pair must split
/// into exactly two parts on `=`; anything else, including an empty pair from
/// a trailing comma, fails with [`AggregateError::InvalidSettingsFormat`].
/// Keys and values are taken verbatim.
pub fn parse_additional_settings(values: &str) -> Result<HashMap<String, String>> {
    if values.is_empty() {
        return Ok(HashMap::new());
    }
    values
        .split(',')
        .map(|pair| {
            let mut parts = pair.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => Ok((key.to_string(), value.to_string())),
                _ => Err(AggregateError::InvalidSettingsFormat(pair.to_string())),
            }
        })
        .collect()
}

/// Inverse of [`parse_additional_settings`], with keys in sorted order.
pub fn format_additional_settings(settings: &HashMap<String, String>) -> String {
    settings
        .iter()
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_number(key: &'static str, value: &str) -> Result<u64> {
    u64::from_str(value).map_err(|_| AggregateError::InvalidSetting {
        key,
        value: value.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool> {
    bool::from_str(&value.to_ascii_lowercase()).map_err(|_| AggregateError::InvalidSetting {
        key,
        value: value.to_string(),
    })
}

// ── Serde shape ───────────────────────────────────────────────────────────────

/// Wire form of [`AggregateSettings`]: enums as their names and additional
/// settings in the same `k=v` string form hosts use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    function: String,
    window_type: String,
    window_size: u64,
    #[serde(default)]
    resolution: u64,
    #[serde(default)]
    proceed_only_on_emit: bool,
    #[serde(default)]
    reset_timer_on_sample: bool,
    #[serde(default)]
    additional_settings: String,
}

impl TryFrom<RawSettings> for AggregateSettings {
    type Error = AggregateError;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let settings = Self {
            function: raw.function.parse()?,
            window_type: raw.window_type.parse()?,
            window_size: raw.window_size,
            resolution: raw.resolution,
            proceed_only_on_emit: raw.proceed_only_on_emit,
            reset_timer_on_sample: raw.reset_timer_on_sample,
            additional_settings: parse_additional_settings(&raw.additional_settings)?,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl From<AggregateSettings> for RawSettings {
    fn from(settings: AggregateSettings) -> Self {
        Self {
            function: settings.function.as_str().to_string(),
            window_type: settings.window_type.as_str().to_string(),
            window_size: settings.window_size,
            resolution: settings.resolution,
            proceed_only_on_emit: settings.proceed_only_on_emit,
            reset_timer_on_sample: settings.reset_timer_on_sample,
            additional_settings: format_additional_settings(&settings.additional_settings),
        }
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
