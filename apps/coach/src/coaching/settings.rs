//! Generation settings: model choice and sampling parameters for completion calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::MODEL;

/// Models a client may select.
pub const ALLOWED_MODELS: &[&str] = &[MODEL];

pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 1.0);
pub const TOP_P_RANGE: (f64, f64) = (0.0, 1.0);
pub const PENALTY_RANGE: (f64, f64) = (-2.0, 2.0);
pub const MAX_TOKENS_RANGE: (u32, u32) = (64, 3200);

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("model '{0}' is not allowed")]
    UnknownModel(String),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be a number, got '{raw}'")]
    NotANumber { field: String, raw: String },

    #[error("unknown setting '{0}'")]
    UnknownField(String),
}

/// Sampling parameters sent with every completion call.
/// Missing fields in requests fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: MODEL.to_string(),
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_tokens: 1200,
        }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !ALLOWED_MODELS.contains(&self.model.as_str()) {
            return Err(SettingsError::UnknownModel(self.model.clone()));
        }
        check_range("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_range("top_p", self.top_p, TOP_P_RANGE)?;
        check_range("frequency_penalty", self.frequency_penalty, PENALTY_RANGE)?;
        check_range("presence_penalty", self.presence_penalty, PENALTY_RANGE)?;
        check_range(
            "max_tokens",
            f64::from(self.max_tokens),
            (
                f64::from(MAX_TOKENS_RANGE.0),
                f64::from(MAX_TOKENS_RANGE.1),
            ),
        )?;
        Ok(())
    }

    /// Applies one named form field (multipart uploads carry settings as text).
    pub fn set_field(&mut self, field: &str, raw: &str) -> Result<(), SettingsError> {
        let raw = raw.trim();
        let number = |field: &str| {
            raw.parse::<f64>().map_err(|_| SettingsError::NotANumber {
                field: field.to_string(),
                raw: raw.to_string(),
            })
        };

        match field {
            "model" => self.model = raw.to_string(),
            "temperature" => self.temperature = number(field)?,
            "top_p" => self.top_p = number(field)?,
            "frequency_penalty" => self.frequency_penalty = number(field)?,
            "presence_penalty" => self.presence_penalty = number(field)?,
            "max_tokens" => {
                self.max_tokens = raw.parse::<u32>().map_err(|_| SettingsError::NotANumber {
                    field: field.to_string(),
                    raw: raw.to_string(),
                })?
            }
            other => return Err(SettingsError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), SettingsError> {
    // NaN fails both comparisons and is rejected here too.
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
