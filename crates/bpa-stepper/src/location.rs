//! Wizard location encoding
//!
//! The caller owns the address bar; the stepper reads its initial position
//! from a query string and asks the caller to push a new one on every
//! committed transition. Steps are 1-indexed in the query.

use bpa_model::{ModelError, StepKind, WizardMode};
use std::fmt;
use url::form_urlencoded;

/// Query key for the 1-based step
pub const STEP_KEY: &str = "step";
/// Query key for the mode
pub const MODE_KEY: &str = "mode";
/// Query key for the asset id
pub const ID_KEY: &str = "id";

/// Errors parsing a location
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Step was not a number between 1 and 9
    #[error("invalid step {0:?}")]
    InvalidStep(String),

    /// Asset id was not numeric
    #[error("invalid asset id {0:?}")]
    InvalidId(String),

    /// Mode was not recognized
    #[error(transparent)]
    Mode(#[from] ModelError),
}

/// Position of the wizard as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardLocation {
    /// Active step
    pub step: StepKind,
    /// Editing mode
    pub mode: WizardMode,
    /// Persisted asset, if any
    pub asset_id: Option<i64>,
}

impl Default for WizardLocation {
    fn default() -> Self {
        Self {
            step: StepKind::Details,
            mode: WizardMode::Create,
            asset_id: None,
        }
    }
}

impl WizardLocation {
    /// Location for a step and mode
    #[inline]
    #[must_use]
    pub fn new(step: StepKind, mode: WizardMode) -> Self {
        Self {
            step,
            mode,
            asset_id: None,
        }
    }

    /// With a persisted asset id
    #[inline]
    #[must_use]
    pub fn with_asset_id(mut self, asset_id: i64) -> Self {
        self.asset_id = Some(asset_id);
        self
    }

    /// Encode as `step=3&mode=edit&id=42`
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair(STEP_KEY, &(self.step.index() + 1).to_string());
        query.append_pair(MODE_KEY, self.mode.as_str());
        if let Some(id) = self.asset_id {
            query.append_pair(ID_KEY, &id.to_string());
        }
        query.finish()
    }

    /// Parse a query string, with or without a leading `?`
    ///
    /// Missing keys fall back to the first step in create mode. Unknown
    /// keys are ignored.
    ///
    /// # Errors
    /// `LocationError` for a malformed step, mode or id
    pub fn from_query(query: &str) -> Result<Self, LocationError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut location = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                STEP_KEY => {
                    let step = value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| StepKind::from_index(i).ok())
                        .ok_or_else(|| LocationError::InvalidStep(value.to_string()))?;
                    location.step = step;
                }
                MODE_KEY => location.mode = value.parse()?,
                ID_KEY => {
                    let id = value
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| LocationError::InvalidId(value.to_string()))?;
                    location.asset_id = Some(id);
                }
                _ => {}
            }
        }
        Ok(location)
    }
}

impl fmt::Display for WizardLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_one_based_step() {
        let location = WizardLocation::new(StepKind::Accounts, WizardMode::Edit).with_asset_id(42);
        assert_eq!(location.to_query(), "step=3&mode=edit&id=42");
    }

    #[test]
    fn parses_back() {
        let location = WizardLocation::from_query("?step=9&mode=view&id=7&tab=x").unwrap();
        assert_eq!(location.step, StepKind::Review);
        assert_eq!(location.mode, WizardMode::View);
        assert_eq!(location.asset_id, Some(7));
    }

    #[test]
    fn empty_query_is_default() {
        assert_eq!(WizardLocation::from_query("").unwrap(), WizardLocation::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            WizardLocation::from_query("step=0"),
            Err(LocationError::InvalidStep(_))
        ));
        assert!(matches!(
            WizardLocation::from_query("step=10"),
            Err(LocationError::InvalidStep(_))
        ));
        assert!(matches!(
            WizardLocation::from_query("mode=delete"),
            Err(LocationError::Mode(_))
        ));
        assert!(matches!(
            WizardLocation::from_query("id=abc"),
            Err(LocationError::InvalidId(_))
        ));
    }
}
