//! Zone configuration: the static description of each monitored room.
//!
//! Zones are loaded once at startup from a JSON config file (path given
//! by the `ZONES_FILE` env var). Secrets never live in the file itself:
//! `api_credential_ref` names the environment variable that holds the
//! provider API key.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::ZoneId;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Automatic checks may not run more often than once per minute.
pub const MIN_CHECK_INTERVAL_MINUTES: u32 = 1;

/// Pickiness is an ordinal 1 (lenient) to 5 (strict).
pub const MIN_PICKINESS: u8 = 1;
pub const MAX_PICKINESS: u8 = 5;

/// Snooze duration accepted by the service surface, in minutes.
pub const MIN_SNOOZE_MINUTES: u32 = 1;
pub const MAX_SNOOZE_MINUTES: u32 = 1440;

fn default_personality() -> String {
    "a helpful, encouraging tidy assistant".to_string()
}

fn default_pickiness() -> u8 {
    3
}

fn default_check_interval_minutes() -> u32 {
    // Once per day, matching one automatic run per day as the
    // conservative out-of-the-box cadence.
    1440
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_max_tasks() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Vision-capable model providers a zone can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    OpenRouter,
    Gemini,
    /// Any OpenAI-compatible HTTP endpoint; requires `base_url`.
    Custom,
}

impl Provider {
    /// String form used in config files and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::OpenRouter => "openrouter",
            Provider::Gemini => "gemini",
            Provider::Custom => "custom",
        }
    }

    /// Model used when the zone config does not name one.
    ///
    /// `Custom` endpoints have no meaningful default; the config must
    /// provide a model explicitly.
    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("gpt-4.1-mini"),
            Provider::Anthropic => Some("claude-3-5-sonnet-latest"),
            Provider::OpenRouter => Some("openrouter/auto"),
            Provider::Gemini => Some("gemini-1.5-flash-latest"),
            Provider::Custom => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CheckMode
// ---------------------------------------------------------------------------

/// When a zone gets inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// Scheduled automatically whenever the check interval elapses.
    #[default]
    Auto,
    /// Inspected only on explicit request; the tick loop skips it.
    Manual,
}

// ---------------------------------------------------------------------------
// ZoneConfig
// ---------------------------------------------------------------------------

/// Static configuration for one monitored zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Stable identifier, unique across all zones.
    pub id: ZoneId,

    /// Human label ("Kitchen", "Kids' room").
    pub name: String,

    /// Snapshot URL (or other reference) handed to the camera source.
    pub camera_ref: String,

    /// Free-text persona forwarded into the model prompt.
    #[serde(default = "default_personality")]
    pub personality: String,

    /// 1 (only flag real mess) to 5 (flag every minor issue).
    #[serde(default = "default_pickiness")]
    pub pickiness: u8,

    /// Minutes between automatic checks. Ignored for `manual` zones.
    #[serde(default = "default_check_interval_minutes")]
    pub check_interval_minutes: u32,

    /// Whether the scheduler may check this zone on its own.
    #[serde(default)]
    pub mode: CheckMode,

    /// Which vision provider answers for this zone.
    pub provider: Provider,

    /// Model override; falls back to [`Provider::default_model`].
    #[serde(default)]
    pub model: Option<String>,

    /// Endpoint override (required for `custom`, optional elsewhere).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Name of the environment variable holding the provider API key.
    pub api_credential_ref: String,
}

impl ZoneConfig {
    /// Interval between automatic checks as a chrono duration.
    pub fn check_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.check_interval_minutes))
    }

    /// Model to use, resolving the per-provider default.
    pub fn resolved_model(&self) -> Option<&str> {
        self.model
            .as_deref()
            .or_else(|| self.provider.default_model())
    }

    /// Validate a single zone's fields.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::Config("zone id must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "zone '{}': name must not be empty",
                self.id
            )));
        }
        if self.camera_ref.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "zone '{}': camera_ref must not be empty",
                self.id
            )));
        }
        if !(MIN_PICKINESS..=MAX_PICKINESS).contains(&self.pickiness) {
            return Err(CoreError::Config(format!(
                "zone '{}': pickiness must be between {MIN_PICKINESS} and {MAX_PICKINESS}, got {}",
                self.id, self.pickiness
            )));
        }
        if self.check_interval_minutes < MIN_CHECK_INTERVAL_MINUTES {
            return Err(CoreError::Config(format!(
                "zone '{}': check_interval_minutes must be at least {MIN_CHECK_INTERVAL_MINUTES}",
                self.id
            )));
        }
        if self.resolved_model().is_none() {
            return Err(CoreError::Config(format!(
                "zone '{}': provider 'custom' requires an explicit model",
                self.id
            )));
        }
        if self.provider == Provider::Custom && self.base_url.is_none() {
            return Err(CoreError::Config(format!(
                "zone '{}': provider 'custom' requires base_url",
                self.id
            )));
        }
        if self.api_credential_ref.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "zone '{}': api_credential_ref must name an environment variable",
                self.id
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Zones file
// ---------------------------------------------------------------------------

/// Tunables shared by every zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDefaults {
    /// Consecutive failed inspections before a zone's status degrades
    /// to `error` (below this the prior status is kept so one flaky
    /// call does not flip the UI).
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Checklist entries kept per verdict; the model's first N in
    /// reported order survive, the rest are dropped.
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
}

impl Default for ZoneDefaults {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            max_tasks: default_max_tasks(),
        }
    }
}

/// Top-level shape of the zones config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ZonesFile {
    #[serde(default)]
    pub defaults: ZoneDefaults,
    pub zones: Vec<ZoneConfig>,
}

impl ZonesFile {
    /// Parse and validate a zones file from raw JSON.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let file: ZonesFile = serde_json::from_str(raw)
            .map_err(|e| CoreError::Config(format!("invalid zones file: {e}")))?;
        file.validate()?;
        Ok(file)
    }

    /// Load a zones file from disk.
    pub fn load(path: &std::path::Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read zones file {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Validate every zone and cross-zone uniqueness.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.zones.is_empty() {
            return Err(CoreError::Config("zones file defines no zones".into()));
        }
        if self.defaults.failure_threshold == 0 {
            return Err(CoreError::Config(
                "defaults.failure_threshold must be at least 1".into(),
            ));
        }
        if self.defaults.max_tasks == 0 {
            return Err(CoreError::Config(
                "defaults.max_tasks must be at least 1".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for zone in &self.zones {
            zone.validate()?;
            if !seen.insert(zone.id.as_str()) {
                return Err(CoreError::Config(format!(
                    "duplicate zone id '{}'",
                    zone.id
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_json(extra: &str) -> String {
        format!(
            r#"{{
                "id": "kitchen",
                "name": "Kitchen",
                "camera_ref": "http://cam.local/snapshot.jpg",
                "provider": "openai",
                "api_credential_ref": "OPENAI_API_KEY"
                {extra}
            }}"#
        )
    }

    fn file_json(zones: &[String]) -> String {
        format!(r#"{{ "zones": [{}] }}"#, zones.join(","))
    }

    #[test]
    fn minimal_zone_parses_with_defaults() {
        let file = ZonesFile::from_json(&file_json(&[zone_json("")])).unwrap();
        let zone = &file.zones[0];
        assert_eq!(zone.pickiness, 3);
        assert_eq!(zone.check_interval_minutes, 1440);
        assert_eq!(zone.resolved_model(), Some("gpt-4.1-mini"));
        assert_eq!(file.defaults.failure_threshold, 3);
        assert_eq!(file.defaults.max_tasks, 10);
    }

    #[test]
    fn model_override_wins_over_provider_default() {
        let file =
            ZonesFile::from_json(&file_json(&[zone_json(r#", "model": "gpt-4.1""#)])).unwrap();
        assert_eq!(file.zones[0].resolved_model(), Some("gpt-4.1"));
    }

    #[test]
    fn mode_defaults_to_auto_and_parses_manual() {
        let file = ZonesFile::from_json(&file_json(&[zone_json("")])).unwrap();
        assert_eq!(file.zones[0].mode, CheckMode::Auto);

        let file =
            ZonesFile::from_json(&file_json(&[zone_json(r#", "mode": "manual""#)])).unwrap();
        assert_eq!(file.zones[0].mode, CheckMode::Manual);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = ZonesFile::from_json(&file_json(&[zone_json(""), zone_json("")])).unwrap_err();
        assert!(err.to_string().contains("duplicate zone id"));
    }

    #[test]
    fn pickiness_out_of_range_rejected() {
        let err = ZonesFile::from_json(&file_json(&[zone_json(r#", "pickiness": 6"#)]))
            .unwrap_err();
        assert!(err.to_string().contains("pickiness"));
    }

    #[test]
    fn zero_interval_rejected() {
        let err =
            ZonesFile::from_json(&file_json(&[zone_json(r#", "check_interval_minutes": 0"#)]))
                .unwrap_err();
        assert!(err.to_string().contains("check_interval_minutes"));
    }

    #[test]
    fn custom_provider_requires_base_url_and_model() {
        let raw = r#"{
            "zones": [{
                "id": "garage",
                "name": "Garage",
                "camera_ref": "http://cam.local/garage.jpg",
                "provider": "custom",
                "model": "llava:13b",
                "api_credential_ref": "LOCAL_API_KEY"
            }]
        }"#;
        let err = ZonesFile::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("base_url"));

        let raw_no_model = r#"{
            "zones": [{
                "id": "garage",
                "name": "Garage",
                "camera_ref": "http://cam.local/garage.jpg",
                "provider": "custom",
                "base_url": "http://ollama.local:11434/v1",
                "api_credential_ref": "LOCAL_API_KEY"
            }]
        }"#;
        let err = ZonesFile::from_json(raw_no_model).unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn empty_zones_file_rejected() {
        let err = ZonesFile::from_json(r#"{ "zones": [] }"#).unwrap_err();
        assert!(err.to_string().contains("no zones"));
    }

    #[test]
    fn provider_default_models() {
        assert_eq!(Provider::OpenAi.default_model(), Some("gpt-4.1-mini"));
        assert_eq!(
            Provider::Anthropic.default_model(),
            Some("claude-3-5-sonnet-latest")
        );
        assert_eq!(Provider::OpenRouter.default_model(), Some("openrouter/auto"));
        assert_eq!(
            Provider::Gemini.default_model(),
            Some("gemini-1.5-flash-latest")
        );
        assert_eq!(Provider::Custom.default_model(), None);
    }

    #[test]
    fn check_interval_converts_minutes() {
        let file = ZonesFile::from_json(&file_json(&[zone_json(
            r#", "check_interval_minutes": 30"#,
        )]))
        .unwrap();
        assert_eq!(file.zones[0].check_interval(), chrono::Duration::minutes(30));
    }
}
