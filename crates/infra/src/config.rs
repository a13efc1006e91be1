//! Configuration loading and representation.

use anyhow::{Context, bail};

/// Runtime switches for the moderation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationConfig {
    /// Record denied mutating attempts (labelled `denied`) as well as granted ones.
    pub audit_denials: bool,
    /// Clear expired statuses once at startup. Reads are correct either way.
    pub sweep_on_start: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            audit_denials: true,
            sweep_on_start: false,
        }
    }
}

impl ModerationConfig {
    pub const AUDIT_DENIALS_VAR: &'static str = "MODGATE_AUDIT_DENIALS";
    pub const SWEEP_ON_START_VAR: &'static str = "MODGATE_SWEEP_ON_START";

    /// Load from process environment, falling back to defaults for unset keys.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let audit_denials = match lookup(Self::AUDIT_DENIALS_VAR) {
            Some(raw) => parse_bool(&raw).with_context(|| format!("invalid {}", Self::AUDIT_DENIALS_VAR))?,
            None => defaults.audit_denials,
        };
        let sweep_on_start = match lookup(Self::SWEEP_ON_START_VAR) {
            Some(raw) => parse_bool(&raw).with_context(|| format!("invalid {}", Self::SWEEP_ON_START_VAR))?,
            None => defaults.sweep_on_start,
        };

        Ok(Self {
            audit_denials,
            sweep_on_start,
        })
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}
