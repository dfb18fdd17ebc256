use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    geography::{GeographyProfile, ProfileRegistry, ProfileSpec},
    icp::IcpConfig,
    summary::DEFAULT_TOP_N,
};

pub const DEFAULT_INSIGHT_SAMPLE_CAP: usize = 50;

/// Analysis settings read from a YAML file; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub icp: Option<IcpConfig>,
    pub segment_column: Option<String>,
    pub role_columns: Option<Vec<String>>,
    pub top_n: usize,
    pub insight_sample_cap: usize,
    pub profiles: Vec<ProfileSpec>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            icp: None,
            segment_column: None,
            role_columns: None,
            top_n: DEFAULT_TOP_N,
            insight_sample_cap: DEFAULT_INSIGHT_SAMPLE_CAP,
            profiles: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening configuration file {path:?}"))?;
        Self::from_yaml(&raw).with_context(|| format!("Parsing configuration file {path:?}"))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Loads the file when given, otherwise returns the defaults.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let config = Self::load(path)?;
                info!("Loaded analysis configuration from {path:?}");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Built-in profiles followed by the configured ones, in file order.
    pub fn registry(&self) -> Result<ProfileRegistry> {
        let builtin = ProfileRegistry::builtin().context("Building built-in geography profiles")?;
        if self.profiles.is_empty() {
            return Ok(builtin);
        }
        let extra = self
            .profiles
            .iter()
            .cloned()
            .map(|spec| {
                let id = spec.id.clone();
                GeographyProfile::from_spec(spec)
                    .with_context(|| format!("Validating geography profile '{id}'"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(builtin.extended(extra)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
