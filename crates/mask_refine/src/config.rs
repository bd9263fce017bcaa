use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::Aligner,
    error::{RefineError, Result},
};

/// Every pipeline tunable. Missing fields fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct RefineConfig {
    /// Growth applied right after binarization, in pixels
    pub dilate_px: u32,
    /// Percentile (0..=1) an edge must reach to steer the coarse alignment
    #[schemars(range(min = 0.0, max = 1.0))]
    pub coarse_top_edge_pct: f32,
    /// Half-width of the fine alignment search window
    #[schemars(range(max = 64))]
    pub fine_radius_px: u32,
    /// Penalty per squared pixel of fine displacement
    #[schemars(range(min = 0.0))]
    pub lambda: f32,
    /// Half-width of the square closing window used before hole filling
    pub hole_closing_radius: u8,
    /// Inward pull of the foreground boundary, in pixels
    pub shrink_px: u32,
    /// Regrowth blur radius of the softener
    pub expand_px: u32,
    /// Feather blur radius of the softener
    pub feather_px: u32,
    /// Mask values at or below this become fully transparent
    pub ramp_low: u8,
    /// Mask values at or above this become fully opaque
    pub ramp_high: u8,
    /// Keep an RGBA rendering of every stage
    pub keep_intermediates: bool,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            dilate_px: 0,
            coarse_top_edge_pct: 0.90,
            fine_radius_px: 8,
            lambda: 0.002,
            hole_closing_radius: 2,
            shrink_px: 3,
            expand_px: 1,
            feather_px: 2,
            ramp_low: 5,
            ramp_high: 200,
            keep_intermediates: false,
        }
    }
}

impl RefineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.coarse_top_edge_pct) {
            return Err(RefineError::Config(format!(
                "coarse_top_edge_pct must be within [0, 1], got {}",
                self.coarse_top_edge_pct
            )));
        }
        if self.fine_radius_px > Aligner::MAX_FINE_RADIUS_PX {
            return Err(RefineError::Config(format!(
                "fine_radius_px must be at most {}, got {}",
                Aligner::MAX_FINE_RADIUS_PX,
                self.fine_radius_px
            )));
        }
        if !self.lambda.is_finite() || self.lambda < 0.0 {
            return Err(RefineError::Config(format!(
                "lambda must be a non-negative number, got {}",
                self.lambda
            )));
        }
        if self.ramp_low >= self.ramp_high {
            return Err(RefineError::Config(format!(
                "ramp_low ({}) must be below ramp_high ({})",
                self.ramp_low, self.ramp_high
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RefineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: RefineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path_ref),
            Some("json") => Self::from_json_file(path_ref),
            other => Err(RefineError::Config(format!(
                "unsupported config format {other:?}, use .toml or .json"
            ))),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save configuration, picking the format from the extension (TOML otherwise)
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("json") => self.to_json()?,
            _ => self.to_toml()?,
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    /// JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RefineConfig)
    }
}
