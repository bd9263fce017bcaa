use mask_refine::RefineConfig;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;


#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Refine(#[from] mask_refine::RefineError),
    #[error("Batch contains no jobs")]
    NoJobs,
    #[error("Duplicate output path: {0}")]
    DuplicateOutput(PathBuf),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}


/// One source photo and its raw mask
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CutoutJob {
    pub name: String,
    pub source: PathBuf,
    pub mask: PathBuf,
    /// Defaults to `<output_dir>/<name>.png`
    pub output: Option<PathBuf>,
}

/// A set of cutouts sharing one pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchFile {
    pub output_dir: PathBuf,
    #[serde(default)]
    pub config: RefineConfig,
    /// Optional watermark asset stamped on every cutout
    pub watermark: Option<PathBuf>,
    pub jobs: Vec<CutoutJob>,
}

impl CutoutJob {
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| output_dir.join(format!("{}.png", self.name)))
    }
}

impl BatchFile {
    /// Load a batch from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, BatchError> {
        let batch: BatchFile = toml::from_str(content)?;
        batch.validate()?;
        Ok(batch)
    }

    /// Load a batch from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, BatchError> {
        let batch: BatchFile = serde_json::from_str(content)?;
        batch.validate()?;
        Ok(batch)
    }

    /// Auto-detect file format and load the batch
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(BatchError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, BatchError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Reject empty batches, bad configuration and jobs that would overwrite each other
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.jobs.is_empty() {
            return Err(BatchError::NoJobs);
        }
        self.config.validate()?;

        let mut seen = std::collections::HashSet::new();
        for job in &self.jobs {
            let output = job.output_path(&self.output_dir);
            if !seen.insert(output.clone()) {
                return Err(BatchError::DuplicateOutput(output));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: &str = r#"
output_dir = "out"

[config]
shrink_px = 4

[[jobs]]
name = "pasta"
source = "in/pasta.png"
mask = "in/pasta_mask.png"

[[jobs]]
name = "salad"
source = "in/salad.png"
mask = "in/salad_mask.png"
output = "custom/salad.png"
"#;

    #[test]
    fn test_parse_batch() {
        let batch = BatchFile::from_toml(BATCH).unwrap();
        assert_eq!(batch.jobs.len(), 2);
        assert_eq!(batch.config.shrink_px, 4);
        assert_eq!(batch.config.feather_px, RefineConfig::default().feather_px);
        assert_eq!(batch.jobs[0].output_path(&batch.output_dir), PathBuf::from("out/pasta.png"));
        assert_eq!(batch.jobs[1].output_path(&batch.output_dir), PathBuf::from("custom/salad.png"));
        assert!(batch.watermark.is_none());
    }

    #[test]
    fn test_duplicate_outputs_rejected() {
        let content = BATCH.replace("salad\"\nsource", "pasta\"\nsource").replace("output = \"custom/salad.png\"\n", "");
        assert!(matches!(BatchFile::from_toml(&content), Err(BatchError::DuplicateOutput(_))));
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(matches!(
            BatchFile::from_json(r#"{"output_dir": "out", "jobs": []}"#),
            Err(BatchError::NoJobs)
        ));
    }

    #[test]
    fn test_json_file_round_trip() {
        let batch = BatchFile::from_toml(BATCH).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");
        fs::write(&path, serde_json::to_string_pretty(&batch).unwrap()).unwrap();
        assert_eq!(BatchFile::from_file(&path).unwrap(), batch);
    }
}
