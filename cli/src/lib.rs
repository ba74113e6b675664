use serde::{Deserialize, Serialize};
use shapeblur::{Rect, DEFAULT_BLUR_KERNEL};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Input directory does not exist: {0}")]
    MissingInputDir(PathBuf),
    #[error("No valid image files found in {0}")]
    NoImagesFound(PathBuf),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// A batch job: blur the largest shape inside a fixed rectangle across
/// every image in a directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlurJob {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub rect: Rect,
    #[serde(default = "default_blur_kernel")]
    pub blur_kernel: u32,
    #[serde(default)]
    pub gpu: bool,
    /// Save the grayscale, edge, region, and mask stage images next to
    /// each output.
    #[serde(default)]
    pub debug: bool,
}

fn default_blur_kernel() -> u32 {
    DEFAULT_BLUR_KERNEL
}

impl BlurJob {
    /// Load job configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load job configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, JobError> {
        let job: BlurJob = toml::from_str(content)?;
        Ok(job)
    }

    /// Load job configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load job configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, JobError> {
        let job: BlurJob = serde_json::from_str(content)?;
        Ok(job)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, JobError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(JobError::UnsupportedFileFormat),
        }
    }

    /// Convert the job to a TOML string
    pub fn to_toml(&self) -> Result<String, JobError> {
        let toml = toml::to_string_pretty(&self)?;
        Ok(toml)
    }

    /// Convert the job to a JSON string
    pub fn to_json(&self) -> Result<String, JobError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Check the directories before starting the batch.
    pub fn validate(&self) -> Result<(), JobError> {
        if !self.input_dir.is_dir() {
            return Err(JobError::MissingInputDir(self.input_dir.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_round_trips_through_json() {
        let job = BlurJob {
            input_dir: PathBuf::from("in"),
            output_dir: PathBuf::from("out"),
            rect: Rect::new(10, 20, 300, 400),
            blur_kernel: 21,
            gpu: true,
            debug: false,
        };
        let parsed = BlurJob::from_json(&job.to_json().unwrap()).unwrap();
        assert_eq!(parsed, job);
    }

    #[test]
    fn kernel_and_flags_default_when_omitted() {
        let job = BlurJob::from_toml(
            r#"
            input_dir = "frames"
            output_dir = "blurred"

            [rect]
            x = 0
            y = 0
            width = 640
            height = 480
            "#,
        )
        .unwrap();
        assert_eq!(job.blur_kernel, DEFAULT_BLUR_KERNEL);
        assert!(!job.gpu);
        assert!(!job.debug);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = BlurJob::from_file("job.yaml").unwrap_err();
        assert!(matches!(err, JobError::UnsupportedFileFormat));
    }
}
