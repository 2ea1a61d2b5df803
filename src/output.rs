//! Response bodies returned by the service, and metrics derived from them.

use crate::job::JobStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /jobs`.
///
/// `job_id` is absent when the service refuses the upload outright (for
/// example when the caller's quota is exhausted); `error` then explains why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One element of the `POST /jobs/batch` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `GET /jobs/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: JobStatus,
    /// Tool-specific output: a path, a list of paths, or an object carrying
    /// metrics such as `original_size` / `compressed_size`.
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusReport {
    /// Size metrics, when the output object carries both byte counts.
    pub fn compression(&self) -> Option<CompressionStats> {
        self.output.as_ref().and_then(CompressionStats::from_output)
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Before/after byte counts reported by a size-reducing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub original_size: u64,
    pub compressed_size: u64,
}

/// Direction and magnitude of a size change, in percent of the original.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizeChange {
    Saved { percent: f64 },
    Increased { percent: f64 },
    Unchanged,
}

impl CompressionStats {
    /// Read `original_size` and `compressed_size` from a status `output` object.
    ///
    /// Returns `None` when either key is missing or the original is empty.
    pub fn from_output(output: &serde_json::Value) -> Option<Self> {
        let original_size = output.get("original_size")?.as_u64()?;
        let compressed_size = output.get("compressed_size")?.as_u64()?;
        if original_size == 0 {
            return None;
        }
        Some(Self {
            original_size,
            compressed_size,
        })
    }

    /// Classify the change relative to the original size.
    pub fn change(&self) -> SizeChange {
        let (orig, comp) = (self.original_size, self.compressed_size);
        if comp < orig {
            SizeChange::Saved {
                percent: percent_of(orig - comp, orig),
            }
        } else if comp > orig {
            SizeChange::Increased {
                percent: percent_of(comp - orig, orig),
            }
        } else {
            SizeChange::Unchanged
        }
    }

    /// Percentage saved; negative when the file grew.
    pub fn saved_percent(&self) -> f64 {
        match self.change() {
            SizeChange::Saved { percent } => percent,
            SizeChange::Increased { percent } => -percent,
            SizeChange::Unchanged => 0.0,
        }
    }
}

// Multiply before dividing so exact ratios (600/1000) stay exact.
fn percent_of(part: u64, whole: u64) -> f64 {
    (part as f64 * 100.0) / whole as f64
}

impl fmt::Display for SizeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeChange::Saved { percent } => write!(f, "saved {percent:.1}%"),
            SizeChange::Increased { percent } => write!(f, "size increased by {percent:.1}%"),
            SizeChange::Unchanged => f.write_str("size unchanged"),
        }
    }
}
