//! Run configuration: analysis parameters, run dimensions and the
//! declarative dataset table.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::correspondence::CorrespondenceConfig;
use crate::origin::OriginConfig;
use crate::segmentation::SegmentationConfig;
use crate::spline::SplineFitConfig;
use crate::windows::{RadialBanding, WindowConfig};

// ── Error type ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter is out of its valid range.
    Invalid(String),
    /// A configuration file could not be read.
    Io { path: PathBuf, message: String },
    /// A configuration document could not be parsed.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
            Self::Io { path, message } => write!(f, "{}: {}", path.display(), message),
            Self::Parse(msg) => write!(f, "cannot parse configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
}

// ── Analysis parameters ────────────────────────────────────────────────────

/// Parameters of the morphodynamic analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of angular bins `I` (correspondence points per frame).
    pub n_angular: usize,
    /// Number of radial layers `J`.
    pub n_radial: usize,
    /// Curve fitting (smoothing λ).
    pub spline: SplineFitConfig,
    /// Correspondence functional and solver (weight w).
    pub correspondence: CorrespondenceConfig,
    /// Origin tracking search.
    pub origin: OriginConfig,
    /// Window construction.
    pub windows: WindowConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            n_angular: 32,
            n_radial: 4,
            spline: SplineFitConfig::default(),
            correspondence: CorrespondenceConfig::default(),
            origin: OriginConfig::default(),
            windows: WindowConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON file; absent fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_json(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_angular < 3 {
            return Err(invalid(format!("n_angular must be >= 3, got {}", self.n_angular)));
        }
        if self.n_radial < 1 {
            return Err(invalid("n_radial must be >= 1"));
        }
        if !non_negative(self.spline.smoothing) {
            return Err(invalid("spline.smoothing must be >= 0"));
        }
        if !positive(self.spline.max_closing_gap_factor) {
            return Err(invalid("spline.max_closing_gap_factor must be > 0"));
        }
        let c = &self.correspondence;
        if !non_negative(c.weight) || !c.weight.is_finite() {
            return Err(invalid("correspondence.weight must be finite and >= 0"));
        }
        if c.max_iters == 0 {
            return Err(invalid("correspondence.max_iters must be > 0"));
        }
        if !non_negative(c.gtol) {
            return Err(invalid("correspondence.gtol must be >= 0"));
        }
        if !positive(self.origin.search_halfwidth) {
            return Err(invalid("origin.search_halfwidth must be > 0"));
        }
        if !positive(self.windows.samples_per_pixel) {
            return Err(invalid("windows.samples_per_pixel must be > 0"));
        }
        if let RadialBanding::FixedDepth { depth_px } = self.windows.banding {
            if !positive(depth_px) {
                return Err(invalid("windows.banding.fixed_depth.depth_px must be > 0"));
            }
        }
        Ok(())
    }
}

/// NaN fails both checks.
fn positive(v: f64) -> bool {
    v.partial_cmp(&0.0) == Some(Ordering::Greater)
}

fn non_negative(v: f64) -> bool {
    matches!(v.partial_cmp(&0.0), Some(Ordering::Greater | Ordering::Equal))
}

// ── Run dimensions ─────────────────────────────────────────────────────────

/// Frame count, channel count and image shape of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDimensions {
    pub n_frames: usize,
    pub n_channels: usize,
    /// `[width, height]` of every image of the run.
    pub shape: [u32; 2],
}

impl RunDimensions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_frames == 0 {
            return Err(invalid("n_frames must be > 0"));
        }
        if self.shape[0] == 0 || self.shape[1] == 0 {
            return Err(invalid(format!(
                "image shape must be non-empty, got {}x{}",
                self.shape[0], self.shape[1]
            )));
        }
        Ok(())
    }
}

// ── Dataset table ──────────────────────────────────────────────────────────

/// One named image sequence: where its files are and how to segment it.
///
/// File templates are relative to `directory` and may contain `{k}` (frame
/// number) or a zero-padded `{k:0N}`; the number substituted for frame `k` is
/// `first_index + k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub directory: PathBuf,
    /// Morphology (segmentation) channel file template.
    pub morpho_template: String,
    /// One file template per signal channel.
    #[serde(default)]
    pub signal_templates: Vec<String>,
    #[serde(default = "default_first_index")]
    pub first_index: usize,
    pub n_frames: usize,
    /// `[width, height]`.
    pub shape: [u32; 2],
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

fn default_first_index() -> usize {
    1
}

impl DatasetConfig {
    pub fn dimensions(&self) -> RunDimensions {
        RunDimensions {
            n_frames: self.n_frames,
            n_channels: self.signal_templates.len(),
            shape: self.shape,
        }
    }

    pub fn morpho_path(&self, frame: usize) -> PathBuf {
        self.directory
            .join(render_template(&self.morpho_template, self.first_index + frame))
    }

    pub fn signal_path(&self, channel: usize, frame: usize) -> Option<PathBuf> {
        self.signal_templates
            .get(channel)
            .map(|t| self.directory.join(render_template(t, self.first_index + frame)))
    }

    /// Display name of a signal channel: the first path component of its
    /// template, or the template itself.
    pub fn channel_name(&self, channel: usize) -> Option<&str> {
        let t = self.signal_templates.get(channel)?;
        Some(t.split('/').next().unwrap_or(t))
    }
}

/// Named datasets, stored as a JSON list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetTable {
    datasets: Vec<DatasetConfig>,
}

impl DatasetTable {
    pub fn new(datasets: Vec<DatasetConfig>) -> Self {
        Self { datasets }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_json(path)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn datasets(&self) -> &[DatasetConfig] {
        &self.datasets
    }
}

/// Substitute `{k}` and `{k:0N}` placeholders with `index`.
pub fn render_template(template: &str, index: usize) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let inner = &tail[1..close];
        match inner.strip_prefix('k') {
            Some("") => out.push_str(&index.to_string()),
            Some(fmt) => match fmt
                .strip_prefix(":0")
                .and_then(|w| w.parse::<usize>().ok())
            {
                Some(width) => out.push_str(&format!("{:0width$}", index, width = width)),
                None => out.push_str(&tail[..=close]),
            },
            None => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}
