//! Per-frame loop: segment → fit → origin/correspondence → windows →
//! signals/displacement → commit.

use crate::config::{AnalysisConfig, ConfigError, RunDimensions};
use crate::correspondence::{CorrespondenceSolver, ParameterSet};
use crate::displacement::DisplacementProjector;
use crate::error::{FrameError, MorphoError, ShapeMismatchError};
use crate::origin::OriginTracker;
use crate::segmentation::Segmenter;
use crate::signal::SignalSampler;
use crate::source::ImageSource;
use crate::spline::{fit_spline, SplineCurve};
use crate::windows::WindowGridBuilder;
use crate::FloatImage;

use super::result::{FrameRecord, MorphoResult, ResultDims, Transition};

/// Drives the analysis of one image sequence.
///
/// Configuration and run dimensions are validated once, at construction.
#[derive(Debug, Clone)]
pub struct MorphoAnalyzer {
    config: AnalysisConfig,
    dims: RunDimensions,
}

impl MorphoAnalyzer {
    pub fn new(config: AnalysisConfig, dims: RunDimensions) -> Result<Self, ConfigError> {
        config.validate()?;
        dims.validate()?;
        Ok(Self { config, dims })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn dims(&self) -> &RunDimensions {
        &self.dims
    }

    /// Shape of the result record this analyzer fills.
    pub fn result_dims(&self) -> ResultDims {
        ResultDims {
            n_frames: self.dims.n_frames,
            n_channels: self.dims.n_channels,
            n_angular: self.config.n_angular,
            n_radial: self.config.n_radial,
        }
    }

    /// Empty, pre-sized result record for this run.
    pub fn new_result(&self) -> MorphoResult {
        MorphoResult::new(self.result_dims())
    }

    /// Analyze the whole sequence.
    ///
    /// Partial results are dropped on failure; use
    /// [`MorphoAnalyzer::analyze_into`] to keep them.
    pub fn analyze(
        &self,
        source: &dyn ImageSource,
        segmenter: &dyn Segmenter,
    ) -> Result<MorphoResult, FrameError> {
        let mut result = self.new_result();
        self.analyze_into(source, segmenter, &mut result)?;
        Ok(result)
    }

    /// Analyze frames `0..K` into a caller-owned record.
    ///
    /// The run stops at the first failing frame; `result` then holds every
    /// frame before it and `result.frames_completed` equals the failing
    /// frame index.
    pub fn analyze_into(
        &self,
        source: &dyn ImageSource,
        segmenter: &dyn Segmenter,
        result: &mut MorphoResult,
    ) -> Result<(), FrameError> {
        if result.dims != self.result_dims() || result.frames_completed != 0 {
            return Err(FrameError {
                frame: 0,
                error: ConfigError::Invalid(
                    "result record does not match the run dimensions or is not empty".into(),
                )
                .into(),
            });
        }
        if source.n_frames() < self.dims.n_frames || source.n_channels() < self.dims.n_channels {
            return Err(FrameError {
                frame: 0,
                error: ConfigError::Invalid(format!(
                    "source has {} frames and {} channels, run needs {} and {}",
                    source.n_frames(),
                    source.n_channels(),
                    self.dims.n_frames,
                    self.dims.n_channels
                ))
                .into(),
            });
        }

        let solver = CorrespondenceSolver::new(self.config.correspondence.clone());
        let builder = WindowGridBuilder::new(
            self.config.n_angular,
            self.config.n_radial,
            self.config.windows.clone(),
        );
        let stages = Stages {
            solver: &solver,
            builder: &builder,
            sampler: SignalSampler::new(),
            projector: DisplacementProjector::new(),
        };

        tracing::info!(
            frames = self.dims.n_frames,
            channels = self.dims.n_channels,
            n_angular = self.config.n_angular,
            n_radial = self.config.n_radial,
            "starting morphodynamics analysis"
        );

        let mut tracker = OriginTracker::new(self.config.origin.clone());
        let mut previous: Option<SplineCurve> = None;

        for k in 0..self.dims.n_frames {
            let record = self
                .process_frame(k, source, segmenter, &stages, &tracker, previous.as_ref())
                .map_err(|error| {
                    tracing::error!(frame = k, kind = error.kind(), %error, "frame failed");
                    FrameError { frame: k, error }
                })?;

            tracing::info!(
                frame = k,
                length = record.length,
                area = record.area,
                origin = record.origin,
                "frame done"
            );

            tracker.advance(record.origin);
            previous = Some(record.spline.clone());
            result.commit(record);
        }
        Ok(())
    }

    fn process_frame(
        &self,
        k: usize,
        source: &dyn ImageSource,
        segmenter: &dyn Segmenter,
        stages: &Stages<'_>,
        tracker: &OriginTracker,
        previous: Option<&SplineCurve>,
    ) -> Result<FrameRecord, MorphoError> {
        let n_angular = self.config.n_angular;

        let morpho = source.load_frame_morpho(k)?;
        self.check_shape(&morpho, None, k)?;

        let contour = segmenter.segment(&morpho, k)?;
        let spline = fit_spline(&contour, &self.config.spline)?;
        let length = spline.length();
        let area = spline.area();

        let (origin, transition) = match previous {
            None => (0.0, None),
            Some(prev) => {
                let origin = tracker.estimate(prev, &spline);
                let start = ParameterSet::uniform(n_angular, tracker.current());
                let guess = ParameterSet::uniform(n_angular, origin);
                let corr = stages.solver.solve(prev, &spline, &start, &guess)?;
                let displacement = stages.projector.project(prev, &spline, &start, &corr.end)?;
                let transition = Transition {
                    start,
                    end: corr.end,
                    displacement,
                };
                (origin, Some(transition))
            }
        };

        let grid = stages.builder.build(self.dims.shape, &spline, origin)?;

        let channels = (0..self.dims.n_channels)
            .map(|m| {
                let img = source.load_frame_signal(m, k)?;
                self.check_shape(&img, Some(m), k)?;
                Ok(img)
            })
            .collect::<Result<Vec<FloatImage>, MorphoError>>()?;
        let signals = stages.sampler.sample_channels(&grid, &channels, k)?;

        Ok(FrameRecord {
            spline,
            length,
            area,
            origin,
            transition,
            signals,
        })
    }

    fn check_shape(
        &self,
        image: &FloatImage,
        channel: Option<usize>,
        frame: usize,
    ) -> Result<(), ShapeMismatchError> {
        let got = [image.width(), image.height()];
        if got != self.dims.shape {
            return Err(ShapeMismatchError {
                expected: self.dims.shape,
                got,
                channel,
                frame,
            });
        }
        Ok(())
    }
}

/// Frame-independent stage objects shared by all frames of a run.
struct Stages<'a> {
    solver: &'a CorrespondenceSolver,
    builder: &'a WindowGridBuilder,
    sampler: SignalSampler,
    projector: DisplacementProjector,
}
