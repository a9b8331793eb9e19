use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::correspondence::ParameterSet;
use crate::signal::ChannelStatistics;
use crate::spline::SplineCurve;

/// Sizes of the numeric arrays of a [`MorphoResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDims {
    /// Frames `K`.
    pub n_frames: usize,
    pub n_channels: usize,
    /// Angular bins `I`.
    pub n_angular: usize,
    /// Radial layers `J`.
    pub n_radial: usize,
}

/// Accumulated morphodynamics of one sequence.
///
/// Numeric arrays are allocated up front and hold NaN until their frame is
/// committed (serialized as `null`). Frames commit in order and only after
/// every step of the frame succeeded, so `frames_completed` delimits the
/// valid prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorphoResult {
    pub dims: ResultDims,
    /// Fitted curve of each completed frame.
    pub spline: Vec<SplineCurve>,
    /// Start parameters of transition `k−1 → k` on curve `k−1`.
    pub param0: Vec<ParameterSet>,
    /// End parameters of transition `k−1 → k` on curve `k`.
    pub param: Vec<ParameterSet>,
    /// Normal displacement, indexed `[i][k−1]`.
    #[serde(deserialize_with = "nullable_2d")]
    pub displacement: Vec<Vec<f64>>,
    /// Window means, indexed `[channel][j][i][k]`.
    #[serde(deserialize_with = "nullable_4d")]
    pub mean: Vec<Vec<Vec<Vec<f64>>>>,
    /// Window variances, indexed `[channel][j][i][k]`.
    #[serde(deserialize_with = "nullable_4d")]
    pub var: Vec<Vec<Vec<Vec<f64>>>>,
    /// Curve length per frame.
    #[serde(deserialize_with = "nullable_1d")]
    pub length: Vec<f64>,
    /// Enclosed area per frame.
    #[serde(deserialize_with = "nullable_1d")]
    pub area: Vec<f64>,
    /// Accumulated origin per frame.
    #[serde(deserialize_with = "nullable_1d")]
    pub orig: Vec<f64>,
    pub frames_completed: usize,
}

/// Everything one frame contributes to the result.
#[derive(Debug, Clone)]
pub(crate) struct FrameRecord {
    pub spline: SplineCurve,
    pub length: f64,
    pub area: f64,
    pub origin: f64,
    pub transition: Option<Transition>,
    /// One entry per channel, each indexed `[j][i]`.
    pub signals: Vec<ChannelStatistics>,
}

/// Correspondence and displacement of transition `k−1 → k`.
#[derive(Debug, Clone)]
pub(crate) struct Transition {
    pub start: ParameterSet,
    pub end: ParameterSet,
    pub displacement: Vec<f64>,
}

impl MorphoResult {
    /// Empty record sized for `dims`.
    pub fn new(dims: ResultDims) -> Self {
        let ResultDims {
            n_frames: k,
            n_channels: m,
            n_angular: i,
            n_radial: j,
        } = dims;
        let stats = vec![vec![vec![vec![f64::NAN; k]; i]; j]; m];
        Self {
            dims,
            spline: Vec::with_capacity(k),
            param0: Vec::with_capacity(k.saturating_sub(1)),
            param: Vec::with_capacity(k.saturating_sub(1)),
            displacement: vec![vec![f64::NAN; k.saturating_sub(1)]; i],
            mean: stats.clone(),
            var: stats,
            length: vec![f64::NAN; k],
            area: vec![f64::NAN; k],
            orig: vec![f64::NAN; k],
            frames_completed: 0,
        }
    }

    /// True once every frame has been committed.
    pub fn is_complete(&self) -> bool {
        self.frames_completed == self.dims.n_frames
    }

    /// Write frame `frames_completed`.
    pub(crate) fn commit(&mut self, record: FrameRecord) {
        let k = self.frames_completed;
        debug_assert!(k < self.dims.n_frames);
        debug_assert_eq!(record.signals.len(), self.dims.n_channels);

        self.length[k] = record.length;
        self.area[k] = record.area;
        self.orig[k] = record.origin;
        self.spline.push(record.spline);

        if let Some(tr) = record.transition {
            for (row, &d) in self.displacement.iter_mut().zip(&tr.displacement) {
                row[k - 1] = d;
            }
            self.param0.push(tr.start);
            self.param.push(tr.end);
        }

        for (m, ch) in record.signals.iter().enumerate() {
            for (j, (mean_row, var_row)) in ch.mean.iter().zip(&ch.var).enumerate() {
                for (i, (&mu, &v)) in mean_row.iter().zip(var_row).enumerate() {
                    self.mean[m][j][i][k] = mu;
                    self.var[m][j][i][k] = v;
                }
            }
        }
        self.frames_completed = k + 1;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Write the record as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

// NaN is written as `null`; read it back as NaN.

fn nan_if_null(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

fn nullable_1d<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
    let raw = Vec::<Option<f64>>::deserialize(d)?;
    Ok(raw.into_iter().map(nan_if_null).collect())
}

fn nullable_2d<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<f64>>, D::Error> {
    let raw = Vec::<Vec<Option<f64>>>::deserialize(d)?;
    Ok(raw
        .into_iter()
        .map(|row| row.into_iter().map(nan_if_null).collect())
        .collect())
}

fn nullable_4d<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<Vec<Vec<f64>>>>, D::Error> {
    let raw = Vec::<Vec<Vec<Vec<Option<f64>>>>>::deserialize(d)?;
    Ok(raw
        .into_iter()
        .map(|a| {
            a.into_iter()
                .map(|b| {
                    b.into_iter()
                        .map(|c| c.into_iter().map(nan_if_null).collect())
                        .collect()
                })
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::{fit_spline, SplineFitConfig};
    use crate::test_utils::circle_contour;

    fn dims() -> ResultDims {
        ResultDims {
            n_frames: 3,
            n_channels: 2,
            n_angular: 4,
            n_radial: 2,
        }
    }

    fn record(origin: f64, transition: Option<Transition>) -> FrameRecord {
        let spline = fit_spline(&circle_contour([10.0, 10.0], 5.0, 40, 0.0), &SplineFitConfig::default())
            .expect("fit");
        let stats = ChannelStatistics {
            mean: vec![vec![1.0; 4]; 2],
            var: vec![vec![0.5; 4]; 2],
        };
        FrameRecord {
            spline,
            length: 31.4,
            area: 78.5,
            origin,
            transition,
            signals: vec![stats.clone(), stats],
        }
    }

    #[test]
    fn new_record_is_nan_filled_with_declared_shapes() {
        let r = MorphoResult::new(dims());
        assert_eq!(r.displacement.len(), 4);
        assert_eq!(r.displacement[0].len(), 2);
        assert_eq!(r.mean.len(), 2);
        assert_eq!(r.mean[0].len(), 2);
        assert_eq!(r.mean[0][0].len(), 4);
        assert_eq!(r.mean[0][0][0].len(), 3);
        assert!(r.length.iter().all(|v| v.is_nan()));
        assert_eq!(r.frames_completed, 0);
    }

    #[test]
    fn commits_fill_frames_in_order() {
        let mut r = MorphoResult::new(dims());
        r.commit(record(0.0, None));
        r.commit(record(
            0.1,
            Some(Transition {
                start: ParameterSet::uniform(4, 0.0),
                end: ParameterSet::uniform(4, 0.1),
                displacement: vec![0.5, 0.6, 0.7, 0.8],
            }),
        ));
        assert_eq!(r.frames_completed, 2);
        assert!(!r.is_complete());
        assert_eq!(r.orig[1], 0.1);
        assert_eq!(r.displacement[3][0], 0.8);
        assert!(r.displacement[3][1].is_nan());
        assert_eq!(r.mean[1][1][3][1], 1.0);
        assert!(r.var[1][1][3][2].is_nan());
        assert_eq!(r.param0.len(), 1);
    }

    #[test]
    fn json_keeps_nan_slots() {
        let mut r = MorphoResult::new(dims());
        r.commit(record(0.0, None));
        let json = r.to_json().expect("serialize");
        let back = MorphoResult::from_json_str(&json).expect("deserialize");
        assert_eq!(back.frames_completed, 1);
        approx::assert_relative_eq!(back.length[0], 31.4);
        assert!(back.length[1].is_nan());
        assert!(back.displacement[0][0].is_nan());
        assert_eq!(back.spline.len(), 1);
    }
}
