//! Transformation steps and their tag registry.
//!
//! Each step is described by a serializable [`StepSpec`] (what to build) and
//! fitted into a [`FittedStep`] (learned per-column parameters). Steps are
//! looked up by enumerated tags so tracked runs never carry executable code.
use std::fmt;
use std::str::FromStr;

use itertools_num::linspace;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, OrderStatistics, Statistics};

use crate::data::Table;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeMethod {
    Mean,
    Median,
    /// Fill with a fixed value.
    Arbitrary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinMethod {
    EqualFrequency,
    EqualWidth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMethod {
    Standard,
    MinMax,
}

macro_rules! tag_registry {
    ($ty:ident, $kind:literal, { $($tag:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = PipelineError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_lowercase().as_str() {
                    $($tag => Ok($ty::$variant),)+
                    _ => Err(PipelineError::UnknownTag {
                        kind: $kind,
                        tag: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let tag = match self {
                    $($ty::$variant => $tag,)+
                };
                f.write_str(tag)
            }
        }
    };
}

tag_registry!(ImputeMethod, "imputer", {
    "mean" => Mean,
    "median" => Median,
    "arbitrary" => Arbitrary,
});

tag_registry!(BinMethod, "discretiser", {
    "equal_frequency" => EqualFrequency,
    "equal_width" => EqualWidth,
});

tag_registry!(ScaleMethod, "scaler", {
    "standard" => Standard,
    "min_max" => MinMax,
});

/// An unfitted transformation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepSpec {
    Imputer {
        method: ImputeMethod,
        #[serde(default)]
        fill_value: f64,
    },
    Discretiser {
        method: BinMethod,
        n_bins: usize,
    },
    Scaler {
        method: ScaleMethod,
    },
}

impl StepSpec {
    /// Name used for the step inside a pipeline.
    pub fn name(&self) -> &'static str {
        match self {
            StepSpec::Imputer { .. } => "imputer",
            StepSpec::Discretiser { .. } => "discretiser",
            StepSpec::Scaler { .. } => "scaler",
        }
    }

    /// Learn per-column parameters from `x`. Missing values are ignored.
    pub fn fit(&self, x: &Table) -> Result<FittedStep> {
        let columns: Vec<Vec<f64>> = (0..x.ncols()).map(|c| present(&x.column_at(c))).collect();

        match *self {
            StepSpec::Imputer { method, fill_value } => {
                let fill = columns
                    .into_iter()
                    .zip(x.columns())
                    .map(|(values, name)| {
                        if values.is_empty() {
                            log::warn!("Column '{}' has no values; imputing with {}", name, fill_value);
                            return fill_value;
                        }
                        match method {
                            ImputeMethod::Mean => values.iter().mean(),
                            ImputeMethod::Median => Data::new(values).median(),
                            ImputeMethod::Arbitrary => fill_value,
                        }
                    })
                    .collect();
                Ok(FittedStep::Imputer(Imputer { fill }))
            }
            StepSpec::Discretiser { method, n_bins } => {
                if n_bins < 2 {
                    return Err(PipelineError::Config(format!(
                        "discretiser needs at least 2 bins, got {}",
                        n_bins
                    )));
                }
                let cuts = columns
                    .into_iter()
                    .map(|values| interior_cuts(values, method, n_bins))
                    .collect();
                Ok(FittedStep::Discretiser(Discretiser { cuts }))
            }
            StepSpec::Scaler { method } => Ok(FittedStep::Scaler(fit_scaler(&columns, method))),
        }
    }
}

/// Per-column fill values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputer {
    pub fill: Vec<f64>,
}

/// Per-column interior cut points; a value falls in bin `k` when it is
/// greater than `k` cut points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discretiser {
    pub cuts: Vec<Vec<f64>>,
}

/// Simple per-column affine scaler: `(x - offset) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub offset: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    /// Minimum scale to avoid division by zero when transforming.
    const MIN_SCALE: f64 = 1e-6;
}

/// A step with learned parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum FittedStep {
    Imputer(Imputer),
    Discretiser(Discretiser),
    Scaler(Scaler),
}

impl FittedStep {
    fn width(&self) -> usize {
        match self {
            FittedStep::Imputer(s) => s.fill.len(),
            FittedStep::Discretiser(s) => s.cuts.len(),
            FittedStep::Scaler(s) => s.offset.len(),
        }
    }

    /// Transform all rows and return a new table.
    pub fn transform(&self, x: &Table) -> Result<Table> {
        if x.ncols() != self.width() {
            return Err(PipelineError::Shape(format!(
                "step was fitted on {} columns, got {}",
                self.width(),
                x.ncols()
            )));
        }

        let mut out = x.clone();
        for col in 0..x.ncols() {
            match self {
                FittedStep::Imputer(s) => {
                    let fill = s.fill[col];
                    out.map_column_mut(col, |v| if v.is_nan() { fill } else { v });
                }
                FittedStep::Discretiser(s) => {
                    let cuts = &s.cuts[col];
                    out.map_column_mut(col, |v| {
                        if v.is_nan() {
                            v
                        } else {
                            cuts.partition_point(|&c| c < v) as f64
                        }
                    });
                }
                FittedStep::Scaler(s) => {
                    let (offset, scale) = (s.offset[col], s.scale[col]);
                    out.map_column_mut(col, |v| (v - offset) / scale);
                }
            }
        }
        Ok(out)
    }
}

fn present(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

fn interior_cuts(values: Vec<f64>, method: BinMethod, n_bins: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut cuts: Vec<f64> = match method {
        BinMethod::EqualFrequency => {
            let mut data = Data::new(values);
            (1..n_bins)
                .map(|i| data.quantile(i as f64 / n_bins as f64))
                .collect()
        }
        BinMethod::EqualWidth => {
            let (lo, hi) = min_max(&values);
            let edges: Vec<f64> = linspace(lo, hi, n_bins + 1).collect();
            edges[1..n_bins].to_vec()
        }
    };
    cuts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    // Duplicate edges collapse into one bin.
    cuts.dedup();
    cuts
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Fit a `Scaler` from per-column values.
fn fit_scaler(columns: &[Vec<f64>], method: ScaleMethod) -> Scaler {
    let mut offset = Vec::with_capacity(columns.len());
    let mut scale = Vec::with_capacity(columns.len());

    for values in columns {
        if values.is_empty() {
            offset.push(0.0);
            scale.push(1.0);
            continue;
        }
        let (o, s) = match method {
            ScaleMethod::Standard => (values.iter().mean(), values.iter().population_std_dev()),
            ScaleMethod::MinMax => {
                let (lo, hi) = min_max(values);
                (lo, hi - lo)
            }
        };
        offset.push(o);
        scale.push(s.max(Scaler::MIN_SCALE));
    }

    Scaler { offset, scale }
}
