//! Value -> color scales used to paint the active layer.
//!
//! A scale is fitted once per dataset and never mutated afterwards; a new dataset means a new scale.

use std::str::FromStr;

use choropleth_shared::Color;

/// Capability shared by every fitted scale.
pub trait Scale {
    /// Color for a value, `None` when the scale has no mapping for it.
    fn color_for(&self, value: f64) -> Option<Color>;

    /// Value interval covered by `color`, `None` when the color is not part of the scale.
    fn bounds_for(&self, color: Color) -> Option<(f64, f64)>;

    /// Colors the scale can produce, in bucket order.
    fn available_colors(&self) -> &[Color];
}

/// Which scale to fit on each new dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScaleKind {
    /// Equal-width buckets over `[min, max]`.
    #[default]
    Quantize,
    /// Equal-population buckets.
    Quantile,
    /// Explicit ascending breakpoints, or `max / n` wide steps starting at the minimum.
    FixedBoundaries { steps: Option<Vec<f64>> },
}

impl ScaleKind {
    pub fn fit(&self, dataset: &[f64], palette: &[Color]) -> ColorScale {
        let values: Vec<f64> = dataset.iter().copied().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return ColorScale::Empty(EmptyScale {
                colors: palette.first().copied().into_iter().collect(),
            });
        }

        match self {
            Self::Quantize => ColorScale::Quantize(QuantizeScale::fit(&values, palette)),
            Self::Quantile => ColorScale::Quantile(QuantileScale::fit(&values, palette)),
            Self::FixedBoundaries { steps } => ColorScale::FixedBoundaries(
                FixedBoundariesScale::fit(&values, palette, steps.as_deref()),
            ),
        }
    }
}

impl FromStr for ScaleKind {
    type Err = String;

    /// `quantize`, `quantile`, `fixed`, or `fixed:<b0>,<b1>,...`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "quantize" => return Ok(Self::Quantize),
            "quantile" => return Ok(Self::Quantile),
            "fixed" => return Ok(Self::FixedBoundaries { steps: None }),
            _ => {}
        }

        let Some(raw_steps) = normalized.strip_prefix("fixed:") else {
            return Err(format!("unknown scale kind: {s}"));
        };
        let steps = raw_steps
            .split(',')
            .map(str::trim)
            .filter(|step| !step.is_empty())
            .map(|step| {
                step.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| format!("invalid breakpoint: {step}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if steps.is_empty() {
            return Err("fixed scale needs at least one breakpoint".to_string());
        }
        if steps.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err("fixed breakpoints must be ascending".to_string());
        }
        Ok(Self::FixedBoundaries { steps: Some(steps) })
    }
}

/// Number of buckets: never more colors than data points.
fn bucket_count(palette: &[Color], dataset_len: usize) -> usize {
    palette.len().min(dataset_len)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColorScale {
    Empty(EmptyScale),
    Quantize(QuantizeScale),
    Quantile(QuantileScale),
    FixedBoundaries(FixedBoundariesScale),
}

impl ColorScale {
    fn inner(&self) -> &dyn Scale {
        match self {
            Self::Empty(scale) => scale,
            Self::Quantize(scale) => scale,
            Self::Quantile(scale) => scale,
            Self::FixedBoundaries(scale) => scale,
        }
    }
}

impl Scale for ColorScale {
    fn color_for(&self, value: f64) -> Option<Color> {
        self.inner().color_for(value)
    }

    fn bounds_for(&self, color: Color) -> Option<(f64, f64)> {
        self.inner().bounds_for(color)
    }

    fn available_colors(&self) -> &[Color] {
        self.inner().available_colors()
    }
}

/// Fitted on an empty dataset: everything maps to the palette's first color.
#[derive(Debug, Clone, PartialEq)]
pub struct EmptyScale {
    colors: Vec<Color>,
}

impl Scale for EmptyScale {
    fn color_for(&self, _value: f64) -> Option<Color> {
        self.colors.first().copied()
    }

    fn bounds_for(&self, _color: Color) -> Option<(f64, f64)> {
        None
    }

    fn available_colors(&self) -> &[Color] {
        &self.colors
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantizeScale {
    min: f64,
    max: f64,
    colors: Vec<Color>,
}

impl QuantizeScale {
    fn fit(values: &[f64], palette: &[Color]) -> Self {
        let (min, max) = min_max(values);
        let n = bucket_count(palette, values.len());
        Self {
            min,
            max,
            colors: palette[..n].to_vec(),
        }
    }

    fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    fn bucket_width(&self) -> f64 {
        (self.max - self.min) / self.colors.len() as f64
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

impl Scale for QuantizeScale {
    fn color_for(&self, value: f64) -> Option<Color> {
        if !value.is_finite() || self.colors.is_empty() {
            return None;
        }
        if self.is_degenerate() {
            return self.colors.first().copied();
        }
        let n = self.colors.len();
        let raw = ((value - self.min) / self.bucket_width()).floor();
        let index = if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(n - 1)
        };
        self.colors.get(index).copied()
    }

    fn bounds_for(&self, color: Color) -> Option<(f64, f64)> {
        let index = self.colors.iter().position(|c| *c == color)?;
        if self.is_degenerate() {
            return (index == 0).then_some((self.min, self.max));
        }
        let width = self.bucket_width();
        let low = self.min + index as f64 * width;
        let high = if index + 1 == self.colors.len() {
            self.max
        } else {
            self.min + (index + 1) as f64 * width
        };
        Some((low, high))
    }

    fn available_colors(&self) -> &[Color] {
        &self.colors
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantileScale {
    sorted: Vec<f64>,
    thresholds: Vec<f64>,
    colors: Vec<Color>,
}

impl QuantileScale {
    fn fit(values: &[f64], palette: &[Color]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = bucket_count(palette, sorted.len());
        let thresholds = (1..n)
            .map(|i| quantile(&sorted, i as f64 / n as f64))
            .collect();
        Self {
            sorted,
            thresholds,
            colors: palette[..n].to_vec(),
        }
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }
}

/// Linear-interpolated p-quantile of a sorted, non-empty slice.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * p;
    let lower = position.floor() as usize;
    let fraction = position - lower as f64;
    let base = sorted[lower];
    match sorted.get(lower + 1) {
        Some(next) if fraction > 0.0 => base + fraction * (next - base),
        _ => base,
    }
}

impl Scale for QuantileScale {
    fn color_for(&self, value: f64) -> Option<Color> {
        if !value.is_finite() {
            return None;
        }
        let index = self.thresholds.partition_point(|t| *t <= value);
        self.colors.get(index).copied()
    }

    fn bounds_for(&self, color: Color) -> Option<(f64, f64)> {
        let index = self.colors.iter().position(|c| *c == color)?;
        let low = match index {
            0 => *self.sorted.first()?,
            _ => self.thresholds[index - 1],
        };
        let high = match self.thresholds.get(index) {
            Some(threshold) => *threshold,
            None => *self.sorted.last()?,
        };
        Some((low, high))
    }

    fn available_colors(&self) -> &[Color] {
        &self.colors
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedBoundariesScale {
    steps: Vec<f64>,
    colors: Vec<Color>,
    min: f64,
    max: f64,
}

impl FixedBoundariesScale {
    fn fit(values: &[f64], palette: &[Color], steps: Option<&[f64]>) -> Self {
        let (min, max) = min_max(values);
        let (steps, colors) = match steps {
            Some(steps) => (
                steps.to_vec(),
                palette.iter().take(steps.len()).copied().collect(),
            ),
            None => {
                // Steps run from zero, with a width derived from the maximum alone.
                let n = bucket_count(palette, values.len());
                let step = max / n as f64;
                (
                    (0..n).map(|j| j as f64 * step).collect(),
                    palette[..n].to_vec(),
                )
            }
        };
        Self {
            steps,
            colors,
            min,
            max,
        }
    }

    pub fn steps(&self) -> &[f64] {
        &self.steps
    }
}

impl Scale for FixedBoundariesScale {
    fn color_for(&self, value: f64) -> Option<Color> {
        if !value.is_finite() {
            return None;
        }
        match self.steps.iter().rposition(|step| value >= *step) {
            Some(index) => self.colors.get(index).copied(),
            None => self.colors.last().copied(),
        }
    }

    fn bounds_for(&self, color: Color) -> Option<(f64, f64)> {
        let index = self.colors.iter().position(|c| *c == color)?;
        let step = *self.steps.get(index)?;

        let high = if index + 1 >= self.steps.len() && self.max > step {
            self.max
        } else {
            *self.steps.get(index + 1)?
        };
        let low = if index == 0 && self.min < step {
            self.min
        } else {
            step
        };
        Some((low, high))
    }

    fn available_colors(&self) -> &[Color] {
        &self.colors
    }
}
