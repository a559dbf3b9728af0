use crate::core::reference::ReferenceMode;
use crate::types::Sample;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Micrometers to the native length unit (meters)
const MICROMETER: f64 = 1e-6;

/// Leveled topography together with its provenance
#[derive(Debug, Clone)]
pub struct LevelingResult {
    pub data: Vec<Sample>,
    /// Technique actually applied, for the trailer
    pub description: String,
    /// Uniform offset that was subtracted from every sample
    pub offset: f64,
}

/// Reference leveling of a single profile or a full field
pub struct DataLeveler<'a> {
    samples: &'a [Sample],
    points_per_profile: usize,
    profile_count: Option<usize>,
}

impl<'a> DataLeveler<'a> {
    /// Leveler for one extracted profile
    pub fn profile(samples: &'a [Sample]) -> Self {
        Self {
            samples,
            points_per_profile: samples.len(),
            profile_count: None,
        }
    }

    /// Leveler for a field of `profile_count` rows of `points_per_profile` samples.
    ///
    /// The sample count must equal `points_per_profile * profile_count`; the
    /// pipeline checks this before leveling.
    pub fn field(samples: &'a [Sample], points_per_profile: usize, profile_count: usize) -> Self {
        Self {
            samples,
            points_per_profile,
            profile_count: Some(profile_count),
        }
    }

    /// Subtract the reference selected by `mode`; `bias_um` is only used by
    /// [`ReferenceMode::Bias`].
    pub fn level(&self, mode: ReferenceMode, bias_um: f64) -> LevelingResult {
        log::debug!(
            "Leveling {} samples ({} per profile, {:?} profiles) with {:?}",
            self.samples.len(),
            self.points_per_profile,
            self.profile_count,
            mode
        );

        if self.samples.is_empty() {
            return self.unchanged(mode, bias_um);
        }

        match mode {
            ReferenceMode::None => self.unchanged(mode, bias_um),
            ReferenceMode::Line => self.subtract_fit(mode, bias_um, false, false),
            ReferenceMode::LinePositive => self.subtract_fit(mode, bias_um, false, true),
            ReferenceMode::LeastSquares => self.subtract_fit(mode, bias_um, true, false),
            ReferenceMode::LeastSquaresPositive => self.subtract_fit(mode, bias_um, true, true),
            _ => {
                let reference = self.scalar_reference(mode, bias_um);
                LevelingResult {
                    data: self.samples.iter().map(|z| z - reference).collect(),
                    description: self.describe(mode, bias_um),
                    offset: reference,
                }
            }
        }
    }

    fn unchanged(&self, mode: ReferenceMode, bias_um: f64) -> LevelingResult {
        LevelingResult {
            data: self.samples.to_vec(),
            description: self.describe(mode, bias_um),
            offset: 0.0,
        }
    }

    fn scalar_reference(&self, mode: ReferenceMode, bias_um: f64) -> f64 {
        let samples = self.samples;
        match mode {
            ReferenceMode::Minimum => finite(samples).fold(f64::INFINITY, f64::min),
            ReferenceMode::Maximum => finite(samples).fold(f64::NEG_INFINITY, f64::max),
            ReferenceMode::Average => mean(samples),
            ReferenceMode::Central => {
                let min = finite(samples).fold(f64::INFINITY, f64::min);
                let max = finite(samples).fold(f64::NEG_INFINITY, f64::max);
                (min + max) / 2.0
            }
            ReferenceMode::Bias => bias_um * MICROMETER,
            ReferenceMode::First => samples[0],
            ReferenceMode::Last => samples[samples.len() - 1],
            ReferenceMode::Center => samples[samples.len() / 2],
            _ => 0.0,
        }
    }

    fn subtract_fit(
        &self,
        mode: ReferenceMode,
        bias_um: f64,
        whole_field: bool,
        positive: bool,
    ) -> LevelingResult {
        let mut field = self.as_field();

        if whole_field && field.nrows() > 1 {
            let (a, b, c) = fit_plane(field.view());
            let (x0, y0) = grid_center(field.view());
            for ((row, col), z) in field.indexed_iter_mut() {
                *z -= a + b * (col as f64 - x0) + c * (row as f64 - y0);
            }
        } else {
            for mut row in field.axis_iter_mut(Axis(0)) {
                let (intercept, slope) = fit_line(row.view());
                let x0 = (row.len() as f64 - 1.0) / 2.0;
                for (col, z) in row.iter_mut().enumerate() {
                    *z -= intercept + slope * (col as f64 - x0);
                }
            }
        }

        let mut offset = 0.0;
        if positive {
            let lowest = field
                .iter()
                .copied()
                .filter(|z| z.is_finite())
                .fold(f64::INFINITY, f64::min);
            if lowest.is_finite() {
                field.mapv_inplace(|z| z - lowest);
                offset = lowest;
            }
        }

        LevelingResult {
            data: field.into_raw_vec(),
            description: self.describe(mode, bias_um),
            offset,
        }
    }

    /// Samples as a `rows x points` array; a single profile is one row.
    fn as_field(&self) -> Array2<Sample> {
        let cols = self.points_per_profile.max(1);
        let rows = match self.profile_count {
            Some(count) if count * cols == self.samples.len() => count,
            _ => 1,
        };
        let cols = self.samples.len() / rows;
        Array2::from_shape_fn((rows, cols), |(row, col)| self.samples[row * cols + col])
    }

    fn is_field(&self) -> bool {
        matches!(self.profile_count, Some(count) if count > 1)
    }

    fn describe(&self, mode: ReferenceMode, bias_um: f64) -> String {
        let fit_surface = if self.is_field() { "plane" } else { "line" };
        match mode {
            ReferenceMode::None => "no reference".to_string(),
            ReferenceMode::Minimum => "minimum value".to_string(),
            ReferenceMode::Maximum => "maximum value".to_string(),
            ReferenceMode::Average => "average value".to_string(),
            ReferenceMode::Central => "central value (mid-range)".to_string(),
            ReferenceMode::Bias => format!("bias value of {} um", bias_um),
            ReferenceMode::First => "first value".to_string(),
            ReferenceMode::Last => "last value".to_string(),
            ReferenceMode::Center => "center value".to_string(),
            ReferenceMode::Line => "linear regression per profile".to_string(),
            ReferenceMode::LeastSquares => format!("least squares {}", fit_surface),
            ReferenceMode::LinePositive => {
                "linear regression per profile, positive".to_string()
            }
            ReferenceMode::LeastSquaresPositive => {
                format!("least squares {}, positive", fit_surface)
            }
        }
    }
}

fn finite(samples: &[Sample]) -> impl Iterator<Item = f64> + '_ {
    samples.iter().copied().filter(|z| z.is_finite())
}

fn mean(samples: &[Sample]) -> f64 {
    let (sum, count) = finite(samples).fold((0.0, 0usize), |(s, n), z| (s + z, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn grid_center(field: ArrayView2<Sample>) -> (f64, f64) {
    let (rows, cols) = field.dim();
    ((cols as f64 - 1.0) / 2.0, (rows as f64 - 1.0) / 2.0)
}

/// Least squares line `z = intercept + slope * (x - x0)`, x0 the middle index.
///
/// Non-finite samples are skipped.
fn fit_line(row: ArrayView1<Sample>) -> (f64, f64) {
    let x0 = (row.len() as f64 - 1.0) / 2.0;
    let mut n = 0.0;
    let mut sx = 0.0;
    let mut sz = 0.0;
    let mut sxx = 0.0;
    let mut sxz = 0.0;
    for (i, &z) in row.iter().enumerate() {
        if !z.is_finite() {
            continue;
        }
        let x = i as f64 - x0;
        n += 1.0;
        sx += x;
        sz += z;
        sxx += x * x;
        sxz += x * z;
    }
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let denominator = n * sxx - sx * sx;
    if denominator.abs() < f64::EPSILON {
        return (sz / n, 0.0);
    }
    let slope = (n * sxz - sx * sz) / denominator;
    let intercept = (sz - slope * sx) / n;
    (intercept, slope)
}

/// Least squares plane `z = a + b * (x - x0) + c * (y - y0)` over the grid,
/// coordinates centered on the field. Non-finite samples are skipped.
fn fit_plane(field: ArrayView2<Sample>) -> (f64, f64, f64) {
    let (x0, y0) = grid_center(field);

    // normal equations, symmetric 3x3
    let mut m = [[0.0f64; 3]; 3];
    let mut v = [0.0f64; 3];
    for ((row, col), &z) in field.indexed_iter() {
        if !z.is_finite() {
            continue;
        }
        let basis = [1.0, col as f64 - x0, row as f64 - y0];
        for i in 0..3 {
            for j in 0..3 {
                m[i][j] += basis[i] * basis[j];
            }
            v[i] += basis[i] * z;
        }
    }

    match solve3(m, v) {
        Some([a, b, c]) => (a, b, c),
        None => {
            // degenerate support, fall back to the mean
            let a = if m[0][0] > 0.0 { v[0] / m[0][0] } else { 0.0 };
            (a, 0.0, 0.0)
        }
    }
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Cramer's rule
fn solve3(m: [[f64; 3]; 3], v: [f64; 3]) -> Option<[f64; 3]> {
    let det = det3(&m);
    if det.abs() < 1e-12 {
        return None;
    }
    let mut solution = [0.0; 3];
    for (k, value) in solution.iter_mut().enumerate() {
        let mut mk = m;
        for i in 0..3 {
            mk[i][k] = v[i];
        }
        *value = det3(&mk) / det;
    }
    Some(solution)
}
