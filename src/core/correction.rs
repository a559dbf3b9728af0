use crate::types::TopoResult;
use serde::{Deserialize, Serialize};

/// Something able to compensate interferometric nonlinearity in place
pub trait NonlinearityCorrector {
    /// Apply the correction and return its span in the native length unit
    fn correct_nonlinearity(&mut self) -> TopoResult<f64>;
}

/// What happened to the nonlinearity correction during a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CorrectionOutcome {
    NotRequested,
    /// Correction applied; carries the span in meters
    Applied(f64),
    Failed,
}

impl CorrectionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CorrectionOutcome::Applied(_))
    }
}

/// Run the correction when enabled. A failing corrector is not fatal, the
/// data simply stays uncorrected.
pub fn apply_correction<C: NonlinearityCorrector + ?Sized>(
    enabled: bool,
    corrector: &mut C,
) -> CorrectionOutcome {
    if !enabled {
        return CorrectionOutcome::NotRequested;
    }

    match corrector.correct_nonlinearity() {
        Ok(span) => {
            log::info!("Nonlinearity correction applied, span {:.2} nm", span * 1e9);
            CorrectionOutcome::Applied(span)
        }
        Err(e) => {
            log::warn!("{}, continuing with uncorrected data", e);
            CorrectionOutcome::Failed
        }
    }
}
