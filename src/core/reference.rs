use serde::{Deserialize, Serialize};

/// Height reference (leveling) techniques
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceMode {
    /// Leave the data untouched
    None,
    Minimum,
    Maximum,
    Average,
    /// Mid-range, (min + max) / 2
    Central,
    /// User supplied constant
    Bias,
    First,
    Last,
    /// Middle sample of the array
    Center,
    /// Straight line fitted per profile
    Line,
    /// Line (1-D) or plane (2-D) fitted over the whole field
    LeastSquares,
    LinePositive,
    LeastSquaresPositive,
}

impl ReferenceMode {
    /// Map a numeric technique code; unmapped codes fall back to `None`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ReferenceMode::None,
            1 => ReferenceMode::Minimum,
            2 => ReferenceMode::Maximum,
            3 => ReferenceMode::Average,
            4 => ReferenceMode::Central,
            5 => ReferenceMode::Bias,
            6 => ReferenceMode::First,
            7 => ReferenceMode::Last,
            8 => ReferenceMode::Center,
            9 => ReferenceMode::Line,
            10 => ReferenceMode::LeastSquares,
            11 => ReferenceMode::LinePositive,
            12 => ReferenceMode::LeastSquaresPositive,
            _ => ReferenceMode::None,
        }
    }
}

impl Default for ReferenceMode {
    fn default() -> Self {
        ReferenceMode::None
    }
}
