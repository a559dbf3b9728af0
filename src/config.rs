//! Run configuration for a single conversion

use crate::types::{TraceMode, DEFAULT_CHANNEL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Requested trace combination, before it is reconciled with the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRequest(pub TraceMode);

impl TraceRequest {
    /// Build the request from the back/both/diff flags; a later flag wins.
    pub fn from_flags(back: bool, both: bool, diff: bool) -> Self {
        let mut mode = TraceMode::ForwardOnly;
        if back {
            mode = TraceMode::BackwardOnly;
        }
        if both {
            mode = TraceMode::Average;
        }
        if diff {
            mode = TraceMode::Difference;
        }
        Self(mode)
    }

    pub fn mode(&self) -> TraceMode {
        self.0
    }
}

impl Default for TraceRequest {
    fn default() -> Self {
        Self(TraceMode::ForwardOnly)
    }
}

/// Snapshot of user intent for one conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Channel expression, e.g. `-LZ+AZ`
    pub channel_symbol: String,
    /// Scan index for multi-scan records
    pub scan_index: usize,
    /// Profile to extract, 0 for the whole field; clamped per run
    pub profile_index: i64,
    /// Numeric reference technique code (0-12)
    pub reference_code: i32,
    /// Bias in micrometers, used by the bias reference technique
    pub bias_um: f64,
    /// Height scale factor of the written document
    pub z_scale: f64,
    pub trace_request: TraceRequest,
    pub nonlinearity_correction: bool,
    pub strict: bool,
    pub iso_format: bool,
    /// Single profiles get a zero profile spacing
    pub line_only: bool,
    pub add_postfix: bool,
    pub user_comment: String,
    pub output_path: Option<PathBuf>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            channel_symbol: DEFAULT_CHANNEL.to_string(),
            scan_index: 0,
            profile_index: 0,
            reference_code: 0,
            bias_um: 0.0,
            z_scale: 1e-6,
            trace_request: TraceRequest::default(),
            nonlinearity_correction: false,
            strict: false,
            iso_format: false,
            line_only: false,
            add_postfix: true,
            user_comment: "---".to_string(),
            output_path: None,
        }
    }
}

impl ProcessingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, symbol: impl Into<String>) -> Self {
        self.channel_symbol = symbol.into();
        self
    }

    pub fn with_profile_index(mut self, index: i64) -> Self {
        self.profile_index = index;
        self
    }

    pub fn with_reference(mut self, code: i32, bias_um: f64) -> Self {
        self.reference_code = code;
        self.bias_um = bias_um;
        self
    }

    pub fn with_trace(mut self, request: TraceRequest) -> Self {
        self.trace_request = request;
        self
    }

    pub fn with_correction(mut self, enabled: bool) -> Self {
        self.nonlinearity_correction = enabled;
        self
    }

    pub fn with_postfix(mut self, enabled: bool) -> Self {
        self.add_postfix = enabled;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Profile index clamped into `[0, number_of_profiles]`
    pub fn effective_profile(&self, number_of_profiles: usize) -> usize {
        if self.profile_index <= 0 {
            return 0;
        }
        let index = usize::try_from(self.profile_index).unwrap_or(usize::MAX);
        index.min(number_of_profiles)
    }

    pub fn is_default_channel(&self) -> bool {
        self.channel_symbol == DEFAULT_CHANNEL
    }
}
