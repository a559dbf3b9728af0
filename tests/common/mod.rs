#![allow(dead_code)]

use scan2bcr::core::NonlinearityCorrector;
use scan2bcr::{
    RasterDocument, RasterSink, Sample, ScanDirection, ScanFileName, ScanMetadata, ScanSource,
    TopoError, TopoResult, TraceMode,
};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// In-memory scan with one `LZ` channel per trace
pub struct MemoryScan {
    pub metadata: ScanMetadata,
    pub file_name: ScanFileName,
    pub channels: Vec<String>,
    pub forward: Vec<Sample>,
    pub backward: Vec<Sample>,
    pub correction_span: Option<f64>,
    pub correction_calls: usize,
}

impl MemoryScan {
    pub fn new(base: impl AsRef<Path>, points: usize, profiles: usize) -> Self {
        let forward = (0..points * profiles)
            .map(|i| 1.0e-6 * (i as f64) + 2.0e-7 * ((i * 7 % 5) as f64))
            .collect::<Vec<_>>();
        let backward = forward.iter().map(|z| z + 4.0e-8).collect();
        Self {
            metadata: ScanMetadata {
                base_file_name: "memory_scan".to_string(),
                instrument_identifier: "NMM-1".to_string(),
                number_of_data_points: points,
                number_of_profiles: profiles,
                number_of_scans: 1,
                scan_field_delta_x: 1e-7,
                scan_field_delta_y: 5e-7,
                scan_direction: ScanDirection::ForwardAndBackward,
                scan_comments: vec!["calibration run".to_string()],
                ..Default::default()
            },
            file_name: ScanFileName::new(base),
            channels: vec!["LZ".to_string(), "AZ".to_string()],
            forward,
            backward,
            correction_span: None,
            correction_calls: 0,
        }
    }

    pub fn with_direction(mut self, direction: ScanDirection) -> Self {
        self.metadata.scan_direction = direction;
        self
    }

    fn row_slice(&self, data: &[Sample], profile_index: usize) -> Vec<Sample> {
        if profile_index == 0 {
            return data.to_vec();
        }
        let points = self.metadata.number_of_data_points;
        let start = (profile_index - 1) * points;
        data[start..start + points].to_vec()
    }
}

impl NonlinearityCorrector for MemoryScan {
    fn correct_nonlinearity(&mut self) -> TopoResult<f64> {
        self.correction_calls += 1;
        self.correction_span
            .ok_or_else(|| TopoError::Correction("no quadrature signals".to_string()))
    }
}

impl ScanSource for MemoryScan {
    fn metadata(&self) -> &ScanMetadata {
        &self.metadata
    }

    fn file_name(&self) -> &ScanFileName {
        &self.file_name
    }

    fn has_channel(&self, symbol: &str) -> bool {
        symbol
            .split(|c| c == '+' || c == '-')
            .filter(|s| !s.is_empty())
            .all(|s| self.channels.iter().any(|c| c == s))
    }

    fn extract_profile(
        &self,
        _symbol: &str,
        profile_index: usize,
        trace: TraceMode,
    ) -> TopoResult<Vec<Sample>> {
        let data: Vec<Sample> = match trace {
            TraceMode::ForwardOnly | TraceMode::None => self.forward.clone(),
            TraceMode::BackwardOnly => self.backward.clone(),
            TraceMode::Average => self
                .forward
                .iter()
                .zip(&self.backward)
                .map(|(f, b)| (f + b) / 2.0)
                .collect(),
            TraceMode::Difference => self
                .forward
                .iter()
                .zip(&self.backward)
                .map(|(f, b)| f - b)
                .collect(),
        };
        Ok(self.row_slice(&data, profile_index))
    }
}

/// Sink that keeps documents instead of writing them
#[derive(Default)]
pub struct RecordingSink {
    pub written: RefCell<Vec<(PathBuf, RasterDocument)>>,
    pub fail: bool,
}

impl RasterSink for RecordingSink {
    fn write(&self, document: &RasterDocument, path: &Path) -> TopoResult<()> {
        if self.fail {
            return Err(TopoError::Write(format!("{}: disk full", path.display())));
        }
        self.written
            .borrow_mut()
            .push((path.to_path_buf(), document.clone()));
        Ok(())
    }
}
