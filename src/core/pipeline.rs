//! Conversion pipeline: scan record in, leveled raster document out.
//!
//! Stages run strictly in sequence and the first fatal error aborts the run.
//! The raster is persisted last, so a failed run never produces a file.

use crate::config::ProcessingConfig;
use crate::core::correction::{apply_correction, CorrectionOutcome};
use crate::core::leveling::DataLeveler;
use crate::core::naming::resolve_output;
use crate::core::reference::ReferenceMode;
use crate::core::trace::resolve_trace;
use crate::core::trailer::assemble_trailer;
use crate::io::bcr_writer::RasterSink;
use crate::io::scan_reader::ScanSource;
use crate::types::{RasterDocument, TopoError, TopoResult, TraceMode};
use std::path::PathBuf;

/// Summary of a completed conversion
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub output_path: PathBuf,
    pub trace: TraceMode,
    pub correction: CorrectionOutcome,
    pub reference: String,
    pub points_per_profile: usize,
    pub number_of_profiles: usize,
    /// Non-fatal conditions met on the way
    pub advisories: Vec<String>,
}

/// Drives one conversion from a scan source into a raster sink
pub struct Pipeline {
    config: ProcessingConfig,
}

impl Pipeline {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn run<S, W>(&self, source: &mut S, sink: &W) -> TopoResult<PipelineReport>
    where
        S: ScanSource + ?Sized,
        W: RasterSink + ?Sized,
    {
        let config = &self.config;
        let mut advisories = Vec::new();

        let number_of_profiles = source.metadata().number_of_profiles;
        let profile_index = config.effective_profile(number_of_profiles);
        if profile_index as i64 != config.profile_index {
            let advisory = format!(
                "Profile index {} clamped to {}",
                config.profile_index, profile_index
            );
            log::warn!("{}", advisory);
            advisories.push(advisory);
        }

        let resolution = resolve_trace(config.trace_request, source.metadata().scan_direction)?;
        advisories.extend(resolution.advisory.clone());
        let trace = resolution.mode;

        if !source.has_channel(&config.channel_symbol) {
            return Err(TopoError::ChannelNotFound(config.channel_symbol.clone()));
        }

        let correction = apply_correction(config.nonlinearity_correction, &mut *source);
        if correction == CorrectionOutcome::Failed {
            advisories.push("Nonlinearity correction failed, data left uncorrected".to_string());
        }

        log::info!(
            "Extracting {} ({}) profile {}",
            config.channel_symbol,
            trace,
            profile_index
        );
        let raw = source.extract_profile(&config.channel_symbol, profile_index, trace)?;

        let meta = source.metadata();
        let points = meta.number_of_data_points;
        let profiles = if profile_index == 0 { number_of_profiles } else { 1 };
        if points == 0 || raw.len() != points * profiles {
            return Err(TopoError::Configuration(format!(
                "{} samples do not form {} profiles of {} points",
                raw.len(),
                profiles,
                points
            )));
        }

        let mode = ReferenceMode::from_code(config.reference_code);
        let leveler = if profile_index == 0 {
            DataLeveler::field(&raw, points, profiles)
        } else {
            DataLeveler::profile(&raw)
        };
        let leveled = leveler.level(mode, config.bias_um);
        log::info!("Reference: {}", leveled.description);

        let trailer = assemble_trailer(meta, config, profile_index, &leveled, correction, trace);

        let target = resolve_output(
            config.output_path.as_deref(),
            source.file_name(),
            trace,
            &config.channel_symbol,
            config.add_postfix,
        );

        let y_scale = if profile_index != 0 && config.line_only {
            0.0
        } else {
            meta.scan_field_delta_y
        };
        let document = RasterDocument {
            manufacturer_id: meta.instrument_identifier.clone(),
            creation_date: meta.creation_date,
            modification_date: chrono::Local::now().naive_local(),
            points_per_profile: points,
            number_of_profiles: profiles,
            x_scale: meta.scan_field_delta_x,
            y_scale,
            z_scale: config.z_scale,
            data: leveled.data,
            trailer,
        };

        log::info!("Writing {}", target.path.display());
        sink.write(&document, &target.path)?;

        Ok(PipelineReport {
            output_path: target.path,
            trace,
            correction,
            reference: leveled.description,
            points_per_profile: points,
            number_of_profiles: profiles,
            advisories,
        })
    }
}
