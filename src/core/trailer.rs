//! Trailer metadata of the written topography

use crate::config::ProcessingConfig;
use crate::core::correction::CorrectionOutcome;
use crate::core::leveling::LevelingResult;
use crate::types::{MetadataTrailer, ScanMetadata, TraceMode};

/// Converter name and version recorded as `ConvertedBy`
pub fn converter_signature() -> String {
    format!("{} version {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Build the ordered trailer for one conversion.
///
/// `profile_index` is the clamped profile actually extracted (0 for the full
/// field). Key order is fixed so repeated runs serialize identically.
pub fn assemble_trailer(
    meta: &ScanMetadata,
    config: &ProcessingConfig,
    profile_index: usize,
    leveling: &LevelingResult,
    correction: CorrectionOutcome,
    trace: TraceMode,
) -> MetadataTrailer {
    let mut trailer = MetadataTrailer::new();

    trailer.push("InputFile", meta.base_file_name.as_str());
    trailer.push("ConvertedBy", converter_signature());
    trailer.push("UserComment", config.user_comment.as_str());
    trailer.push("OperatorName", meta.user.as_str());
    trailer.push("Organisation", meta.organisation.as_str());
    trailer.push("SampleIdentifier", meta.sample_identifier.as_str());
    trailer.push("SampleSpecies", meta.sample_species.as_str());
    trailer.push("SampleSpecification", meta.sample_specification.as_str());
    trailer.push("SPMtechnique", meta.spm_technique.as_str());
    trailer.push("Probe", meta.probe_designation.as_str());
    trailer.push("ZAxisSource", config.channel_symbol.as_str());
    trailer.push("Trace", trace.to_string());

    if profile_index != 0 {
        trailer.push("NumProfiles", meta.number_of_profiles.to_string());
        trailer.push("ExtractedProfile", profile_index.to_string());
    }
    if meta.number_of_scans > 1 {
        trailer.push("NumberOfScans", meta.number_of_scans.to_string());
        trailer.push("Scan", meta.scan_index.to_string());
    }

    trailer.push("ReferenceDatum", leveling.description.as_str());

    match correction {
        CorrectionOutcome::Applied(span) => {
            trailer.push("NonlinearityCorrection", "Heydemann");
            trailer.push("NonlinearitySpan", format!("{:.2} nm", span * 1e9));
        }
        CorrectionOutcome::Failed => {
            trailer.push("NonlinearityCorrection", "failed, data uncorrected");
        }
        CorrectionOutcome::NotRequested => {}
    }

    trailer.push("EnvironmentMode", meta.environment_mode.as_str());
    trailer.push("SampleTemperature", format!("{:.3} oC", meta.sample_temperature));
    trailer.push("AirTemperature", format!("{:.3} oC", meta.air_temperature));
    trailer.push("AirPressure", format!("{:.0} Pa", meta.barometric_pressure));
    trailer.push("AirHumidity", format!("{:.1} %", meta.relative_humidity));
    trailer.push("TemperatureGradient", format!("{:.3} oC", meta.air_temperature_gradient));
    trailer.push("TemperatureRange", format!("{:.3} oC", meta.air_temperature_drift));
    trailer.push("ScanSpeed", format!("{} um/s", meta.scan_speed));
    trailer.push("ScanAngle", format!("{:.3} grad", meta.scan_field_rotation));
    trailer.push("ScanFieldOriginX", format!("{:.3} um", meta.scan_field_origin_x * 1e6));
    trailer.push("ScanFieldOriginY", format!("{:.3} um", meta.scan_field_origin_y * 1e6));
    trailer.push("ScanDuration", format!("{:.0} s", meta.scan_duration));
    trailer.push("GlitchedDataPoints", meta.glitched_data_points.to_string());
    trailer.push("SpuriousDataLines", meta.spurious_data_lines.to_string());

    for (i, comment) in meta.scan_comments.iter().enumerate() {
        trailer.push(format!("ScanComment{}", i + 1), comment.as_str());
    }

    trailer
}
