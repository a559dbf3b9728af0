use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Height samples in the native length unit of the instrument (meters)
pub type Sample = f64;

/// Channel symbol used when the caller does not ask for a specific one
pub const DEFAULT_CHANNEL: &str = "-LZ+AZ";

/// File extension of the written raster document
pub const RASTER_EXTENSION: &str = "sdf";

/// Which acquisition trace(s) end up in the topography
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceMode {
    ForwardOnly,
    BackwardOnly,
    Average,
    Difference,
    None,
}

impl TraceMode {
    /// Filename postfix identifying the trace combination
    pub fn postfix(&self) -> &'static str {
        match self {
            TraceMode::ForwardOnly => "_f",
            TraceMode::BackwardOnly => "_b",
            TraceMode::Average => "_a",
            TraceMode::Difference => "_d",
            TraceMode::None => "",
        }
    }
}

impl std::fmt::Display for TraceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceMode::ForwardOnly => write!(f, "ForwardOnly"),
            TraceMode::BackwardOnly => write!(f, "BackwardOnly"),
            TraceMode::Average => write!(f, "Average"),
            TraceMode::Difference => write!(f, "Difference"),
            TraceMode::None => write!(f, "None"),
        }
    }
}

/// Scan directions actually recorded in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanDirection {
    Unknown,
    NoData,
    ForwardOnly,
    ForwardAndBackward,
}

/// Descriptive metadata of one scan, as delivered by a scan reader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    // Provenance
    pub base_file_name: String,
    pub creation_date: NaiveDateTime,
    pub instrument_identifier: String,
    pub user: String,
    pub organisation: String,
    pub sample_identifier: String,
    pub sample_species: String,
    pub sample_specification: String,
    pub spm_technique: String,
    pub probe_designation: String,

    // Geometry
    pub number_of_data_points: usize,
    pub number_of_profiles: usize,
    pub number_of_scans: usize,
    pub scan_index: usize,
    pub scan_field_delta_x: f64,    // meters
    pub scan_field_delta_y: f64,    // meters
    pub scan_field_origin_x: f64,   // meters
    pub scan_field_origin_y: f64,   // meters
    pub scan_field_rotation: f64,   // degrees
    pub scan_speed: f64,            // um/s
    pub scan_duration: f64,         // seconds
    pub scan_direction: ScanDirection,

    // Environment
    pub environment_mode: String,
    pub sample_temperature: f64,        // oC
    pub air_temperature: f64,           // oC
    pub barometric_pressure: f64,       // Pa
    pub relative_humidity: f64,         // %
    pub air_temperature_gradient: f64,  // oC
    pub air_temperature_drift: f64,     // oC

    // Quality
    pub glitched_data_points: usize,
    pub spurious_data_lines: usize,

    pub scan_comments: Vec<String>,
}

impl Default for ScanMetadata {
    fn default() -> Self {
        Self {
            base_file_name: String::new(),
            creation_date: NaiveDateTime::default(),
            instrument_identifier: String::new(),
            user: String::new(),
            organisation: String::new(),
            sample_identifier: String::new(),
            sample_species: String::new(),
            sample_specification: String::new(),
            spm_technique: String::new(),
            probe_designation: String::new(),
            number_of_data_points: 0,
            number_of_profiles: 0,
            number_of_scans: 1,
            scan_index: 0,
            scan_field_delta_x: 0.0,
            scan_field_delta_y: 0.0,
            scan_field_origin_x: 0.0,
            scan_field_origin_y: 0.0,
            scan_field_rotation: 0.0,
            scan_speed: 0.0,
            scan_duration: 0.0,
            scan_direction: ScanDirection::Unknown,
            environment_mode: String::new(),
            sample_temperature: 0.0,
            air_temperature: 0.0,
            barometric_pressure: 0.0,
            relative_humidity: 0.0,
            air_temperature_gradient: 0.0,
            air_temperature_drift: 0.0,
            glitched_data_points: 0,
            spurious_data_lines: 0,
            scan_comments: Vec::new(),
        }
    }
}

/// Ordered key/value pairs written to the raster trailer.
///
/// Insertion order is kept and a key is stored at most once; pushing an
/// existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTrailer {
    entries: Vec<(String, String)>,
}

impl MetadataTrailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a raster writer needs to persist one topography
#[derive(Debug, Clone)]
pub struct RasterDocument {
    pub manufacturer_id: String,
    pub creation_date: NaiveDateTime,
    pub modification_date: NaiveDateTime,
    pub points_per_profile: usize,
    pub number_of_profiles: usize,
    pub x_scale: f64,
    pub y_scale: f64,
    pub z_scale: f64,
    /// Row-major height samples, one profile after the other
    pub data: Vec<Sample>,
    pub trailer: MetadataTrailer,
}

/// Error types for topography conversion
#[derive(Debug, thiserror::Error)]
pub enum TopoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing input file: {0}")]
    MissingInput(String),

    #[error("Invalid scan record: {0}")]
    InvalidFormat(String),

    #[error("Unknown scan direction status")]
    UnknownScanDirection,

    #[error("No scan data present")]
    NoScanData,

    #[error("Channel {0} not present in scan record")]
    ChannelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Nonlinearity correction failed: {0}")]
    Correction(String),

    #[error("Could not write file: {0}")]
    Write(String),
}

impl TopoError {
    /// Process exit code reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TopoError::Io(_) | TopoError::MissingInput(_) => 1,
            TopoError::UnknownScanDirection => 2,
            TopoError::NoScanData => 3,
            TopoError::Write(_) => 4,
            TopoError::ChannelNotFound(_) => 5,
            TopoError::InvalidFormat(_)
            | TopoError::Configuration(_)
            | TopoError::Correction(_) => 6,
        }
    }
}

/// Result type for topography operations
pub type TopoResult<T> = Result<T, TopoError>;
