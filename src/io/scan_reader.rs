use crate::core::correction::NonlinearityCorrector;
use crate::io::channel::ChannelExpression;
use crate::types::{
    Sample, ScanDirection, ScanMetadata, TopoError, TopoResult, TraceMode,
};
use chrono::NaiveDateTime;
use ndarray::{s, Array2};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of scan data and metadata consumed by the conversion pipeline
pub trait ScanSource: NonlinearityCorrector {
    fn metadata(&self) -> &ScanMetadata;

    /// File naming of the record, used to derive output names
    fn file_name(&self) -> &ScanFileName;

    fn has_channel(&self, symbol: &str) -> bool;

    /// Samples of `symbol` for the whole field (`profile_index == 0`) or for
    /// the 1-based profile `profile_index`, combined according to `trace`.
    fn extract_profile(
        &self,
        symbol: &str,
        profile_index: usize,
        trace: TraceMode,
    ) -> TopoResult<Vec<Sample>>;
}

/// Base path of a multi-file scan record plus the selected scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFileName {
    base: PathBuf,
    scan_index: usize,
}

impl ScanFileName {
    /// Accepts the bare base path or any member file of the record,
    /// including the backward data file `<base>_b.dat`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let base = match path.extension().and_then(|e| e.to_str()) {
            Some("dat") => {
                let stem = path.with_extension("");
                match stem.to_str().and_then(|s| s.strip_suffix("_b")) {
                    Some(forward) => PathBuf::from(forward),
                    None => stem,
                }
            }
            Some("ind") | Some("dsc") => path.with_extension(""),
            _ => path.to_path_buf(),
        };
        Self {
            base,
            scan_index: 0,
        }
    }

    pub fn with_scan_index(mut self, scan_index: usize) -> Self {
        self.scan_index = scan_index;
        self
    }

    pub fn scan_index(&self) -> usize {
        self.scan_index
    }

    /// Base path of the selected scan, `<base>_<nnn>` for indexed scans
    pub fn scan_base(&self) -> PathBuf {
        indexed_base(&self.base, self.scan_index)
    }

    /// File name of the selected scan without directory
    pub fn base_file_name(&self) -> String {
        self.scan_base()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn index_file(&self) -> PathBuf {
        with_suffix(&self.scan_base(), ".ind")
    }

    pub fn description_file(&self) -> PathBuf {
        with_suffix(&self.scan_base(), ".dsc")
    }

    pub fn forward_data_file(&self) -> PathBuf {
        with_suffix(&self.scan_base(), ".dat")
    }

    pub fn backward_data_file(&self) -> PathBuf {
        with_suffix(&self.scan_base(), "_b.dat")
    }

    /// Number of consecutive indexed scans on disk, at least 1
    pub fn count_scans(&self) -> usize {
        let mut count = 0;
        while with_suffix(&indexed_base(&self.base, count + 1), ".ind").exists() {
            count += 1;
        }
        count.max(1)
    }

    /// `<scan base><postfix>.<ext>` when free, else
    /// `<scan base>_<k><postfix>.<ext>` for the smallest free `k`.
    pub fn free_indexed_name(&self, postfix: &str, extension: &str) -> PathBuf {
        let base = self.scan_base();
        let candidate = with_suffix(&base, &format!("{}.{}", postfix, extension));
        if !candidate.exists() {
            return candidate;
        }
        let mut k = 1;
        loop {
            let candidate = with_suffix(&base, &format!("_{}{}.{}", k, postfix, extension));
            if !candidate.exists() {
                return candidate;
            }
            k += 1;
        }
    }
}

fn indexed_base(base: &Path, scan_index: usize) -> PathBuf {
    if scan_index == 0 {
        base.to_path_buf()
    } else {
        with_suffix(base, &format!("_{:03}", scan_index))
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Reader for plain-text scan records (`.ind`, `.dsc`, `.dat`, `_b.dat`)
pub struct NmmScanReader {
    file_name: ScanFileName,
    metadata: ScanMetadata,
    columns: Vec<String>,
    forward: Option<Array2<Sample>>,
    backward: Option<Array2<Sample>>,
}

impl NmmScanReader {
    /// Read metadata and data of the selected scan
    pub fn new(file_name: ScanFileName) -> TopoResult<Self> {
        let index_path = file_name.index_file();
        if !index_path.exists() {
            return Err(TopoError::MissingInput(index_path.display().to_string()));
        }

        log::info!("Reading scan record {}", file_name.scan_base().display());

        let index = IndexFile::parse(&fs::read_to_string(&index_path)?)?;
        let columns = read_channel_list(&file_name.description_file())?;
        let mut metadata = index.to_metadata()?;
        metadata.base_file_name = file_name.base_file_name();
        metadata.scan_index = file_name.scan_index();
        metadata.number_of_scans = file_name.count_scans();

        let expected_rows = metadata.number_of_data_points * metadata.number_of_profiles;
        let forward = read_data_table(&file_name.forward_data_file(), columns.len(), expected_rows)?;
        let backward = read_data_table(&file_name.backward_data_file(), columns.len(), expected_rows)?
            .map(|table| reverse_profiles(table, metadata.number_of_data_points));

        metadata.scan_direction = match (index.get("ScanDirection"), &forward, &backward) {
            (_, None, _) => ScanDirection::NoData,
            (Some(declared), Some(_), backward) => {
                match (declared.to_ascii_lowercase().as_str(), backward) {
                    ("forward", _) => ScanDirection::ForwardOnly,
                    ("forward+backward", Some(_)) => ScanDirection::ForwardAndBackward,
                    // declared return trace never written
                    ("forward+backward", None) => ScanDirection::ForwardOnly,
                    _ => ScanDirection::Unknown,
                }
            }
            (None, Some(_), Some(_)) => ScanDirection::ForwardAndBackward,
            (None, Some(_), None) => ScanDirection::ForwardOnly,
        };

        log::debug!(
            "{} channels, {} x {} points, direction {:?}",
            columns.len(),
            metadata.number_of_data_points,
            metadata.number_of_profiles,
            metadata.scan_direction
        );

        Ok(Self {
            file_name,
            metadata,
            columns,
            forward,
            backward,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn trace_samples(&self, expression: &ChannelExpression, backward: bool) -> TopoResult<Vec<Sample>> {
        let table = if backward { &self.backward } else { &self.forward };
        let table = table.as_ref().ok_or(TopoError::NoScanData)?;
        expression.evaluate(&self.columns, table.view())
    }
}

impl NonlinearityCorrector for NmmScanReader {
    fn correct_nonlinearity(&mut self) -> TopoResult<f64> {
        Err(TopoError::Correction(
            "scan record carries no quadrature interferometer signals".to_string(),
        ))
    }
}

impl ScanSource for NmmScanReader {
    fn metadata(&self) -> &ScanMetadata {
        &self.metadata
    }

    fn file_name(&self) -> &ScanFileName {
        &self.file_name
    }

    fn has_channel(&self, symbol: &str) -> bool {
        ChannelExpression::parse(symbol)
            .map(|expr| expr.is_satisfied_by(&self.columns))
            .unwrap_or(false)
    }

    fn extract_profile(
        &self,
        symbol: &str,
        profile_index: usize,
        trace: TraceMode,
    ) -> TopoResult<Vec<Sample>> {
        let expression = ChannelExpression::parse(symbol)?;

        let samples = match trace {
            TraceMode::ForwardOnly | TraceMode::None => self.trace_samples(&expression, false)?,
            TraceMode::BackwardOnly => self.trace_samples(&expression, true)?,
            TraceMode::Average | TraceMode::Difference => {
                let forward = self.trace_samples(&expression, false)?;
                let backward = self.trace_samples(&expression, true)?;
                forward
                    .iter()
                    .zip(backward.iter())
                    .map(|(f, b)| match trace {
                        TraceMode::Average => (f + b) / 2.0,
                        _ => f - b,
                    })
                    .collect()
            }
        };

        if profile_index == 0 {
            return Ok(samples);
        }

        let points = self.metadata.number_of_data_points;
        if profile_index > self.metadata.number_of_profiles {
            return Err(TopoError::Configuration(format!(
                "Profile {} requested, record has {} profiles",
                profile_index, self.metadata.number_of_profiles
            )));
        }
        let start = (profile_index - 1) * points;
        Ok(samples[start..start + points].to_vec())
    }
}

/// Parsed `Key : value` lines of an index file
struct IndexFile {
    values: HashMap<String, String>,
    comments: Vec<String>,
}

impl IndexFile {
    fn parse(content: &str) -> TopoResult<Self> {
        let re = Regex::new(r"^\s*([A-Za-z][A-Za-z0-9_]*)\s*[:=]\s*(.*?)\s*$")
            .map_err(|e| TopoError::InvalidFormat(format!("Index pattern: {}", e)))?;

        let mut values = HashMap::new();
        let mut comments = Vec::new();
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let cap = re.captures(line).ok_or_else(|| {
                TopoError::InvalidFormat(format!("Malformed index line: '{}'", trimmed))
            })?;
            let key = cap[1].to_string();
            let value = cap[2].to_string();
            if key == "Comment" {
                comments.push(value);
            } else {
                values.insert(key, value);
            }
        }

        Ok(Self { values, comments })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    fn text(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    fn number<T>(&self, key: &str, default: T) -> TopoResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse::<T>().map_err(|e| {
                TopoError::InvalidFormat(format!("{} = '{}': {}", key, raw, e))
            }),
        }
    }

    fn required<T>(&self, key: &str) -> TopoResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self
            .get(key)
            .ok_or_else(|| TopoError::InvalidFormat(format!("Missing {}", key)))?;
        raw.parse::<T>()
            .map_err(|e| TopoError::InvalidFormat(format!("{} = '{}': {}", key, raw, e)))
    }

    fn creation_date(&self) -> TopoResult<NaiveDateTime> {
        let Some(raw) = self.get("CreationDate") else {
            return Ok(NaiveDateTime::default());
        };
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .ok_or_else(|| TopoError::InvalidFormat(format!("CreationDate = '{}'", raw)))
    }

    fn to_metadata(&self) -> TopoResult<ScanMetadata> {
        Ok(ScanMetadata {
            creation_date: self.creation_date()?,
            instrument_identifier: self.text("Instrument"),
            user: self.text("User"),
            organisation: self.text("Organisation"),
            sample_identifier: self.text("SampleIdentifier"),
            sample_species: self.text("SampleSpecies"),
            sample_specification: self.text("SampleSpecification"),
            spm_technique: self.text("SPMtechnique"),
            probe_designation: self.text("Probe"),
            number_of_data_points: self.required("NumberOfDataPoints")?,
            number_of_profiles: self.required("NumberOfProfiles")?,
            scan_field_delta_x: self.number("ScanFieldDeltaX", 0.0)?,
            scan_field_delta_y: self.number("ScanFieldDeltaY", 0.0)?,
            scan_field_origin_x: self.number("ScanFieldOriginX", 0.0)?,
            scan_field_origin_y: self.number("ScanFieldOriginY", 0.0)?,
            scan_field_rotation: self.number("ScanFieldRotation", 0.0)?,
            scan_speed: self.number("ScanSpeed", 0.0)?,
            scan_duration: self.number("ScanDuration", 0.0)?,
            environment_mode: self.text("EnvironmentMode"),
            sample_temperature: self.number("SampleTemperature", 0.0)?,
            air_temperature: self.number("AirTemperature", 0.0)?,
            barometric_pressure: self.number("AirPressure", 0.0)?,
            relative_humidity: self.number("AirHumidity", 0.0)?,
            air_temperature_gradient: self.number("AirTemperatureGradient", 0.0)?,
            air_temperature_drift: self.number("AirTemperatureDrift", 0.0)?,
            glitched_data_points: self.number("GlitchedDataPoints", 0)?,
            spurious_data_lines: self.number("SpuriousDataLines", 0)?,
            scan_comments: self.comments.clone(),
            ..Default::default()
        })
    }
}

/// Channel symbols in column order
fn read_channel_list(path: &Path) -> TopoResult<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| TopoError::InvalidFormat(format!("{}: {}", path.display(), e)))?;

    let columns: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split(':').nth(1) {
            Some(symbol) => symbol.trim().to_string(),
            None => line.to_string(),
        })
        .collect();

    if columns.is_empty() {
        return Err(TopoError::InvalidFormat(format!(
            "No channels listed in {}",
            path.display()
        )));
    }
    Ok(columns)
}

/// Whitespace separated sample table, `None` when the file does not exist
fn read_data_table(path: &Path, channels: usize, expected_rows: usize) -> TopoResult<Option<Array2<Sample>>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;

    let mut values = Vec::with_capacity(expected_rows * channels);
    let mut rows = 0;
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: Vec<Sample> = line
            .split_whitespace()
            .map(|s| s.parse::<Sample>())
            .collect::<Result<_, _>>()
            .map_err(|e| {
                TopoError::InvalidFormat(format!("{} line {}: {}", path.display(), line_no + 1, e))
            })?;
        if row.len() != channels {
            return Err(TopoError::InvalidFormat(format!(
                "{} line {}: {} values, expected {}",
                path.display(),
                line_no + 1,
                row.len(),
                channels
            )));
        }
        values.extend(row);
        rows += 1;
    }

    if rows == 0 {
        return Ok(None);
    }
    if rows != expected_rows {
        return Err(TopoError::InvalidFormat(format!(
            "{}: {} samples, expected {}",
            path.display(),
            rows,
            expected_rows
        )));
    }

    Array2::from_shape_vec((rows, channels), values)
        .map(Some)
        .map_err(|e| TopoError::InvalidFormat(format!("{}: {}", path.display(), e)))
}

/// Backward profiles are recorded in the return direction
fn reverse_profiles(mut table: Array2<Sample>, points_per_profile: usize) -> Array2<Sample> {
    if points_per_profile == 0 {
        return table;
    }
    let profiles = table.nrows() / points_per_profile;
    for p in 0..profiles {
        let start = p * points_per_profile;
        let reversed = table
            .slice(s![start..start + points_per_profile; -1, ..])
            .to_owned();
        table
            .slice_mut(s![start..start + points_per_profile, ..])
            .assign(&reversed);
    }
    table
}
