use crate::types::{RasterDocument, TopoError, TopoResult};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use tempfile::NamedTempFile;

/// Consumer of prepared topographies
pub trait RasterSink {
    fn write(&self, document: &RasterDocument, path: &Path) -> TopoResult<()>;
}

/// Longest manufacturer id allowed by the standardized header
const MAX_MANUFACTURER_ID: usize = 10;

/// ASCII writer for BCR / ISO 25178-71 raster files
#[derive(Debug, Clone, Default)]
pub struct BcrWriter {
    /// Force the standardized format
    pub strict: bool,
    /// ISO 25178-71 header instead of BCR
    pub iso: bool,
}

impl BcrWriter {
    pub fn new(strict: bool, iso: bool) -> Self {
        Self { strict, iso }
    }

    /// Render the complete document as text
    pub fn render(&self, document: &RasterDocument) -> TopoResult<String> {
        let expected = document.points_per_profile * document.number_of_profiles;
        if expected != document.data.len() {
            return Err(TopoError::Configuration(format!(
                "{} x {} points declared but {} samples prepared",
                document.points_per_profile,
                document.number_of_profiles,
                document.data.len()
            )));
        }
        if document.z_scale == 0.0 || !document.z_scale.is_finite() {
            return Err(TopoError::Configuration(format!(
                "Invalid z scale {}",
                document.z_scale
            )));
        }

        let mut out = String::with_capacity(64 + document.data.len() * 16);
        self.render_header(document, &mut out);
        self.render_data(document, &mut out);
        self.render_trailer(document, &mut out);
        Ok(out)
    }

    fn render_header(&self, document: &RasterDocument, out: &mut String) {
        let signature = if self.iso { "aISO-1.0" } else { "aBCR-1.0" };
        let manufacturer: String = if self.strict {
            document.manufacturer_id.chars().take(MAX_MANUFACTURER_ID).collect()
        } else {
            document.manufacturer_id.clone()
        };
        let nan_present = document.data.iter().any(|z| !z.is_finite());

        let _ = writeln!(out, "{}", signature);
        let _ = writeln!(out, "ManufacID   = {}", manufacturer);
        let _ = writeln!(out, "CreateDate  = {}", document.creation_date.format("%d%m%Y%H%M"));
        let _ = writeln!(out, "ModDate     = {}", document.modification_date.format("%d%m%Y%H%M"));
        let _ = writeln!(out, "NumPoints   = {}", document.points_per_profile);
        let _ = writeln!(out, "NumProfiles = {}", document.number_of_profiles);
        let _ = writeln!(out, "XScale      = {:e}", document.x_scale);
        let _ = writeln!(out, "YScale      = {:e}", document.y_scale);
        let _ = writeln!(out, "ZScale      = {:e}", document.z_scale);
        let _ = writeln!(out, "ZResolution = -1");
        let _ = writeln!(out, "Compression = 0");
        let _ = writeln!(out, "DataType    = 7");
        let _ = writeln!(out, "CheckType   = 0");
        let _ = writeln!(out, "NumDataSet  = 1");
        let _ = writeln!(out, "NanPresent  = {}", if nan_present { 1 } else { 0 });
        let _ = writeln!(out, "*");
    }

    fn render_data(&self, document: &RasterDocument, out: &mut String) {
        for z in &document.data {
            if z.is_finite() {
                let _ = writeln!(out, "{:.6}", z / document.z_scale);
            } else {
                let _ = writeln!(out, "BAD");
            }
        }
        let _ = writeln!(out, "*");
    }

    fn render_trailer(&self, document: &RasterDocument, out: &mut String) {
        for (key, value) in document.trailer.iter() {
            if self.strict {
                let _ = writeln!(out, "{} = {}", ascii_only(key), ascii_only(value));
            } else {
                let _ = writeln!(out, "{} = {}", key, value);
            }
        }
        let _ = writeln!(out, "*");
    }
}

impl RasterSink for BcrWriter {
    /// Write through a temporary file in the target directory and move it in
    /// place, so a failure never leaves a partial document behind.
    fn write(&self, document: &RasterDocument, path: &Path) -> TopoResult<()> {
        let content = self.render(document)?;
        let write_error = |e: std::io::Error| TopoError::Write(format!("{}: {}", path.display(), e));

        let directory = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir().map_err(write_error)?,
        };

        let mut temp = NamedTempFile::new_in(&directory).map_err(write_error)?;
        temp.write_all(content.as_bytes()).map_err(write_error)?;
        temp.flush().map_err(write_error)?;
        temp.persist(path).map_err(|e| write_error(e.error))?;

        log::info!("Wrote {} samples to {}", document.data.len(), path.display());
        Ok(())
    }
}

fn ascii_only(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}
