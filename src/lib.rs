//! scan2bcr: scanning-probe scan records to BCR / ISO 25178-71 topography files
//!
//! The library reads a multi-file scan record, selects and combines the scan
//! traces, levels the height data against one of twelve reference techniques
//! and writes a raster document with an ordered metadata trailer.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use crate::types::{
    MetadataTrailer, RasterDocument, Sample, ScanDirection, ScanMetadata, TopoError, TopoResult,
    TraceMode, DEFAULT_CHANNEL, RASTER_EXTENSION,
};
pub use crate::config::{ProcessingConfig, TraceRequest};
pub use crate::core::{CorrectionOutcome, Pipeline, PipelineReport, ReferenceMode};
pub use crate::io::{BcrWriter, NmmScanReader, RasterSink, ScanFileName, ScanSource};
