//! I/O modules for reading scan records and writing raster files

pub mod channel;
pub mod scan_reader;
pub mod bcr_writer;

pub use channel::ChannelExpression;
pub use scan_reader::{NmmScanReader, ScanFileName, ScanSource};
pub use bcr_writer::{BcrWriter, RasterSink};
