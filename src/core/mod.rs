//! Topography processing stages

pub mod reference;
pub mod leveling;
pub mod trace;
pub mod correction;
pub mod trailer;
pub mod naming;
pub mod pipeline;

// Re-export main types
pub use reference::ReferenceMode;
pub use leveling::{DataLeveler, LevelingResult};
pub use trace::{resolve_trace, TraceResolution};
pub use correction::{apply_correction, CorrectionOutcome, NonlinearityCorrector};
pub use trailer::assemble_trailer;
pub use naming::{resolve_output, OutputTarget};
pub use pipeline::{Pipeline, PipelineReport};
