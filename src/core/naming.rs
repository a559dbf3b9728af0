use crate::io::scan_reader::ScanFileName;
use crate::types::{TraceMode, DEFAULT_CHANNEL, RASTER_EXTENSION};
use std::path::{Path, PathBuf};

/// Destination of the written raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    /// False when the user named the file explicitly
    pub synthesized: bool,
}

/// Resolve the output file.
///
/// An explicit path is used verbatim. Otherwise, with `add_postfix`, the
/// trace postfix and a non-default channel are appended to the file stem and
/// the next free indexed name carrying that postfix is taken, so an earlier
/// result is never replaced.
pub fn resolve_output(
    explicit: Option<&Path>,
    input: &ScanFileName,
    trace: TraceMode,
    channel_symbol: &str,
    add_postfix: bool,
) -> OutputTarget {
    if let Some(path) = explicit {
        return OutputTarget {
            path: path.to_path_buf(),
            synthesized: false,
        };
    }

    let suffix = if add_postfix {
        postfix(trace, channel_symbol)
    } else {
        String::new()
    };
    let path = input.free_indexed_name(&suffix, RASTER_EXTENSION);

    log::debug!("Derived output file name {}", path.display());
    OutputTarget {
        path,
        synthesized: true,
    }
}

fn postfix(trace: TraceMode, channel_symbol: &str) -> String {
    let mut postfix = trace.postfix().to_string();
    if channel_symbol != DEFAULT_CHANNEL {
        postfix.push('_');
        postfix.push_str(&channel_symbol.to_uppercase());
    }
    postfix
}
