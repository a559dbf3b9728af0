use crate::config::TraceRequest;
use crate::types::{ScanDirection, TopoError, TopoResult, TraceMode};

/// Trace combination reconciled with the recorded scan directions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceResolution {
    pub mode: TraceMode,
    /// Set when the requested combination had to be overridden
    pub advisory: Option<String>,
}

/// Decide which trace(s) to use for the recorded data.
///
/// Unknown or missing scan data is fatal. Forward-only records always yield
/// `ForwardOnly`, with an advisory when something else was requested.
pub fn resolve_trace(request: TraceRequest, direction: ScanDirection) -> TopoResult<TraceResolution> {
    let requested = request.mode();
    match direction {
        ScanDirection::Unknown => Err(TopoError::UnknownScanDirection),
        ScanDirection::NoData => Err(TopoError::NoScanData),
        ScanDirection::ForwardOnly if requested != TraceMode::ForwardOnly => {
            let advisory = format!(
                "No backward data present, using ForwardOnly instead of {}",
                requested
            );
            log::warn!("{}", advisory);
            Ok(TraceResolution {
                mode: TraceMode::ForwardOnly,
                advisory: Some(advisory),
            })
        }
        _ => Ok(TraceResolution {
            mode: requested,
            advisory: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODES: [TraceMode; 5] = [
        TraceMode::ForwardOnly,
        TraceMode::BackwardOnly,
        TraceMode::Average,
        TraceMode::Difference,
        TraceMode::None,
    ];

    #[test]
    fn test_forward_only_data_forces_forward() {
        for mode in ALL_MODES {
            let resolution = resolve_trace(TraceRequest(mode), ScanDirection::ForwardOnly).unwrap();
            assert_eq!(resolution.mode, TraceMode::ForwardOnly);
            assert_eq!(resolution.advisory.is_some(), mode != TraceMode::ForwardOnly);
        }
    }

    #[test]
    fn test_bidirectional_data_passes_request_through() {
        for mode in ALL_MODES {
            let resolution =
                resolve_trace(TraceRequest(mode), ScanDirection::ForwardAndBackward).unwrap();
            assert_eq!(resolution.mode, mode);
            assert!(resolution.advisory.is_none());
        }
    }

    #[test]
    fn test_missing_direction_is_fatal() {
        let request = TraceRequest(TraceMode::Average);
        assert!(matches!(
            resolve_trace(request, ScanDirection::Unknown),
            Err(TopoError::UnknownScanDirection)
        ));
        assert!(matches!(
            resolve_trace(request, ScanDirection::NoData),
            Err(TopoError::NoScanData)
        ));
    }
}
