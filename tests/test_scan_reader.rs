use scan2bcr::{
    BcrWriter, NmmScanReader, Pipeline, ProcessingConfig, ScanDirection, ScanFileName, ScanSource,
    TopoError, TraceMode, TraceRequest,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const INDEX: &str = "\
CreationDate : 2021-03-09 14:05:00
Instrument : NMM-1
User : Jane Doe
Organisation : Metrology Lab
SampleIdentifier : STEP-500
NumberOfDataPoints : 3
NumberOfProfiles : 2
ScanFieldDeltaX : 1e-7
ScanFieldDeltaY : 5e-7
AirTemperature : 20.015
AirPressure : 101300
Comment : first comment
Comment : second comment
";

const CHANNELS: &str = "1 : LX : x position\n2 : LZ : interferometer z\n3 : AZ : probe signal\n";

// columns LX LZ AZ, profiles of three points
const FORWARD: &str = "\
0.0 1.0e-6 0.1e-6
1.0 2.0e-6 0.2e-6
2.0 3.0e-6 0.3e-6
0.0 4.0e-6 0.4e-6
1.0 5.0e-6 0.5e-6
2.0 6.0e-6 0.6e-6
";

// recorded in the return direction
const BACKWARD: &str = "\
2.0 3.2e-6 0.3e-6
1.0 2.2e-6 0.2e-6
0.0 1.2e-6 0.1e-6
2.0 6.2e-6 0.6e-6
1.0 5.2e-6 0.5e-6
0.0 4.2e-6 0.4e-6
";

fn write_record(dir: &Path, name: &str, backward: bool) {
    fs::write(dir.join(format!("{}.ind", name)), INDEX).unwrap();
    fs::write(dir.join(format!("{}.dsc", name)), CHANNELS).unwrap();
    fs::write(dir.join(format!("{}.dat", name)), FORWARD).unwrap();
    if backward {
        fs::write(dir.join(format!("{}_b.dat", name)), BACKWARD).unwrap();
    }
}

#[test]
fn test_read_forward_and_backward_record() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "step", true);

    let reader = NmmScanReader::new(ScanFileName::new(dir.path().join("step.ind"))).unwrap();
    let meta = reader.metadata();
    assert_eq!(meta.base_file_name, "step");
    assert_eq!(meta.number_of_data_points, 3);
    assert_eq!(meta.number_of_profiles, 2);
    assert_eq!(meta.number_of_scans, 1);
    assert_eq!(meta.scan_direction, ScanDirection::ForwardAndBackward);
    assert_eq!(meta.scan_comments.len(), 2);
    assert!(reader.has_channel("-LZ+AZ"));
    assert!(!reader.has_channel("F4"));

    let forward = reader.extract_profile("LZ", 0, TraceMode::ForwardOnly).unwrap();
    assert_eq!(forward, vec![1.0e-6, 2.0e-6, 3.0e-6, 4.0e-6, 5.0e-6, 6.0e-6]);

    // backward profiles are reversed onto the forward grid
    let backward = reader.extract_profile("LZ", 2, TraceMode::BackwardOnly).unwrap();
    assert_eq!(backward, vec![4.2e-6, 5.2e-6, 6.2e-6]);

    let difference = reader.extract_profile("LZ", 1, TraceMode::Difference).unwrap();
    for d in difference {
        assert!((d + 0.2e-6).abs() < 1e-15);
    }
}

#[test]
fn test_forward_only_record() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "fwd", false);

    let reader = NmmScanReader::new(ScanFileName::new(dir.path().join("fwd"))).unwrap();
    assert_eq!(reader.metadata().scan_direction, ScanDirection::ForwardOnly);
}

fn declare_direction(dir: &Path, name: &str, declared: &str) {
    let index = format!("{}ScanDirection : {}\n", INDEX, declared);
    fs::write(dir.join(format!("{}.ind", name)), index).unwrap();
}

#[test]
fn test_declared_forward_ignores_backward_file() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "fwd", true);
    declare_direction(dir.path(), "fwd", "forward");

    let reader = NmmScanReader::new(ScanFileName::new(dir.path().join("fwd"))).unwrap();
    assert_eq!(reader.metadata().scan_direction, ScanDirection::ForwardOnly);
}

#[test]
fn test_declared_both_directions_without_backward_file() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "step", false);
    declare_direction(dir.path(), "step", "Forward+Backward");

    let mut reader = NmmScanReader::new(ScanFileName::new(dir.path().join("step"))).unwrap();
    assert_eq!(reader.metadata().scan_direction, ScanDirection::ForwardOnly);

    // the requested average falls back to the forward trace
    let config = ProcessingConfig::new().with_trace(TraceRequest(TraceMode::Average));
    let report = Pipeline::new(config)
        .run(&mut reader, &BcrWriter::default())
        .unwrap();
    assert_eq!(report.trace, TraceMode::ForwardOnly);
    assert_eq!(report.advisories.len(), 1);
    assert_eq!(report.output_path, dir.path().join("step_f.sdf"));
}

#[test]
fn test_unrecognised_direction_is_fatal() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "step", true);
    declare_direction(dir.path(), "step", "sideways");

    let mut reader = NmmScanReader::new(ScanFileName::new(dir.path().join("step"))).unwrap();
    assert_eq!(reader.metadata().scan_direction, ScanDirection::Unknown);

    let err = Pipeline::new(ProcessingConfig::new())
        .run(&mut reader, &BcrWriter::default())
        .unwrap_err();
    assert!(matches!(err, TopoError::UnknownScanDirection));
    assert_eq!(err.exit_code(), 2);
    assert!(!dir.path().join("step.sdf").exists());
}

#[test]
fn test_backward_data_file_as_input() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "step", true);

    let reader = NmmScanReader::new(ScanFileName::new(dir.path().join("step_b.dat"))).unwrap();
    assert_eq!(reader.metadata().base_file_name, "step");
    assert_eq!(reader.metadata().scan_direction, ScanDirection::ForwardAndBackward);
}

#[test]
fn test_missing_record_is_missing_input() {
    let dir = tempdir().unwrap();
    let result = NmmScanReader::new(ScanFileName::new(dir.path().join("nothing")));
    match result {
        Err(err) => {
            assert!(matches!(err, TopoError::MissingInput(_)));
            assert_eq!(err.exit_code(), 1);
        }
        Ok(_) => panic!("expected a missing input error"),
    }
}

#[test]
fn test_indexed_scans() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "multi_001", false);
    write_record(dir.path(), "multi_002", true);

    let name = ScanFileName::new(dir.path().join("multi")).with_scan_index(2);
    let reader = NmmScanReader::new(name).unwrap();
    assert_eq!(reader.metadata().number_of_scans, 2);
    assert_eq!(reader.metadata().scan_index, 2);
    assert_eq!(reader.metadata().base_file_name, "multi_002");
    assert_eq!(reader.metadata().scan_direction, ScanDirection::ForwardAndBackward);
}

#[test]
fn test_convert_record_to_bcr_file() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "step", true);

    let mut reader = NmmScanReader::new(ScanFileName::new(dir.path().join("step"))).unwrap();
    let config = ProcessingConfig::new()
        .with_channel("LZ")
        .with_reference(1, 0.0)
        .with_trace(TraceRequest(TraceMode::Average));
    let report = Pipeline::new(config)
        .run(&mut reader, &BcrWriter::default())
        .unwrap();

    assert_eq!(report.output_path, dir.path().join("step_a_LZ.sdf"));
    let content = fs::read_to_string(&report.output_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines[0], "aBCR-1.0");
    assert!(lines.contains(&"ManufacID   = NMM-1"));
    assert!(lines.contains(&"CreateDate  = 090320211405"));
    assert!(lines.contains(&"NumPoints   = 3"));
    assert!(lines.contains(&"NumProfiles = 2"));
    assert!(lines.contains(&"ReferenceDatum = minimum value"));
    assert!(lines.contains(&"AirTemperature = 20.015 oC"));
    assert!(lines.contains(&"ScanComment2 = second comment"));

    // average trace is 0.1 um above forward; minimum reference removes the base
    let first_data = lines.iter().position(|l| *l == "*").unwrap() + 1;
    assert_eq!(lines[first_data], "0.000000");
    assert_eq!(lines[first_data + 5], "5.000000");
}

#[test]
fn test_repeated_conversion_keeps_earlier_result() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "step", true);
    let config = ProcessingConfig::new().with_trace(TraceRequest(TraceMode::Average));

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let mut reader = NmmScanReader::new(ScanFileName::new(dir.path().join("step"))).unwrap();
        let report = Pipeline::new(config.clone())
            .run(&mut reader, &BcrWriter::default())
            .unwrap();
        outputs.push(report.output_path);
    }

    assert_eq!(outputs[0], dir.path().join("step_a.sdf"));
    assert_eq!(outputs[1], dir.path().join("step_1_a.sdf"));
    assert!(outputs.iter().all(|path| path.exists()));
}

#[test]
fn test_correction_on_text_record_is_not_fatal() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "step", false);

    let mut reader = NmmScanReader::new(ScanFileName::new(dir.path().join("step"))).unwrap();
    let config = ProcessingConfig::new().with_correction(true).with_postfix(false);
    let report = Pipeline::new(config)
        .run(&mut reader, &BcrWriter::default())
        .unwrap();

    assert_eq!(report.output_path, dir.path().join("step.sdf"));
    let content = fs::read_to_string(&report.output_path).unwrap();
    assert!(content.contains("NonlinearityCorrection = failed, data uncorrected"));
    assert!(!content.contains("NonlinearitySpan"));
}

#[test]
fn test_missing_channel_leaves_no_file() {
    let dir = tempdir().unwrap();
    write_record(dir.path(), "step", false);

    let mut reader = NmmScanReader::new(ScanFileName::new(dir.path().join("step"))).unwrap();
    let config = ProcessingConfig::new().with_channel("F4");
    let err = Pipeline::new(config)
        .run(&mut reader, &BcrWriter::default())
        .unwrap_err();

    assert_eq!(err.exit_code(), 5);
    let outputs = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |x| x == "sdf"))
        .count();
    assert_eq!(outputs, 0);
}
