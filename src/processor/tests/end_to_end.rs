//! Full pipeline runs over generated exports

use super::fixtures::{
    CERTIFICATE_HEADER, input_path, pipeline, read_rows, temp_config, write_staff_file,
    write_workbook,
};
use crate::convert::FormatNormalizer;
use crate::models::{DatasetKind, DatasetOutcome};
use crate::processor::staff::ExistingStaffFile;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_duplicate_certificates_keep_latest_expiry() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_config(&temp_dir);
    write_workbook(
        &input_path(&config, "20250101_120000_certificates_overview.xlsx"),
        1,
        CERTIFICATE_HEADER,
        &[
            &["Jan Peeters", "North", "G100", "", "VCA", "01/02/2021", "2024-01-01", "https://x/old.pdf"],
            &["Jan Peeters", "North", "G100", "", "VCA", "01/02/2023", "2025-06-01", "https://x/new.pdf"],
        ],
    );
    let output = config.output_path(DatasetKind::Certificates).to_path_buf();

    let report = pipeline(config, Arc::new(ExistingStaffFile), FormatNormalizer::native_only())
        .run(None)
        .await;

    let certificates = report.get(DatasetKind::Certificates).unwrap();
    match &certificates.outcome {
        DatasetOutcome::Written { summary, .. } => {
            assert_eq!(summary.rows_written, 1);
            assert_eq!(summary.duplicates_removed, 1);
        }
        other => panic!("Expected Certificates to be written, got {:?}", other),
    }

    let rows = read_rows(&output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][2], "G100");
    assert_eq!(rows[1][5], "2023-02-01");
    assert_eq!(rows[1][6], "2025-06-01");
    assert_eq!(rows[1][8], "https://x/new.pdf");
}

#[tokio::test]
async fn test_full_run_writes_every_output() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_config(&temp_dir);
    write_staff_file(
        config.output_path(DatasetKind::Staff),
        &[("G100", "SAP-0010001", "Jan Peeters"), ("G200", "20002", "An Claes")],
    );

    write_workbook(
        &input_path(&config, "20250101_certificates_overview.xlsx"),
        1,
        CERTIFICATE_HEADER,
        &[&["Jan Peeters", "North", "G100", "0010001", "EQUANS_VCA", "", "onbeperkt", ""]],
    );
    write_workbook(
        &input_path(&config, "20250101_competences_overview.xlsx"),
        1,
        &["User CID", "Employee N°", "Personeel", "Competence", "Behaald op", "Geldig tot"],
        &[&["G200", "20002", "An Claes", "Hoogspanning", "2024-05-01", "31/12/2026"]],
    );
    write_workbook(
        &input_path(&config, "rapport_teamopleidingen_2025.xlsx"),
        2,
        &["Naam", "CID", "Opleiding", "Statuut", "Datum"],
        &[&["An Claes", "G200", "EA-E-204-BA5 Safety", "Requested", "2025-03-04"]],
    );
    write_workbook(
        &input_path(&config, "Report_certification_2025.xlsx"),
        1,
        &["GID", "Naam", "Certificaat", "Status", "Behaald", "Download"],
        &[
            &["G100", "Jan Peeters", "VCA", "Passed", "2024-02-02", "https://x/r1"],
            &["G999", "Unknown", "VCA", "Failed", "", ""],
        ],
    );

    let outputs: Vec<_> = DatasetKind::ALL
        .iter()
        .map(|kind| config.output_path(*kind).to_path_buf())
        .collect();
    let report = pipeline(config, Arc::new(ExistingStaffFile), FormatNormalizer::native_only())
        .run(None)
        .await;

    assert_eq!(report.datasets.len(), 5);
    assert_eq!(report.written(), 5, "report: {:?}", report.datasets);
    assert_eq!(report.lookup_entries, 2);
    assert_eq!(report.lookup_misses(), 1);
    for output in &outputs {
        assert!(output.is_file(), "missing {}", output.display());
    }

    let certificates = read_rows(&outputs[1]);
    assert_eq!(certificates[1][3], "10001");
    assert_eq!(certificates[1][4], "VCA");
    assert_eq!(certificates[1][6], "onbeperkt");

    let competences = read_rows(&outputs[2]);
    assert_eq!(competences[1][5], "2026-12-31");

    let training = read_rows(&outputs[3]);
    assert_eq!(training[1][4], "EA-E-204 - BA5 Safety");

    let results = read_rows(&outputs[4]);
    assert_eq!(results[1][1], "10001");
    assert_eq!(results[1][14], "https://x/r1");
    assert_eq!(results[2][0], "G999");
    assert_eq!(results[2][1], "");
}

#[tokio::test]
async fn test_missing_inputs_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_config(&temp_dir);

    let report = pipeline(config, Arc::new(ExistingStaffFile), FormatNormalizer::native_only())
        .run(None)
        .await;

    assert_eq!(report.datasets.len(), 5);
    assert_eq!(report.written(), 0);
    assert_eq!(report.lookup_entries, 0);
    for kind in DatasetKind::CONVERTED {
        match &report.get(kind).unwrap().outcome {
            DatasetOutcome::Skipped { reason } => {
                assert!(reason.contains("No input file found"), "{}", reason);
            }
            other => panic!("Expected {} to be skipped, got {:?}", kind, other),
        }
    }
}

#[tokio::test]
async fn test_newest_export_is_used() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_config(&temp_dir);
    let header = &["Naam", "CID", "Opleiding"];

    let older = input_path(&config, "rapport_teamopleidingen_old.xlsx");
    write_workbook(&older, 2, header, &[&["Old", "G1", "First Aid"]]);
    let old_time = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
    std::fs::File::options()
        .write(true)
        .open(&older)
        .unwrap()
        .set_modified(old_time)
        .unwrap();
    write_workbook(
        &input_path(&config, "safety_training.xlsx"),
        2,
        header,
        &[&["New", "G2", "VCA"]],
    );
    let output = config.output_path(DatasetKind::Training).to_path_buf();

    let report = pipeline(config, Arc::new(ExistingStaffFile), FormatNormalizer::native_only())
        .run(None)
        .await;

    let training = report.get(DatasetKind::Training).unwrap();
    assert!(
        training
            .input
            .as_ref()
            .unwrap()
            .ends_with("safety_training.xlsx")
    );
    assert_eq!(read_rows(&output)[1][0], "New");
}
