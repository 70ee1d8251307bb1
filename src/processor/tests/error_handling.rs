//! Error handling integration tests

use super::fixtures::{
    CERTIFICATE_HEADER, input_path, pipeline, read_rows, temp_config, write_staff_file,
    write_workbook,
};
use crate::convert::FormatNormalizer;
use crate::convert::office::tests::{CallLog, FakeLauncher};
use crate::models::{DatasetKind, DatasetOutcome};
use crate::processor::staff::{ExistingStaffFile, MasterWorkbookRefresh};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_corrupt_input_does_not_stop_other_datasets() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_config(&temp_dir);
    fs::write(
        input_path(&config, "20250101_certificates_overview.xls"),
        b"this is not a workbook",
    )
    .unwrap();
    write_workbook(
        &input_path(&config, "20250101_competences_overview.xlsx"),
        1,
        &["Personeel", "Competence"],
        &[&["An Claes", "Hoogspanning"]],
    );

    let report = pipeline(config, Arc::new(ExistingStaffFile), FormatNormalizer::native_only())
        .run(None)
        .await;

    match &report.get(DatasetKind::Certificates).unwrap().outcome {
        DatasetOutcome::Skipped { reason } => {
            assert!(reason.contains("Conversion failed"), "{}", reason);
        }
        other => panic!("Expected Certificates to be skipped, got {:?}", other),
    }
    assert!(matches!(
        report.get(DatasetKind::Competences).unwrap().outcome,
        DatasetOutcome::Written { .. }
    ));
}

#[tokio::test]
async fn test_external_failure_releases_application_once() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_config(&temp_dir);
    let source = input_path(&config, "20250101_certificates_overview.xls");
    fs::write(&source, b"legacy bytes no reader understands").unwrap();

    let launcher = FakeLauncher {
        fail_on_save: true,
        ..Default::default()
    };
    let log = Arc::clone(&launcher.log);
    let normalizer = FormatNormalizer::new(Arc::new(launcher));

    let report = pipeline(config, Arc::new(ExistingStaffFile), normalizer)
        .run(None)
        .await;

    assert!(matches!(
        report.get(DatasetKind::Certificates).unwrap().outcome,
        DatasetOutcome::Skipped { .. }
    ));
    assert_eq!(CallLog::count(&log.launches), 1);
    assert_eq!(CallLog::count(&log.saves), 1);
    assert_eq!(CallLog::count(&log.closes), 1);
    assert_eq!(CallLog::count(&log.quits), 1);
    assert!(!source.with_extension("xlsx").exists());
}

#[tokio::test]
async fn test_external_conversion_after_native_failure() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_config(&temp_dir);

    // An .xlsx container under a legacy name: the native reader rejects it,
    // the fake application copies it through unchanged
    write_workbook(
        &input_path(&config, "20250101_certificates_overview.xls"),
        1,
        CERTIFICATE_HEADER,
        &[&["Jan Peeters", "", "G100", "", "VCA", "", "2026-01-31", ""]],
    );
    let output = config.output_path(DatasetKind::Certificates).to_path_buf();

    let launcher = FakeLauncher::default();
    let log = Arc::clone(&launcher.log);
    let report = pipeline(
        config,
        Arc::new(ExistingStaffFile),
        FormatNormalizer::new(Arc::new(launcher)),
    )
    .run(None)
    .await;

    assert!(matches!(
        report.get(DatasetKind::Certificates).unwrap().outcome,
        DatasetOutcome::Written { .. }
    ));
    assert_eq!(CallLog::count(&log.quits), 1);
    assert_eq!(read_rows(&output)[1][6], "2026-01-31");
}

#[tokio::test]
async fn test_missing_master_leaves_lookup_empty() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_config(&temp_dir);
    write_workbook(
        &input_path(&config, "Report_certification.xlsx"),
        1,
        &["GID", "Naam", "Certificaat"],
        &[&["G100", "Jan Peeters", "VCA"]],
    );
    let refresher = MasterWorkbookRefresh::new(config.master_workbook.clone(), None);

    let report = pipeline(config, Arc::new(refresher), FormatNormalizer::native_only())
        .run(None)
        .await;

    assert!(matches!(
        report.get(DatasetKind::Staff).unwrap().outcome,
        DatasetOutcome::Skipped { .. }
    ));
    assert_eq!(report.lookup_entries, 0);
    match &report.get(DatasetKind::CertResults).unwrap().outcome {
        DatasetOutcome::Written { summary, .. } => assert_eq!(summary.lookup_misses, 1),
        other => panic!("Expected CertResults to be written, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreadable_staff_file_is_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_config(&temp_dir);
    let staff = config.output_path(DatasetKind::Staff).to_path_buf();
    fs::write(&staff, b"truncated").unwrap();

    let report = pipeline(config, Arc::new(ExistingStaffFile), FormatNormalizer::native_only())
        .run(None)
        .await;

    assert_eq!(report.lookup_entries, 0);
    assert_eq!(report.datasets.len(), 5);
    match &report.get(DatasetKind::Staff).unwrap().outcome {
        DatasetOutcome::Skipped { reason } => {
            assert!(reason.contains("Staff file unreadable"), "{}", reason);
        }
        other => panic!("Expected Staff to be skipped, got {:?}", other),
    }

    // A valid file afterwards is picked up on the next run
    write_staff_file(&staff, &[("G1", "12345", "Jan")]);
    let config = temp_config(&temp_dir);
    let report = pipeline(config, Arc::new(ExistingStaffFile), FormatNormalizer::native_only())
        .run(None)
        .await;
    assert_eq!(report.lookup_entries, 1);
    match &report.get(DatasetKind::Staff).unwrap().outcome {
        DatasetOutcome::Written { summary, .. } => assert_eq!(summary.rows_written, 1),
        other => panic!("Expected Staff to be written, got {:?}", other),
    }
}
