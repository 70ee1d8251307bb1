//! Integration tests for a complete conversion run
//!
//! These tests drive the public `Pipeline` API over realistic exports written
//! into a temporary XaurumTools tree and inspect the produced workbooks.

use rust_xlsxwriter::{Url, Workbook};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use xaurum_processor::convert::FormatNormalizer;
use xaurum_processor::processor::staff::ExistingStaffFile;
use xaurum_processor::sheet::SpreadsheetFile;
use xaurum_processor::{ConverterConfig, DatasetKind, DatasetOutcome, Pipeline};

fn write_export(path: &Path, header_row: u32, header: &[&str], rows: &[&[&str]]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let first = header_row - 1;
    for (col, label) in header.iter().enumerate() {
        sheet.write_string(first, col as u16, *label).unwrap();
    }
    for (index, row) in rows.iter().enumerate() {
        let row_number = first + 1 + index as u32;
        for (col, value) in row.iter().enumerate() {
            if value.starts_with("https://") {
                sheet
                    .write_url(row_number, col as u16, Url::new(*value).set_text("PDF"))
                    .unwrap();
            } else if !value.is_empty() {
                sheet.write_string(row_number, col as u16, *value).unwrap();
            }
        }
    }
    workbook.save(path).unwrap();
}

fn setup() -> (TempDir, ConverterConfig) {
    let temp_dir = TempDir::new().unwrap();
    let config = ConverterConfig::from_root(temp_dir.path().join("XaurumTools"));
    config.ensure_dirs().unwrap();
    (temp_dir, config)
}

fn run(config: ConverterConfig) -> xaurum_processor::RunReport {
    let pipeline = Pipeline::new(
        Arc::new(config),
        Arc::new(ExistingStaffFile),
        Arc::new(FormatNormalizer::native_only()),
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(pipeline.run(None))
}

fn rows(path: &Path) -> Vec<Vec<String>> {
    let sheet = SpreadsheetFile::open(path).unwrap().first_sheet().unwrap();
    (1..=sheet.max_row()).map(|row| sheet.row_text(row)).collect()
}

/// Names of the table parts inside an `.xlsx` container
fn table_parts(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with("xl/tables/") && name.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    names
        .iter()
        .map(|name| {
            let mut xml = String::new();
            archive
                .by_name(name)
                .unwrap()
                .read_to_string(&mut xml)
                .unwrap();
            xml
        })
        .collect()
}

#[test]
fn test_certificates_output_contract() {
    let (_temp_dir, config) = setup();
    write_export(
        &config
            .input_dir
            .join("20250101_120000_certificates_overview.xlsx"),
        1,
        &[
            " Naam ", "Service", "Group ID", "SAP Nr", "Certificaat", "Behaald op", "Verloopt op",
            "",
        ],
        &[
            &[
                "Jan Peeters", "North", "G100", "SAP-0010001", "EQUANS_VCA", "01/02/2021",
                "2024-01-01", "https://certs.example/old.pdf",
            ],
            &[
                "Jan Peeters", "North", "G100", "SAP-0010001", "VCA", "01/02/2023", "2025-06-01",
                "https://certs.example/new.pdf",
            ],
            &["An Claes", "South", "G200", "", "Hoogspanning", "", "onbeperkt", ""],
        ],
    );
    let output = config
        .output_path(DatasetKind::Certificates)
        .to_path_buf();

    let report = run(config);

    match &report.get(DatasetKind::Certificates).unwrap().outcome {
        DatasetOutcome::Written { path, summary } => {
            assert_eq!(path, &output);
            assert_eq!(summary.rows_read, 3);
            assert_eq!(summary.rows_written, 2);
            assert_eq!(summary.duplicates_removed, 1);
        }
        other => panic!("Expected Certificates to be written, got {:?}", other),
    }

    let written = rows(&output);
    assert_eq!(
        written[0],
        vec![
            "Employee_Name",
            "Service",
            "staffGID",
            "staffSAP",
            "CertName",
            "IssuedDate",
            "ExpiryDate",
            "Future_Certificates",
            "DownloadLink",
        ]
    );
    let jan = written.iter().find(|row| row[0] == "Jan Peeters").unwrap();
    assert_eq!(jan[3], "10001");
    assert_eq!(jan[4], "VCA");
    assert_eq!(jan[5], "2023-02-01");
    assert_eq!(jan[6], "2025-06-01");
    assert_eq!(jan[8], "https://certs.example/new.pdf");
    let an = written.iter().find(|row| row[0] == "An Claes").unwrap();
    assert_eq!(an[6], "onbeperkt");

    let tables = table_parts(&output);
    assert_eq!(tables.len(), 1);
    assert!(tables[0].contains(r#"name="tblCertificates""#));
}

#[test]
fn test_run_without_inputs_reports_every_dataset() {
    let (_temp_dir, config) = setup();
    let report = run(config);

    assert_eq!(report.datasets.len(), DatasetKind::ALL.len());
    assert_eq!(report.written(), 0);
    assert_eq!(report.skipped(), DatasetKind::ALL.len());
    let kinds: Vec<DatasetKind> = report.datasets.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, DatasetKind::ALL.to_vec());
}

#[test]
fn test_cert_results_join_staff_numbers() {
    let (_temp_dir, config) = setup();
    let staff = config.output_path(DatasetKind::Staff).to_path_buf();
    write_export(
        &staff,
        1,
        &["staffGID", "staffSAPNR", "Employee_Name", "Service"],
        &[&["G100", "0010001", "Jan Peeters", "North"]],
    );
    write_export(
        &config.input_dir.join("Report_certification_2025.xlsx"),
        1,
        &["GID", "Naam", "Certificaat", "Status", "Behaald"],
        &[
            &["G100", "Jan Peeters", "VCA", "Passed", "04/03/2025"],
            &["G300", "Piet Maes", "VCA", "Failed", ""],
        ],
    );
    let output = config.output_path(DatasetKind::CertResults).to_path_buf();

    let report = run(config);

    assert_eq!(report.lookup_entries, 1);
    assert_eq!(report.lookup_misses(), 1);
    assert!(matches!(
        report.get(DatasetKind::Staff).unwrap().outcome,
        DatasetOutcome::Written { .. }
    ));

    let written = rows(&output);
    assert_eq!(written.len(), 3);
    assert_eq!(written[1][1], "10001");
    assert_eq!(written[1][6], "2025-03-04");
    assert_eq!(written[2][1], "");
}
