//! Integration tests for gapfill: load, fill, save, reload.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use tempfile::TempDir;

use gapfill::output::{backup_path, save_as_path, save_in_place_at};
use gapfill::{
    FieldLinks, GapfillError, KeyConfig, Parser, ReconciliationSession, TransformRule,
    TransformRules,
};

/// Helper to write a file into a temp directory.
fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Workbook with a customer sheet followed by a notes sheet.
fn write_workbook(path: &Path) {
    let mut workbook = Workbook::new();
    let customers = workbook.add_worksheet();
    customers.set_name("Customers").unwrap();
    let rows = [
        ["KundenNr", "Firma", "Straße", "Hausnummer", "Telefon", "PLZ", "Country"],
        ["1001", "", "", "", "", "10115", ""],
        ["1002", "Beta GmbH", "Hauptstraße", "5", "030111", "80331", "Deutschland"],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            customers.write_string(r as u32, c as u16, *value).unwrap();
        }
    }
    let notes = workbook.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "Remark").unwrap();
    notes.write_string(1, 0, "Keep this").unwrap();
    notes.write_number(1, 1, 42.0).unwrap();
    notes.write_string(0, 2, "Date").unwrap();
    let date = ExcelDateTime::from_ymd(2024, 3, 5).unwrap();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    notes
        .write_datetime_with_format(1, 2, &date, &date_format)
        .unwrap();
    workbook.save(path).unwrap();
}

fn secondary_csv(dir: &TempDir) -> PathBuf {
    write_file(
        dir,
        "crm.csv",
        "cust_id;company;address;phone\n\
         1001;;Lindenallee 12a;\n\
         1001;Acme AG;;+49 (0)30-1234567\n\
         1002;Other Name;Somewhere 1;0301\n",
    )
}

fn links() -> FieldLinks {
    FieldLinks::new()
        .with_link("Firma", "company")
        .with_link("Straße", "address")
        .with_link("Telefon", "phone")
}

// =============================================================================
// Delimited round trip
// =============================================================================

#[test]
fn test_fill_csv_and_reload() {
    let dir = TempDir::new().unwrap();
    let primary_path = write_file(
        &dir,
        "customers.csv",
        "KundenNr,Firma,Straße,Hausnummer,Telefon\n\
         1001,,,,\n\
         1002,Beta GmbH,Hauptstraße,5,030111\n\
         1003,,,,\n",
    );
    let secondary_path = secondary_csv(&dir);

    let parser = Parser::new();
    let (primary, meta) = parser.load(&primary_path, "customers", 1).unwrap();
    assert_eq!(meta.format, "csv");
    let (secondary, meta) = parser.load(&secondary_path, "crm", 1).unwrap();
    assert_eq!(meta.format, "csv-semicolon");

    let mut session = ReconciliationSession::new(primary);
    session
        .attach_secondary(secondary, KeyConfig::new("KundenNr", "cust_id"))
        .unwrap();
    session.set_links(links());

    let flagged = session.scan_default().unwrap().keys().to_vec();
    assert_eq!(flagged, vec!["1001", "1003"]);

    let report = session.autofill_all().unwrap();
    assert_eq!(report.rows_matched, 2);
    assert_eq!(report.rows_unmatched, 1);
    assert_eq!(report.fields_filled, 3);

    let out = dir.path().join("filled.csv");
    save_as_path(session.primary(), &out).unwrap();

    let (reloaded, _) = parser.load(&out, "filled", 1).unwrap();
    assert_eq!(reloaded.value(0, "Firma"), Some("Acme AG"));
    assert_eq!(reloaded.value(0, "Straße"), Some("Lindenallee"));
    assert_eq!(reloaded.value(0, "Hausnummer"), Some("12a"));
    assert_eq!(reloaded.value(0, "Telefon"), Some("+49301234567"));
    // Existing values untouched
    assert_eq!(reloaded.value(1, "Firma"), Some("Beta GmbH"));
    assert_eq!(reloaded.value(1, "Telefon"), Some("030111"));
    assert_eq!(reloaded.value(2, "Firma"), Some(""));
}

#[test]
fn test_leading_zero_keys() {
    let dir = TempDir::new().unwrap();
    let primary_path = write_file(&dir, "p.csv", "id,name\n007,\n");
    let secondary_path = write_file(&dir, "s.csv", "id,name\n7,Bond\n");

    let parser = Parser::new();
    let (primary, _) = parser.load(&primary_path, "p", 1).unwrap();
    let (secondary, _) = parser.load(&secondary_path, "s", 1).unwrap();

    let mut session = ReconciliationSession::new(primary);
    session.link("name", "name");

    session
        .attach_secondary(secondary.clone(), KeyConfig::new("id", "id"))
        .unwrap();
    assert_eq!(session.autofill_all().unwrap().fields_filled, 0);

    session
        .attach_secondary(secondary, KeyConfig::new("id", "id").with_keep_leading_zeros(false))
        .unwrap();
    assert_eq!(session.autofill_all().unwrap().fields_filled, 1);
    assert_eq!(session.primary().value(0, "name"), Some("Bond"));
}

#[test]
fn test_missing_key_column_is_config_error() {
    let dir = TempDir::new().unwrap();
    let primary_path = write_file(&dir, "p.csv", "id,name\n1,\n");
    let parser = Parser::new();
    let (primary, _) = parser.load(&primary_path, "p", 1).unwrap();

    let mut session = ReconciliationSession::new(primary.clone());
    let err = session
        .attach_secondary(primary, KeyConfig::new("id", "customer"))
        .unwrap_err();
    assert!(matches!(err, GapfillError::MissingColumn { .. }));
    assert!(!err.is_recoverable());
}

// =============================================================================
// Workbook in-place save
// =============================================================================

#[test]
fn test_save_in_place_keeps_other_sheets_and_backs_up() {
    let dir = TempDir::new().unwrap();
    let book = dir.path().join("customers.xlsx");
    write_workbook(&book);
    let original = fs::read(&book).unwrap();
    let secondary_path = secondary_csv(&dir);

    let parser = Parser::new();
    assert_eq!(parser.list_sheets(&book).unwrap(), vec!["Customers", "Notes"]);
    let (notes, _) = parser.load(&book, "Notes", 1).unwrap();
    assert_eq!(notes.value(0, "Date"), Some("2024-03-05 00:00:00"));
    let (primary, _) = parser.load(&book, "Customers", 1).unwrap();
    let (secondary, _) = parser.load(&secondary_path, "crm", 1).unwrap();

    let mut session = ReconciliationSession::new(primary);
    session
        .attach_secondary(secondary, KeyConfig::new("KundenNr", "cust_id"))
        .unwrap();
    session.set_links(links());
    session.set_rules(TransformRules::default().with(TransformRule::FillCountryDefault, true));
    session.autofill_all().unwrap();

    let now = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 5, 0)
        .unwrap();
    save_in_place_at(session.primary(), &book, Some("Customers"), true, now).unwrap();

    let backup = backup_path(&book, now);
    assert_eq!(
        backup.file_name().unwrap().to_str().unwrap(),
        "customers_backup_2024-06-01_1205.xlsx"
    );
    assert_eq!(fs::read(&backup).unwrap(), original);

    assert_eq!(parser.list_sheets(&book).unwrap(), vec!["Customers", "Notes"]);
    let (customers, _) = parser.load(&book, "Customers", 1).unwrap();
    assert_eq!(customers.value(0, "Firma"), Some("Acme AG"));
    assert_eq!(customers.value(0, "Hausnummer"), Some("12a"));
    assert_eq!(customers.value(0, "Country"), Some("Deutschland"));
    assert_eq!(customers.value(0, "PLZ"), Some("10115"));

    let (notes, _) = parser.load(&book, "Notes", 1).unwrap();
    assert_eq!(notes.headers[0], "Remark");
    assert_eq!(notes.value(0, "Remark"), Some("Keep this"));
    assert_eq!(notes.get(0, 1), Some("42"));
    // Dates in untouched sheets survive as text, not serial numbers
    assert_eq!(notes.value(0, "Date"), Some("2024-03-05 00:00:00"));
}

#[test]
fn test_save_in_place_without_backup() {
    let dir = TempDir::new().unwrap();
    let book = dir.path().join("plain.xlsx");
    write_workbook(&book);

    let parser = Parser::new();
    let (primary, _) = parser.load(&book, "Notes", 1).unwrap();
    let now = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 5, 0)
        .unwrap();
    save_in_place_at(&primary, &book, Some("Notes"), false, now).unwrap();

    assert!(!backup_path(&book, now).exists());
    // The replaced sheet moves to the front
    assert_eq!(parser.list_sheets(&book).unwrap(), vec!["Notes", "Customers"]);
}
