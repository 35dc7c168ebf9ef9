//! The auto-fill policy for one primary row.

use tracing::{debug, trace};

use crate::index::FieldLinks;
use crate::input::{Dataset, KEY_COLUMN, Row};
use crate::normalize::{is_missing, normalize_text};
use crate::transform::pipeline::{
    COUNTRY_LABELS, HOUSE_NUMBER_LABELS, PHONE_LABELS, POSTAL_CODE_LABELS, STATE_LABELS,
    STREET_LABELS, is_label,
};
use crate::transform::{
    ChangeRecord, FillReport, RegionLookup, TransformRule, TransformRules, fill_country_default,
    normalize_phone, split_street_house, state_from_postal_code,
};

/// A secondary row matched to the primary row, tagged with where it came from.
pub(crate) struct MatchedRow<'a> {
    pub source: &'a str,
    pub row: Row<'a>,
}

/// Settings the policy reads; borrowed from the session for one run.
pub(crate) struct FillPolicy<'a> {
    pub links: &'a FieldLinks,
    pub rules: TransformRules,
    pub country_default: &'a str,
    pub lookup: Option<&'a dyn RegionLookup>,
}

impl FillPolicy<'_> {
    /// Fill the missing linked fields of one primary row.
    ///
    /// Already-filled fields are never overwritten, so running this twice fills
    /// nothing the second time. `skip` holds the key columns.
    pub fn fill_row(
        &self,
        primary: &mut Dataset,
        row: usize,
        key: &str,
        skip: &[String],
        matches: &[MatchedRow<'_>],
    ) -> FillReport {
        let mut report = FillReport::new();
        if matches.is_empty() {
            report.rows_unmatched = 1;
            return report;
        }
        report.rows_matched = 1;

        let columns = primary.headers.clone();
        for column in &columns {
            if column == KEY_COLUMN || skip.contains(column) {
                continue;
            }
            if !is_missing(primary.value(row, column)) {
                continue;
            }
            let Some(linked) = self.links.target(column) else {
                continue;
            };
            if !matches.iter().any(|m| m.row.has_column(linked)) {
                continue;
            }

            // First non-missing value in secondary row order wins
            let Some(chosen) = matches.iter().find(|m| !is_missing(m.row.get(linked))) else {
                continue;
            };
            let mut value = normalize_text(chosen.row.get(linked));
            let mut applied: Vec<&str> = Vec::new();
            let mut derived: Vec<(String, String)> = Vec::new();

            if self.rules.split_street_house && is_label(column, STREET_LABELS) {
                let (street, house) = split_street_house(Some(&value));
                value = street;
                applied.push(TransformRule::SplitStreetHouse.name());
                if !house.is_empty() {
                    for house_column in primary.find_columns(HOUSE_NUMBER_LABELS) {
                        if is_missing(primary.value(row, &house_column)) {
                            derived.push((house_column, house.clone()));
                        }
                    }
                }
            }

            if self.rules.normalize_phone && is_label(column, PHONE_LABELS) {
                value = normalize_phone(Some(&value));
                applied.push(TransformRule::NormalizePhone.name());
            }

            if is_missing(Some(&value)) {
                debug!(row, column = %column, "Transformed value is empty, skipping");
                continue;
            }

            let description = describe(chosen, linked, &applied);
            trace!(row, column = %column, value = %value, "Filling field");
            write(primary, &mut report, key, row, column, value, description.clone());
            report.fields_filled += 1;

            for (house_column, house) in derived {
                write(primary, &mut report, key, row, &house_column, house, description.clone());
            }
        }

        self.fill_derived(primary, row, key, &mut report);
        debug!(row, fields = report.fields_filled, "Filled row");
        report
    }

    /// Country default and state-from-postal-code, applied after linked fields.
    fn fill_derived(&self, primary: &mut Dataset, row: usize, key: &str, report: &mut FillReport) {
        if self.rules.fill_country_default && !is_missing(Some(self.country_default)) {
            if let Some(country) = primary.find_column(COUNTRY_LABELS).map(str::to_string) {
                let current = primary.value(row, &country);
                if is_missing(current) {
                    let value = fill_country_default(current, self.country_default);
                    let description = format!("default ({})", TransformRule::FillCountryDefault.name());
                    write(primary, report, key, row, &country, value, description);
                }
            }
        }

        if self.rules.infer_state_from_zip {
            let state = primary.find_column(STATE_LABELS).map(str::to_string);
            let postal = primary.find_column(POSTAL_CODE_LABELS).map(str::to_string);
            if let (Some(state), Some(postal)) = (state, postal) {
                if is_missing(primary.value(row, &state)) {
                    let zip = primary.value(row, &postal);
                    if let Some(region) = state_from_postal_code(zip, self.lookup) {
                        let description = format!(
                            "{} lookup ({})",
                            postal,
                            TransformRule::InferStateFromZip.name()
                        );
                        write(primary, report, key, row, &state, region, description);
                    } else {
                        debug!(row, "No region found for postal code");
                    }
                }
            }
        }
    }
}

fn describe(chosen: &MatchedRow<'_>, column: &str, applied: &[&str]) -> String {
    let mut description = format!("{}[{}]:{}", chosen.source, chosen.row.index(), column);
    if !applied.is_empty() {
        description.push_str(&format!(" ({})", applied.join(", ")));
    }
    description
}

fn write(
    primary: &mut Dataset,
    report: &mut FillReport,
    key: &str,
    row: usize,
    column: &str,
    value: String,
    source_description: String,
) {
    // Columns come from the dataset's own headers and the row was validated by the caller
    if primary.set(row, column, value.clone()).is_ok() {
        report.changes.push(ChangeRecord {
            key: key.to_string(),
            primary_row_index: row,
            target_column: column.to_string(),
            new_value: value,
            source_description,
        });
    }
}
