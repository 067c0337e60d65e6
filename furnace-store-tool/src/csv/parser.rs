use furnace_store::{Capabilities, Settings};

use crate::error::Error;
use crate::field::Field;
use crate::SettingsRecord;

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    field: String,
    value: String,
}

/// Parse settings CSV content into a [`SettingsRecord`] for a build with `capabilities`.
///
/// Fields without a row keep their default value. Rows for fields of subsystems missing from
/// `capabilities` are rejected, a device of that build would never persist them.
pub(crate) fn parse_csv(content: &str, capabilities: Capabilities) -> Result<SettingsRecord, Error> {
    let mut settings = Settings::default();
    let mut seen: Vec<Field> = vec![];
    let mut reader = csv::Reader::from_reader(content.as_bytes());

    for result in reader.deserialize() {
        let row: CsvRow = result?;

        let field: Field = row
            .field
            .trim()
            .parse()
            .map_err(|_| Error::UnknownField(row.field.clone()))?;

        if seen.contains(&field) {
            return Err(Error::DuplicateField(field));
        }
        if !field.is_present(capabilities) {
            return Err(Error::FieldNotInBuild(field));
        }

        field.set(&mut settings, &row.value)?;
        seen.push(field);
    }

    Ok(SettingsRecord {
        capabilities,
        settings,
    })
}
