use std::path::Path;

use csv::Writer;
use strum::IntoEnumIterator;

use crate::error::Error;
use crate::field::Field;
use crate::SettingsRecord;

/// Serialize a settings record to a CSV file at the given `output_path`.
///
/// Only the fields persisted by a build with the record's capabilities are written, in the
/// order of the record layout.
pub(crate) fn write_csv<P: AsRef<Path>>(
    record: &SettingsRecord,
    output_path: P,
) -> Result<(), Error> {
    let mut wtr = Writer::from_path(output_path)?;
    write_records(&mut wtr, record)
}

/// Serialize a settings record to CSV and return the content as a `String`.
pub(crate) fn write_csv_content(record: &SettingsRecord) -> Result<String, Error> {
    let mut wtr = Writer::from_writer(Vec::new());
    write_records(&mut wtr, record)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn write_records<W: std::io::Write>(
    wtr: &mut Writer<W>,
    record: &SettingsRecord,
) -> Result<(), Error> {
    wtr.write_record(["field", "value"])?;

    for field in Field::iter().filter(|field| field.is_present(record.capabilities)) {
        let value = field.get(&record.settings);
        wtr.write_record([field.as_ref(), value.as_str()])?;
    }

    wtr.flush()?;
    Ok(())
}
