//! CSV input: one website per row, `name` required, `url` optional.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use logosync_shared::{LogoSyncError, Result, WebsiteRecord};

#[derive(Debug, Deserialize)]
struct InputRow {
    name: String,
    #[serde(default)]
    url: String,
}

/// Read website records from a CSV file with a header row.
pub fn read_records(path: &Path) -> Result<Vec<WebsiteRecord>> {
    let file = std::fs::File::open(path).map_err(|e| LogoSyncError::io(path, e))?;
    let records = read_records_from(file)?;
    info!(path = %path.display(), count = records.len(), "loaded input");
    Ok(records)
}

/// Read website records from any CSV source. Rows with a blank name are skipped.
pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<WebsiteRecord>> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (line, row) in csv.deserialize::<InputRow>().enumerate() {
        let row = row.map_err(|e| LogoSyncError::parse(format!("input row {}: {e}", line + 1)))?;
        if row.name.is_empty() {
            warn!(row = line + 1, "skipping input row without a name");
            continue;
        }
        records.push(WebsiteRecord::new(row.name, row.url));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logosync_shared::LogoReference;

    #[test]
    fn reads_name_and_url() {
        let csv = "name,url\nAcme,acme.test\nFoo & Bar Co.,https://foobar.test\n";
        let records = read_records_from(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Acme");
        assert_eq!(records[0].url, "acme.test");
        assert_eq!(records[1].logo, LogoReference::Absent);
    }

    #[test]
    fn url_column_is_optional() {
        let records = read_records_from("name\nSolo\n".as_bytes()).unwrap();
        assert_eq!(records, vec![WebsiteRecord::new("Solo", "")]);
    }

    #[test]
    fn extra_columns_and_blank_names() {
        let csv = "name,url,notes\n , https://x.test,ignored\nReal, https://real.test ,x\n";
        let records = read_records_from(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://real.test");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_records(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LogoSyncError::Io { .. }));
    }
}
