use chrono::{DateTime, Utc};

use crate::domain::entities::record::{format_day, Record};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content: String,
    pub rows: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write csv row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush csv buffer: {0}")]
    Flush(String),
    #[error("csv output was not utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

pub fn file_name(kind: &str, now: DateTime<Utc>) -> String {
    format!("{kind}-export-{}.csv", format_day(now))
}

/// Header row plus one row per record, in the order given.
pub fn to_csv<'a, R, I>(records: I, now: DateTime<Utc>) -> Result<ExportArtifact, ExportError>
where
    R: Record,
    I: IntoIterator<Item = &'a R>,
{
    let schema = R::schema();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(schema.export_headers)?;

    let mut rows = 0;
    for record in records {
        writer.write_record(record.export_row())?;
        rows += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.to_string()))?;

    Ok(ExportArtifact {
        file_name: file_name(schema.kind, now),
        content: String::from_utf8(bytes)?,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::query::{Priority, QueryDraft, SupportQuery};
    use crate::domain::entities::record::RecordId;

    #[test]
    fn writes_headers_and_quotes_embedded_commas() {
        let now: DateTime<Utc> = "2025-01-09T16:00:00Z".parse().expect("timestamp should parse");
        let query = SupportQuery::from_draft(
            RecordId(7),
            QueryDraft {
                customer: "Startup Hub, LLC".to_string(),
                customer_email: "help@startuphub.io".to_string(),
                subject: "Invoice \"copy\" request".to_string(),
                description: "Please resend the January invoice.".to_string(),
                priority: Priority::Low,
                ..QueryDraft::default()
            },
            now,
        );

        let artifact = to_csv([&query], now).expect("export should succeed");

        assert_eq!(artifact.file_name, "queries-export-2025-01-09.csv");
        assert_eq!(artifact.rows, 1);
        let mut lines = artifact.content.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Customer,Subject,Priority,Status,Assigned Agent,Created")
        );
        assert_eq!(
            lines.next(),
            Some("QRY-007,\"Startup Hub, LLC\",\"Invoice \"\"copy\"\" request\",low,open,unassigned,2025-01-09")
        );
    }
}
