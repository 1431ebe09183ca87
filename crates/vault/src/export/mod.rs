//! Export formatter: renders plain records as text blocks or a JSON array.
//!
//! Only [`PlainRecord`] is accepted, so sealed values cannot reach an export.
//! Field order and labels come from the kind's schema.

use chrono::{DateTime, Utc};
use common::{protocol::ExportFormat, RecordKind};
use serde_json::Value;

use crate::crypto::envelope::is_absent;
use crate::records::schema::{is_set, schema_for, text_of, FieldShape, Stamps};
use crate::records::PlainRecord;

const RULE: &str = "----------------------------------------";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Render `records` in `format`.
///
/// # Errors
///
/// Only the JSON format can fail, if a value does not serialize.
pub fn render(records: &[PlainRecord], format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Text => Ok(render_text(records)),
        ExportFormat::Json => render_json(records),
    }
}

/// One block per record, separated by a blank line.
pub fn render_text(records: &[PlainRecord]) -> String {
    records
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A pretty-printed array of the records' field maps.
pub fn render_json(records: &[PlainRecord]) -> serde_json::Result<String> {
    let fields: Vec<_> = records.iter().map(PlainRecord::fields).collect();
    serde_json::to_string_pretty(&fields)
}

fn render_block(record: &PlainRecord) -> String {
    let schema = schema_for(record.kind());
    let fields = record.fields();
    let mut lines = vec![
        format!("{} {}", schema.heading, (schema.title)(fields)),
        RULE.to_owned(),
    ];

    for spec in schema.fields.iter().filter(|f| f.listed) {
        match spec.shape {
            FieldShape::Text => {
                let absent = record.get(spec.name).map_or(true, is_absent);
                if absent && !spec.required {
                    continue;
                }
                lines.push(format!("{}: {}", spec.label, text_of(fields, spec.name)));
            }
            FieldShape::Map => {
                if let Some(Value::Object(entries)) = record.get(spec.name) {
                    for (key, value) in entries {
                        let value = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        lines.push(format!("{key}: {value}"));
                    }
                }
            }
            FieldShape::Body => {
                let body = text_of(fields, spec.name);
                if !body.is_empty() {
                    lines.push(body);
                }
            }
            // Flags close the block.
            FieldShape::Flag => {}
        }
    }

    let stamp = |name: &str| record.get(name).and_then(Value::as_str).map(display_timestamp);
    match schema.stamps {
        Stamps::CreatedAndUpdated => {
            if let Some(created) = stamp("createdAt") {
                lines.push(format!("Created: {created}"));
            }
            if let Some(updated) = stamp("updatedAt") {
                lines.push(format!("Last Updated: {updated}"));
            }
        }
        Stamps::SentOnly => {
            if let Some(sent) = stamp("createdAt") {
                lines.push(format!("Sent: {sent}"));
            }
        }
    }

    for spec in schema.fields.iter().filter(|f| f.listed && f.shape == FieldShape::Flag) {
        if is_set(fields, spec.name) {
            lines.push(spec.label.to_owned());
        }
    }
    lines.join("\n")
}

/// RFC 3339 timestamps are shown in UTC; anything else is printed as stored.
fn display_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string(),
        Err(_) => raw.to_owned(),
    }
}

/// Attachment name for a full export, e.g. `servers-2024-03-01T10-00-00Z.txt`.
pub fn export_filename(kind: RecordKind, format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "{}-{}.{}",
        kind.slug(),
        now.format("%Y-%m-%dT%H-%M-%SZ"),
        format.extension()
    )
}

/// Attachment name for one record, e.g. `credentials-github-dev.txt`.
///
/// Only the first line of a multi-line title is used.
pub fn record_filename(record: &PlainRecord, format: ExportFormat) -> String {
    let title = (schema_for(record.kind()).title)(record.fields());
    format!(
        "{}-{}.{}",
        record.kind().slug(),
        sanitize(title.lines().next().unwrap_or_default()),
        format.extension()
    )
}

/// Lowercase, with each run of other characters collapsed to `-`.
fn sanitize(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "record".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Map};

    fn plain(kind: RecordKind, v: Value) -> PlainRecord {
        match v {
            Value::Object(m) => PlainRecord::from_input(kind, m),
            _ => panic!("expected object"),
        }
    }

    fn bank() -> PlainRecord {
        plain(
            RecordKind::BankAccount,
            json!({
                "id": "a1",
                "holderName": "Asha Rao",
                "bankName": "HDFC Bank",
                "accountNumber": "50100123456789",
                "ifsc": "HDFC0001234",
                "upi": "asha@hdfcbank",
                "createdAt": "2024-03-01T10:00:00.000Z",
                "updatedAt": "2024-03-02T16:30:05+05:30"
            }),
        )
    }

    #[test]
    fn bank_account_text_block() {
        let text = render_text(&[bank()]);
        assert_eq!(
            text,
            "Bank Account Details for Asha Rao\n\
             ----------------------------------------\n\
             Account Holder: Asha Rao\n\
             Bank Name: HDFC Bank\n\
             Account Number: 50100123456789\n\
             IFSC Code: HDFC0001234\n\
             UPI ID: asha@hdfcbank\n\
             Created: 2024-03-01 10:00:00 UTC\n\
             Last Updated: 2024-03-02 11:00:05 UTC"
        );
    }

    #[test]
    fn required_fields_print_even_when_empty() {
        let record = plain(
            RecordKind::FacebookAccount,
            json!({"userId": "jane.doe", "twoFASecret": "JBSWY3DP"}),
        );
        let text = render_text(&[record]);
        assert!(text.contains("\nPassword: \n"));
        assert!(!text.contains("Email"));
        assert!(!text.contains("Created"));
    }

    #[test]
    fn map_entries_print_as_own_lines() {
        let record = plain(
            RecordKind::Server,
            json!({
                "serverIp": "10.0.0.7",
                "rootPassword": "toor",
                "customFields": {"dataCenter": "us-east", "cores": 8}
            }),
        );
        let text = render_text(&[record]);
        assert!(text.starts_with("Server Details for 10.0.0.7\n"));
        assert!(text.contains("\ndataCenter: us-east"));
        assert!(text.contains("\ncores: 8"));
        assert!(!text.contains("Custom Fields"));
    }

    #[test]
    fn blocks_separated_by_blank_line() {
        let text = render_text(&[bank(), bank()]);
        assert_eq!(text.matches("\n\nBank Account Details for").count(), 1);
    }

    #[test]
    fn unparseable_timestamp_printed_raw() {
        let record = plain(
            RecordKind::Server,
            json!({"serverIp": "h", "rootPassword": "p", "createdAt": "yesterday"}),
        );
        assert!(render_text(&[record]).ends_with("Created: yesterday"));
    }

    #[test]
    fn json_export_is_array_of_fields() {
        let out = render(&[bank()], ExportFormat::Json).unwrap();
        let parsed: Vec<Map<String, Value>> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["accountNumber"], json!("50100123456789"));
        assert!(out.contains('\n'));
    }

    #[test]
    fn empty_export() {
        assert_eq!(render(&[], ExportFormat::Text).unwrap(), "");
        assert_eq!(render(&[], ExportFormat::Json).unwrap(), "[]");
    }

    #[test]
    fn filenames() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(
            export_filename(RecordKind::Server, ExportFormat::Text, now),
            "servers-2024-03-01T10-00-00Z.txt"
        );

        let cred = plain(
            RecordKind::Credential,
            json!({"service": "GitHub Enterprise", "serviceType": "dev/ops"}),
        );
        assert_eq!(
            record_filename(&cred, ExportFormat::Json),
            "credentials-github-enterprise-dev-ops.json"
        );
    }

    #[test]
    fn pinned_note_block() {
        let record = plain(
            RecordKind::Note,
            json!({
                "title": "Wifi",
                "isPinned": true,
                "content": "ssid: home\npass: hunter2",
                "createdAt": "2024-03-01T10:00:00.000Z",
                "updatedAt": "2024-03-01T10:00:00.000Z"
            }),
        );
        assert_eq!(
            render_text(&[record]),
            "Title: Wifi\n\
             [Pinned Note]\n\
             ----------------------------------------\n\
             ssid: home\n\
             pass: hunter2\n\
             Created: 2024-03-01 10:00:00 UTC\n\
             Last Updated: 2024-03-01 10:00:00 UTC"
        );
    }

    #[test]
    fn snippet_block_names_language() {
        let record = plain(
            RecordKind::Snippet,
            json!({"name": "retry", "language": "rust", "content": "loop {}"}),
        );
        assert_eq!(
            render_text(&[record]),
            "Snippet: retry\nLanguage: rust\n----------------------------------------\nloop {}"
        );
    }

    #[test]
    fn edited_message_block() {
        let record = plain(
            RecordKind::Message,
            json!({
                "sender": "User",
                "type": "media",
                "content": "/uploads/cat.png",
                "mediaUrl": "/uploads/cat.png",
                "mediaType": "image",
                "isEdited": true,
                "createdAt": "2024-03-01T10:00:00.000Z",
                "updatedAt": "2024-03-02T10:00:00.000Z"
            }),
        );
        assert_eq!(
            render_text(&[record]),
            "From: User\n\
             Type: media\n\
             ----------------------------------------\n\
             /uploads/cat.png\n\
             Media URL: /uploads/cat.png\n\
             Media Type: image\n\
             Sent: 2024-03-01 10:00:00 UTC\n\
             (Edited)"
        );
    }

    #[test]
    fn multi_line_title_uses_first_line_for_filename() {
        let record = plain(RecordKind::Snippet, json!({"name": "Retry Loop", "language": "rust"}));
        assert_eq!(record_filename(&record, ExportFormat::Text), "snippets-retry-loop.txt");
    }

    #[test]
    fn sanitize_never_empty() {
        assert_eq!(sanitize("***"), "record");
        assert_eq!(sanitize("10.0.0.7"), "10-0-0-7");
    }
}
