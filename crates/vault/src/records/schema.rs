//! The declarative field table, one [`KindSchema`] per [`RecordKind`].
//!
//! Both transcode directions, API input acceptance and the export formatter
//! read field names, protection and labels from here; nothing else in the
//! crate lists per-kind fields.

use common::RecordKind;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::crypto::envelope::is_absent;

/// How a field is protected at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Stored as given.
    Plain,
    /// The whole value is sealed as one envelope.
    Sealed,
    /// A map whose secret-looking entries are sealed one by one.
    SecretEntries,
}

/// Logical type of a field's plaintext value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// A string, exported as `Label: value`.
    Text,
    /// A JSON object of key/value pairs.
    Map,
    /// Free text exported verbatim under the rule, without a label.
    Body,
    /// A boolean. Exported as its bare label when set.
    Flag,
}

impl FieldShape {
    fn expected(self) -> &'static str {
        match self {
            FieldShape::Text | FieldShape::Body => "a string",
            FieldShape::Map => "an object",
            FieldShape::Flag => "a boolean",
        }
    }

    fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldShape::Text | FieldShape::Body, Value::String(_))
                | (FieldShape::Map, Value::Object(_))
                | (FieldShape::Flag, Value::Bool(_))
        )
    }
}

/// One declared field of a record kind.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// JSON key in API bodies and stored records.
    pub name: &'static str,
    /// Label used in text exports. Map fields print their own keys instead.
    pub label: &'static str,
    pub protection: Protection,
    pub shape: FieldShape,
    pub required: bool,
    /// Printed in the export body. Fields shown only through the heading
    /// title are not.
    pub listed: bool,
    /// Set by the vault, never taken from input.
    pub managed: bool,
    /// Stored when input leaves the field absent.
    pub default: Option<&'static str>,
}

impl FieldSpec {
    pub fn is_protected(&self) -> bool {
        self.protection != Protection::Plain
    }

    const fn hidden(mut self) -> Self {
        self.listed = false;
        self
    }

    const fn or(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
}

/// Sort applied when listing or exporting a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    /// Newest first by creation time.
    CreatedDesc,
    /// Oldest first by creation time, as a conversation reads.
    CreatedAsc,
    /// Most recently modified first.
    UpdatedDesc,
    /// Records with `flag` set first, then most recently modified.
    PinnedFirst { flag: &'static str },
}

/// Timestamp lines closing an export block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamps {
    /// `Created:` and `Last Updated:`.
    CreatedAndUpdated,
    /// `Sent:` only.
    SentOnly,
}

/// Why [`KindSchema::accept`] refused an API body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AcceptError {
    #[error("missing required field {0}")]
    Missing(&'static str),

    #[error("field {field} must be {expected}")]
    WrongShape {
        field: String,
        expected: &'static str,
    },
}

/// Everything the vault knows about one record kind.
pub struct KindSchema {
    pub kind: RecordKind,
    /// Leading words of an export block heading, e.g. `"Server Details for"`.
    pub heading: &'static str,
    /// Builds the identifying part of the heading from a plain record.
    pub title: fn(&Map<String, Value>) -> String,
    pub fields: &'static [FieldSpec],
    pub list_order: OrderBy,
    pub export_order: OrderBy,
    pub stamps: Stamps,
    /// Flag set to `true` whenever a record is updated.
    pub edit_marker: Option<&'static str>,
    /// Whether `DELETE /api/:kind` may clear the whole kind.
    pub bulk_delete: bool,
}

const fn spec(
    name: &'static str,
    label: &'static str,
    protection: Protection,
    shape: FieldShape,
    required: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        protection,
        shape,
        required,
        listed: true,
        managed: false,
        default: None,
    }
}

const fn field(
    name: &'static str,
    label: &'static str,
    protection: Protection,
    required: bool,
) -> FieldSpec {
    spec(name, label, protection, FieldShape::Text, required)
}

const fn map_field(name: &'static str, label: &'static str, protection: Protection) -> FieldSpec {
    spec(name, label, protection, FieldShape::Map, false)
}

const fn body_field(name: &'static str, required: bool) -> FieldSpec {
    spec(name, "", Protection::Plain, FieldShape::Body, required)
}

const fn flag(name: &'static str, label: &'static str) -> FieldSpec {
    spec(name, label, Protection::Plain, FieldShape::Flag, false)
}

const fn managed_flag(name: &'static str, label: &'static str) -> FieldSpec {
    let mut f = flag(name, label);
    f.managed = true;
    f
}

use Protection::{Plain, SecretEntries, Sealed};

const BANK_ACCOUNT_FIELDS: &[FieldSpec] = &[
    field("holderName", "Account Holder", Sealed, true),
    field("bankName", "Bank Name", Sealed, true),
    field("accountNumber", "Account Number", Sealed, true),
    field("ifsc", "IFSC Code", Sealed, true),
    field("swiftCode", "SWIFT Code", Sealed, false),
    field("upi", "UPI ID", Sealed, false),
    field("netBankingId", "Net Banking ID", Sealed, false),
    field("netBankingPassword", "Net Banking Password", Sealed, false),
];

const FACEBOOK_ACCOUNT_FIELDS: &[FieldSpec] = &[
    field("userId", "User ID", Sealed, true),
    field("password", "Password", Sealed, true),
    field("email", "Email", Sealed, false),
    field("emailPassword", "Email Password", Sealed, false),
    field("twoFASecret", "2FA Secret", Sealed, true),
    field("tags", "Tags", Sealed, false),
];

const SERVER_FIELDS: &[FieldSpec] = &[
    field("serverIp", "Server IP", Sealed, true),
    field("rootPassword", "Root Password", Sealed, true),
    map_field("customFields", "Custom Fields", Sealed),
];

const CREDENTIAL_FIELDS: &[FieldSpec] = &[
    field("service", "Service", Plain, true),
    field("serviceType", "Type", Plain, true),
    field("username", "Username", Plain, false),
    field("email", "Email", Plain, false),
    field("password", "Password", Sealed, true),
    map_field("customFields", "Custom Fields", SecretEntries),
];

const NOTE_FIELDS: &[FieldSpec] = &[
    field("title", "Title", Plain, true).hidden(),
    flag("isPinned", "Pinned").hidden(),
    body_field("content", false),
];

const SNIPPET_FIELDS: &[FieldSpec] = &[
    field("name", "Name", Plain, true).hidden(),
    field("language", "Language", Plain, false).hidden(),
    body_field("content", true),
];

const MESSAGE_FIELDS: &[FieldSpec] = &[
    field("sender", "From", Plain, false).hidden().or("User"),
    field("type", "Type", Plain, false).hidden().or("text"),
    body_field("content", true),
    field("mediaUrl", "Media URL", Plain, false),
    field("mediaType", "Media Type", Plain, false),
    managed_flag("isEdited", "(Edited)"),
];

fn bank_account_title(r: &Map<String, Value>) -> String {
    text_of(r, "holderName")
}

fn facebook_account_title(r: &Map<String, Value>) -> String {
    text_of(r, "userId")
}

fn server_title(r: &Map<String, Value>) -> String {
    text_of(r, "serverIp")
}

fn credential_title(r: &Map<String, Value>) -> String {
    format!("{} ({})", text_of(r, "service"), text_of(r, "serviceType"))
}

fn note_title(r: &Map<String, Value>) -> String {
    let title = text_of(r, "title");
    if is_set(r, "isPinned") {
        format!("{title}\n[Pinned Note]")
    } else {
        title
    }
}

fn snippet_title(r: &Map<String, Value>) -> String {
    format!("{}\nLanguage: {}", text_of(r, "name"), text_of(r, "language"))
}

fn message_title(r: &Map<String, Value>) -> String {
    format!("{}\nType: {}", text_of(r, "sender"), text_of(r, "type"))
}

static BANK_ACCOUNT: KindSchema = KindSchema {
    kind: RecordKind::BankAccount,
    heading: "Bank Account Details for",
    title: bank_account_title,
    fields: BANK_ACCOUNT_FIELDS,
    list_order: OrderBy::CreatedDesc,
    export_order: OrderBy::CreatedDesc,
    stamps: Stamps::CreatedAndUpdated,
    edit_marker: None,
    bulk_delete: false,
};

static FACEBOOK_ACCOUNT: KindSchema = KindSchema {
    kind: RecordKind::FacebookAccount,
    heading: "Account Details for",
    title: facebook_account_title,
    fields: FACEBOOK_ACCOUNT_FIELDS,
    list_order: OrderBy::CreatedDesc,
    export_order: OrderBy::CreatedDesc,
    stamps: Stamps::CreatedAndUpdated,
    edit_marker: None,
    bulk_delete: false,
};

static SERVER: KindSchema = KindSchema {
    kind: RecordKind::Server,
    heading: "Server Details for",
    title: server_title,
    fields: SERVER_FIELDS,
    list_order: OrderBy::CreatedDesc,
    export_order: OrderBy::UpdatedDesc,
    stamps: Stamps::CreatedAndUpdated,
    edit_marker: None,
    bulk_delete: false,
};

static CREDENTIAL: KindSchema = KindSchema {
    kind: RecordKind::Credential,
    heading: "Credential Details for",
    title: credential_title,
    fields: CREDENTIAL_FIELDS,
    list_order: OrderBy::UpdatedDesc,
    export_order: OrderBy::UpdatedDesc,
    stamps: Stamps::CreatedAndUpdated,
    edit_marker: None,
    bulk_delete: false,
};

static NOTE: KindSchema = KindSchema {
    kind: RecordKind::Note,
    heading: "Title:",
    title: note_title,
    fields: NOTE_FIELDS,
    list_order: OrderBy::PinnedFirst { flag: "isPinned" },
    export_order: OrderBy::PinnedFirst { flag: "isPinned" },
    stamps: Stamps::CreatedAndUpdated,
    edit_marker: None,
    bulk_delete: false,
};

static SNIPPET: KindSchema = KindSchema {
    kind: RecordKind::Snippet,
    heading: "Snippet:",
    title: snippet_title,
    fields: SNIPPET_FIELDS,
    list_order: OrderBy::UpdatedDesc,
    export_order: OrderBy::UpdatedDesc,
    stamps: Stamps::CreatedAndUpdated,
    edit_marker: None,
    bulk_delete: false,
};

static MESSAGE: KindSchema = KindSchema {
    kind: RecordKind::Message,
    heading: "From:",
    title: message_title,
    fields: MESSAGE_FIELDS,
    list_order: OrderBy::CreatedAsc,
    export_order: OrderBy::CreatedAsc,
    stamps: Stamps::SentOnly,
    edit_marker: Some("isEdited"),
    bulk_delete: true,
};

/// The schema for `kind`.
pub fn schema_for(kind: RecordKind) -> &'static KindSchema {
    match kind {
        RecordKind::BankAccount => &BANK_ACCOUNT,
        RecordKind::FacebookAccount => &FACEBOOK_ACCOUNT,
        RecordKind::Server => &SERVER,
        RecordKind::Credential => &CREDENTIAL,
        RecordKind::Note => &NOTE,
        RecordKind::Snippet => &SNIPPET,
        RecordKind::Message => &MESSAGE,
    }
}

impl KindSchema {
    #[cfg(test)]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields stored in sealed form, wholly or per entry.
    pub fn protected_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.is_protected())
    }

    /// Accept an API body for create or update.
    ///
    /// Keeps declared fields only, so client-supplied `id`, `createdAt`,
    /// managed flags and unknown keys are dropped. Absent fields take their
    /// default; flags default to `false`.
    ///
    /// Secret-looking entries of a [`Protection::SecretEntries`] map must be
    /// strings, since they are opened as text.
    ///
    /// # Errors
    ///
    /// [`AcceptError`] naming the first required field that is missing or
    /// empty, or the first mis-typed field or entry.
    pub fn accept(&self, mut input: Map<String, Value>) -> Result<Map<String, Value>, AcceptError> {
        let mut accepted = Map::new();
        for spec in self.fields {
            let given = input.remove(spec.name).filter(|_| !spec.managed);
            let value = match (given, spec.default, spec.shape) {
                (Some(v), _, _) if !is_absent(&v) => v,
                (_, Some(default), _) => Value::String(default.to_owned()),
                (_, None, FieldShape::Flag) => Value::Bool(false),
                (given, None, _) => {
                    if spec.required {
                        return Err(AcceptError::Missing(spec.name));
                    }
                    match given {
                        None | Some(Value::Null) => continue,
                        Some(empty) => empty,
                    }
                }
            };
            if !spec.shape.admits(&value) {
                return Err(AcceptError::WrongShape {
                    field: spec.name.to_owned(),
                    expected: spec.shape.expected(),
                });
            }
            if let (Protection::SecretEntries, Value::Object(entries)) = (spec.protection, &value) {
                check_secret_entries(spec.name, entries)?;
            }
            accepted.insert(spec.name.to_owned(), value);
        }
        Ok(accepted)
    }

    /// Set the kind's edit marker, if it has one, on fields about to be
    /// written by an update.
    pub fn mark_edited(&self, fields: &mut Map<String, Value>) {
        if let Some(marker) = self.edit_marker {
            fields.insert(marker.to_owned(), Value::Bool(true));
        }
    }
}

fn check_secret_entries(field: &str, entries: &Map<String, Value>) -> Result<(), AcceptError> {
    let bad = entries
        .iter()
        .find(|(key, value)| is_secret_like(key) && !matches!(value, Value::String(_) | Value::Null));
    match bad {
        Some((key, _)) => Err(AcceptError::WrongShape {
            field: format!("{field}.{key}"),
            expected: "a string",
        }),
        None => Ok(()),
    }
}

/// Whether a custom-field key names something secret, e.g. `"API Key"`,
/// `"db_password"` or `"recoveryToken"`.
pub fn is_secret_like(key: &str) -> bool {
    const MARKERS: [&str; 7] = [
        "password",
        "passwd",
        "passphrase",
        "secret",
        "token",
        "apikey",
        "privatekey",
    ];
    let normalized: String = key
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    MARKERS.iter().any(|m| normalized.contains(m))
}

/// Whether a flag field is `true`. Missing or non-boolean reads as unset.
pub fn is_set(record: &Map<String, Value>, name: &str) -> bool {
    record.get(name).and_then(Value::as_bool).unwrap_or(false)
}

/// Display text of a field: strings as-is, other values as JSON, absent as "".
pub fn text_of(record: &Map<String, Value>, name: &str) -> String {
    match record.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
