//! The explicit record-kind discriminator.
//!
//! Every record carries its kind from the route or table it came from; the
//! kind is never inferred from which fields happen to be present.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The entity kinds stored by the vault.
///
/// The first four carry sensitive fields; notes, snippets and messages are
/// stored in plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "bank-accounts")]
    BankAccount,
    #[serde(rename = "facebook-accounts")]
    FacebookAccount,
    #[serde(rename = "servers")]
    Server,
    #[serde(rename = "credentials")]
    Credential,
    #[serde(rename = "notes")]
    Note,
    #[serde(rename = "snippets")]
    Snippet,
    #[serde(rename = "messenger")]
    Message,
}

impl RecordKind {
    /// All kinds, in route order.
    pub const ALL: [RecordKind; 7] = [
        RecordKind::BankAccount,
        RecordKind::FacebookAccount,
        RecordKind::Server,
        RecordKind::Credential,
        RecordKind::Note,
        RecordKind::Snippet,
        RecordKind::Message,
    ];

    /// URL path segment for this kind, e.g. `"bank-accounts"`.
    pub fn slug(self) -> &'static str {
        match self {
            RecordKind::BankAccount => "bank-accounts",
            RecordKind::FacebookAccount => "facebook-accounts",
            RecordKind::Server => "servers",
            RecordKind::Credential => "credentials",
            RecordKind::Note => "notes",
            RecordKind::Snippet => "snippets",
            RecordKind::Message => "messenger",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Returned when a path segment names no known kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown record kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for RecordKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|k| k.slug() == s)
            .ok_or_else(|| UnknownKind(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_round_trips_through_from_str() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.slug().parse::<RecordKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_slug_rejected() {
        let err = "passwords".parse::<RecordKind>().unwrap_err();
        assert_eq!(err, UnknownKind("passwords".into()));
        assert_eq!(err.to_string(), "unknown record kind: passwords");
    }

    #[test]
    fn chat_log_keeps_messenger_route() {
        assert_eq!("messenger".parse::<RecordKind>().unwrap(), RecordKind::Message);
    }

    #[test]
    fn serde_uses_slug() {
        let json = serde_json::to_string(&RecordKind::FacebookAccount).unwrap();
        assert_eq!(json, "\"facebook-accounts\"");
    }
}
