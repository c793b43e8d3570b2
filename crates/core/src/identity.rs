//! Mapping from source records to destination identities.

use crate::models::identity::CanonicalIdentity;
use crate::models::source::SourceRecord;

/// Compute the destination identity for a source record.
///
/// Algorithm: `first.last@domain` when both names are present, otherwise
/// `username@domain`. The principal name is lowercased; the mail nickname is
/// its local part. The display name keeps the source casing.
pub fn map_identity(record: &SourceRecord, domain: &str) -> CanonicalIdentity {
    let domain = domain.to_lowercase();

    let (local_part, display_name) = match (
        record.first_name.as_deref().map(str::trim),
        record.last_name.as_deref().map(str::trim),
    ) {
        (Some(given), Some(surname)) if !given.is_empty() && !surname.is_empty() => (
            format!("{}.{}", given.to_lowercase(), surname.to_lowercase()),
            format!("{given} {surname}"),
        ),
        _ => (
            record.username.trim().to_lowercase(),
            record.username.trim().to_string(),
        ),
    };

    CanonicalIdentity {
        principal_name: format!("{local_part}@{domain}"),
        display_name,
        mail_nickname: local_part,
    }
}
