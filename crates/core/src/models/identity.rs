use serde::{Deserialize, Serialize};

/// Destination identity derived from a source record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CanonicalIdentity {
    pub principal_name: String,
    pub display_name: String,
    pub mail_nickname: String,
}
