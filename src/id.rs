//! Prefixed ID generation for subsync entities.
//!
//! Internal account ids carry an `ss_` brand prefix to guarantee collision
//! avoidance with Stripe's own identifiers (`cus_`, `sub_`, `cs_`, etc.).
//!
//! Format: `ss_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

/// All known entity prefixes for validation.
const ALL_PREFIXES: &[&str] = &["ss_acct_"];

/// Validate that a string is a valid subsync prefixed ID.
///
/// Cheap check to reject garbage before hitting the database.
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];
    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Entity types that have prefixed IDs in subsync.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Account,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Account => "ss_acct",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}
