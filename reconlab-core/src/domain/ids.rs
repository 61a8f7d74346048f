use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical transaction identifier — the ledger key.
///
/// Either carried over from a source that supplies one (the delayed API feed)
/// or synthesized as a stable BLAKE3 digest over the record's defining fields
/// (see `identity::resolve_transaction_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Synthesized ids are prefixed with `^` so they are visually distinct
    /// from source-provided ids and can never collide with them.
    pub fn synthesized(digest_input: &[u8]) -> Self {
        let hash = blake3::hash(digest_input);
        Self(format!("^{}", &hash.to_hex()[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order identifier as issued by the upstream system.
///
/// Numeric at every source that supplies one; kept numeric because order
/// clustering relies on id arithmetic (legs of one multi-leg order receive
/// distinct-but-consecutive ids upstream).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct OrderId(pub i64);

impl OrderId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
