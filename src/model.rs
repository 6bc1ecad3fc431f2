use serde_json::{Map, Value};

use crate::store::StoreError;

pub mod network;
pub mod sections;

/// The whole site, section name to section payload.
pub type Document = Map<String, Value>;

/// Sections merged one level deep when reading.
pub const OBJECT_SECTIONS: [&str; 5] = ["hero", "branding", "book", "footer", "contact"];

/// Sections where a non-empty stored list replaces the snapshot's list.
pub const LIST_SECTIONS: [&str; 3] = ["testimonials", "newsArticles", "audioStories"];

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid json: {0}")]
    InvalidJson(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("revision {expected} is stale, current is {current}")]
    Conflict { expected: i64, current: i64 },

    #[error("If-Match must name a revision")]
    PreconditionFailed,

    #[error("range not satisfiable for {size} bytes")]
    RangeNotSatisfiable { size: u64 },
}

/// Combines the on-disk snapshot with the stored value.
///
/// Top-level keys from `stored` win, except that object sections keep the
/// snapshot's sub-keys the stored value does not mention, and list sections
/// fall back to the snapshot's list when the stored one is empty.
pub fn merge_effective(mut base: Document, stored: Document) -> Document {
    for (key, value) in stored {
        let previous = base.get_mut(&key).map(Value::take);
        let merged = if OBJECT_SECTIONS.contains(&key.as_str()) {
            merge_object_section(previous, value)
        } else if LIST_SECTIONS.contains(&key.as_str()) {
            merge_list_section(previous, value)
        } else {
            value
        };
        base.insert(key, merged);
    }
    base
}

fn merge_object_section(base: Option<Value>, stored: Value) -> Value {
    match (base, stored) {
        (Some(Value::Object(mut base)), Value::Object(stored)) => {
            base.extend(stored);
            Value::Object(base)
        }
        (Some(Value::Object(base)), _) => Value::Object(base),
        (_, stored) => stored,
    }
}

fn merge_list_section(base: Option<Value>, stored: Value) -> Value {
    match (base, stored) {
        (_, Value::Array(items)) if !items.is_empty() => Value::Array(items),
        (Some(base), _) => base,
        (None, stored) => stored,
    }
}

/// Write-time merge: every key in `patch` replaces the current one wholesale.
pub fn merge_patch(mut current: Document, patch: Document) -> Document {
    current.extend(patch);
    current
}
