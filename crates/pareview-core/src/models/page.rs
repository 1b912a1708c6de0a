use serde::{Deserialize, Serialize};

/// A list endpoint's body: either a bare array or the paginated envelope
/// `{count, next, previous, results}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Paginated {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
    Plain(Vec<T>),
}

impl<T> ListPayload<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Paginated { results, .. } => results,
            ListPayload::Plain(items) => items,
        }
    }

    /// Whether the server has more pages after this one.
    pub fn has_more(&self) -> bool {
        matches!(self, ListPayload::Paginated { next: Some(_), .. })
    }
}
