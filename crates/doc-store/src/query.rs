use chrono::{DateTime, Utc};

/// Sort direction on the document creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    CreatedAsc,
    /// Newest first.
    CreatedDesc,
}

/// Builder for constructing document queries.
///
/// Filters match top-level body fields by equality and the creation time by
/// an inclusive range.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Collection to search.
    pub collection: String,

    /// Top-level field equality filters (all must match).
    pub filters: Vec<(String, serde_json::Value)>,

    /// Filter by documents created at or after this timestamp.
    pub created_from: Option<DateTime<Utc>>,

    /// Filter by documents created at or before this timestamp.
    pub created_to: Option<DateTime<Utc>>,

    /// Result ordering.
    pub sort: SortOrder,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,

    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query over a whole collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Requires a top-level body field to equal `value`.
    pub fn field_eq(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }

    /// Filters to documents created at or after this timestamp.
    pub fn created_from(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_from = Some(timestamp);
        self
    }

    /// Filters to documents created at or before this timestamp.
    pub fn created_to(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_to = Some(timestamp);
        self
    }

    /// Sets the result ordering.
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Limits the number of documents returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many documents before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns the equality filters merged into one JSON object.
    ///
    /// Used as a containment predicate by the PostgreSQL backend.
    pub fn filter_object(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .filters
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Returns true if the given body and creation time satisfy the filters.
    pub fn matches(&self, body: &serde_json::Value, created_at: DateTime<Utc>) -> bool {
        if let Some(from) = self.created_from
            && created_at < from
        {
            return false;
        }
        if let Some(to) = self.created_to
            && created_at > to
        {
            return false;
        }
        self.filters
            .iter()
            .all(|(field, value)| body.get(field) == Some(value))
    }
}
