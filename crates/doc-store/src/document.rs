use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::DocumentId;

/// Version number of a stored document, used for compare-and-set updates.
///
/// A freshly inserted document is at version 1 and every successful
/// replace increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a document that does not exist yet (0).
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version assigned on insert (1).
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A stored document with its bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The collection the document lives in (e.g. "products").
    pub collection: String,

    /// Unique identifier within the collection.
    pub id: DocumentId,

    /// Optional secondary key, unique within the collection (SKU, order number).
    pub key: Option<String>,

    /// Current version for compare-and-set.
    pub version: Version,

    /// When the document was inserted.
    pub created_at: DateTime<Utc>,

    /// When the document was last replaced.
    pub updated_at: DateTime<Utc>,

    /// The document body as JSON.
    pub body: serde_json::Value,
}

impl Document {
    /// Deserializes the body into a concrete type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }

    /// Consumes the document and deserializes the body.
    pub fn into_decoded<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body)
    }
}

/// A document to be inserted.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub collection: String,
    pub id: DocumentId,
    pub key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub body: serde_json::Value,
}

impl NewDocument {
    /// Creates a new document from a raw JSON body.
    pub fn new(
        collection: impl Into<String>,
        id: DocumentId,
        created_at: DateTime<Utc>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            collection: collection.into(),
            id,
            key: None,
            created_at,
            body,
        }
    }

    /// Creates a new document from a serializable value.
    pub fn from_value<T: Serialize>(
        collection: impl Into<String>,
        id: DocumentId,
        created_at: DateTime<Utc>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            collection,
            id,
            created_at,
            serde_json::to_value(value)?,
        ))
    }

    /// Sets the unique secondary key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// A compare-and-set replacement of a document body.
#[derive(Debug, Clone)]
pub struct DocumentUpdate {
    pub collection: String,
    pub id: DocumentId,
    /// The version the caller read; the write only lands if it is still current.
    pub expected_version: Version,
    pub updated_at: DateTime<Utc>,
    pub body: serde_json::Value,
}

impl DocumentUpdate {
    /// Builds an update replacing `current` with a new serialized value.
    pub fn replacing<T: Serialize>(
        current: &Document,
        updated_at: DateTime<Utc>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            collection: current.collection.clone(),
            id: current.id,
            expected_version: current.version,
            updated_at,
            body: serde_json::to_value(value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn version_ordering() {
        let v1 = Version::new(1);
        let v2 = Version::new(2);
        assert!(v1 < v2);
        assert_eq!(v1.next(), v2);
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn new_document_from_value_and_decode() {
        let widget = Widget {
            name: "gear".to_string(),
            count: 3,
        };
        let now = Utc::now();
        let new_doc = NewDocument::from_value("widgets", DocumentId::new(), now, &widget)
            .unwrap()
            .with_key("W-1");
        assert_eq!(new_doc.key.as_deref(), Some("W-1"));

        let doc = Document {
            collection: new_doc.collection,
            id: new_doc.id,
            key: new_doc.key,
            version: Version::first(),
            created_at: now,
            updated_at: now,
            body: new_doc.body,
        };
        let decoded: Widget = doc.decode().unwrap();
        assert_eq!(decoded, widget);
    }

    #[test]
    fn update_carries_read_version() {
        let now = Utc::now();
        let doc = Document {
            collection: "widgets".to_string(),
            id: DocumentId::new(),
            key: None,
            version: Version::new(7),
            created_at: now,
            updated_at: now,
            body: serde_json::json!({}),
        };
        let update = DocumentUpdate::replacing(&doc, now, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(update.expected_version, Version::new(7));
        assert_eq!(update.id, doc.id);
        assert_eq!(update.collection, "widgets");
    }
}
