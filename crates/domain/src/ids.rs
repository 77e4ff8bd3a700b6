//! Typed identifiers for domain documents.

use common::{DocumentId, ParseIdError};
use serde::{Deserialize, Serialize};

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(DocumentId);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(DocumentId::new())
            }

            /// Returns the underlying document identifier.
            pub fn as_document_id(&self) -> DocumentId {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<DocumentId> for $name {
            fn from(id: DocumentId) -> Self {
                Self(id)
            }
        }

        impl From<$name> for DocumentId {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

typed_id!(
    /// Identifier of a product document.
    ProductId
);

typed_id!(
    /// Identifier of an order document.
    OrderId
);

typed_id!(
    /// Identifier of a user document.
    UserId
);

typed_id!(
    /// Identifier of an inventory transaction record.
    TransactionId
);
