//! Error types for metadata extraction.

use std::fmt;

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// Target type a raw metadata value failed to convert into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
    Dms,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Dms => write!(f, "DMS coordinate"),
        }
    }
}

/// Errors that can occur while turning a metadata document into a record.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// I/O error reading the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An attribute could not be read.
    #[error("XML attribute error: {0}")]
    Attribute(#[from] AttrError),

    /// The root element is not bound to any namespace.
    #[error("Root element <{root}> does not declare a namespace")]
    MissingNamespace {
        /// Local name of the root element.
        root: String,
    },

    /// A required metadata field is absent.
    #[error("Missing metadata field: {key}")]
    MissingField {
        /// Normalized field key, e.g. `entity_id`.
        key: String,
    },

    /// A required structural element or attribute is absent.
    #[error("Missing element: {path}")]
    MissingElement {
        /// Element path relative to the root, e.g. `browseLinks/browse/browseLink`.
        path: String,
    },

    /// A field value could not be converted to its declared type.
    #[error("Invalid {expected} value for field '{field}': {value:?}")]
    InvalidFormat {
        field: String,
        value: String,
        expected: ValueKind,
    },

    /// A coordinate string does not match the degree/minute/second grammar.
    #[error("Invalid DMS string: {0}")]
    InvalidDms(String),
}

impl MetadataError {
    /// `true` for errors caused by a value that could not be converted.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            MetadataError::InvalidFormat { .. } | MetadataError::InvalidDms(_)
        )
    }

    pub(crate) fn missing_element(path: impl Into<String>) -> Self {
        MetadataError::MissingElement { path: path.into() }
    }
}

/// Result type for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;
