pub mod dms;
pub mod error;
pub mod model;
pub mod parser;

pub use dms::{convert_dms, DmsCoordinate};
pub use error::{MetadataError, Result, ValueKind};
pub use model::{BrowseLinks, GeoPoint, MetadataDocument, SatelliteImageRecord, ScenePoint};
pub use parser::{extract_metadata, parse_metadata_file, parse_metadata_str, parse_metadata_xml};
