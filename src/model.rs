use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::dms::DmsCoordinate;
use crate::error::{MetadataError, Result, ValueKind};

/// Browse image links attached to a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseLinks {
    pub browse_link: String,
    pub thumbnail_link: String,
}

/// Raw contents of a metadata document before any type conversion.
///
/// Field names are normalized: spaces become underscores and the result is
/// lowercased, so `"WRS Path"` is stored under `wrs_path`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDocument {
    pub namespace: String,
    pub fields: HashMap<String, String>,
    pub browse: BrowseLinks,
}

impl MetadataDocument {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Looks up a field that must be present.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| MetadataError::MissingField {
            key: key.to_string(),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn string(&self, key: &str) -> Result<String> {
        self.require(key).map(str::to_string)
    }

    fn integer<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.require(key)?;
        raw.trim().parse().map_err(|_| invalid(key, raw, ValueKind::Integer))
    }

    fn float(&self, key: &str) -> Result<f64> {
        let raw = self.require(key)?;
        raw.trim().parse().map_err(|_| invalid(key, raw, ValueKind::Float))
    }

    fn coordinate(&self, key: &str) -> Result<DmsCoordinate> {
        let raw = self.require(key)?;
        DmsCoordinate::parse(raw).map_err(|_| invalid(key, raw, ValueKind::Dms))
    }

    fn point(&self, lat_key: &str, lon_key: &str) -> Result<GeoPoint> {
        Ok(GeoPoint {
            latitude: self.coordinate(lat_key)?,
            longitude: self.coordinate(lon_key)?,
        })
    }
}

fn invalid(field: &str, value: &str, expected: ValueKind) -> MetadataError {
    MetadataError::InvalidFormat {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// A latitude/longitude pair in DMS and decimal degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub latitude: DmsCoordinate,
    pub longitude: DmsCoordinate,
}

/// One of the five reference points of a scene footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenePoint {
    Center,
    NorthWest,
    NorthEast,
    SouthEast,
    SouthWest,
}

impl ScenePoint {
    pub const ALL: [ScenePoint; 5] = [
        ScenePoint::Center,
        ScenePoint::NorthWest,
        ScenePoint::NorthEast,
        ScenePoint::SouthEast,
        ScenePoint::SouthWest,
    ];
}

/// Typed metadata for a single satellite scene.
///
/// Built from a metadata document and never modified afterwards; all access
/// goes through the getters.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteImageRecord {
    entity_id: String,
    acquisition_date: String,
    wrs_path: i32,
    wrs_row: i32,
    wrs_type: String,
    time_series: String,
    datum: String,
    zone_number: i32,
    file_size: i64,
    orientation: String,
    product_type: String,
    resampling_technique: String,
    satellite_number: String,
    sun_azimuth: f64,
    sun_elevation: f64,
    center: GeoPoint,
    nw_corner: GeoPoint,
    ne_corner: GeoPoint,
    se_corner: GeoPoint,
    sw_corner: GeoPoint,
    browse_link: String,
    browse_thumbnail_link: String,
}

impl TryFrom<MetadataDocument> for SatelliteImageRecord {
    type Error = MetadataError;

    fn try_from(doc: MetadataDocument) -> Result<Self> {
        Self::from_document(&doc)
    }
}

impl FromStr for SatelliteImageRecord {
    type Err = MetadataError;

    fn from_str(xml: &str) -> Result<Self> {
        crate::parser::parse_metadata_str(xml)
    }
}

impl SatelliteImageRecord {
    /// Reads and parses a metadata XML file.
    pub fn from_xml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::parser::parse_metadata_file(path)
    }

    /// Assembles a record from extracted fields, converting each one to its
    /// declared type.
    pub fn from_document(doc: &MetadataDocument) -> Result<Self> {
        Ok(Self {
            entity_id: doc.string("entity_id")?,
            acquisition_date: doc.string("acquisition_date")?,
            wrs_path: doc.integer("wrs_path")?,
            wrs_row: doc.integer("wrs_row")?,
            wrs_type: doc.string("wrs_type")?,
            time_series: doc.string("time_series")?,
            datum: doc.string("datum")?,
            zone_number: doc.integer("zone_number")?,
            file_size: doc.integer("file_size")?,
            orientation: doc.string("orientation")?,
            product_type: doc.string("product_type")?,
            resampling_technique: doc.string("resampling_technique")?,
            satellite_number: doc.string("satellite_number")?,
            sun_azimuth: doc.float("sun_azimuth")?,
            sun_elevation: doc.float("sun_elevation")?,
            center: doc.point("center_latitude", "center_longitude")?,
            nw_corner: doc.point("nw_corner_lat", "nw_corner_long")?,
            ne_corner: doc.point("ne_corner_lat", "ne_corner_long")?,
            se_corner: doc.point("se_corner_lat", "se_corner_long")?,
            sw_corner: doc.point("sw_corner_lat", "sw_corner_long")?,
            browse_link: doc.browse.browse_link.clone(),
            browse_thumbnail_link: doc.browse.thumbnail_link.clone(),
        })
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn acquisition_date(&self) -> &str {
        &self.acquisition_date
    }

    pub fn wrs_path(&self) -> i32 {
        self.wrs_path
    }

    pub fn wrs_row(&self) -> i32 {
        self.wrs_row
    }

    pub fn wrs_type(&self) -> &str {
        &self.wrs_type
    }

    pub fn time_series(&self) -> &str {
        &self.time_series
    }

    pub fn datum(&self) -> &str {
        &self.datum
    }

    /// UTM zone number.
    pub fn zone_number(&self) -> i32 {
        self.zone_number
    }

    /// Product size in bytes.
    pub fn file_size(&self) -> i64 {
        self.file_size
    }

    pub fn orientation(&self) -> &str {
        &self.orientation
    }

    pub fn product_type(&self) -> &str {
        &self.product_type
    }

    pub fn resampling_technique(&self) -> &str {
        &self.resampling_technique
    }

    pub fn satellite_number(&self) -> &str {
        &self.satellite_number
    }

    /// Sun azimuth in degrees.
    pub fn sun_azimuth(&self) -> f64 {
        self.sun_azimuth
    }

    /// Sun elevation in degrees.
    pub fn sun_elevation(&self) -> f64 {
        self.sun_elevation
    }

    pub fn point(&self, which: ScenePoint) -> &GeoPoint {
        match which {
            ScenePoint::Center => &self.center,
            ScenePoint::NorthWest => &self.nw_corner,
            ScenePoint::NorthEast => &self.ne_corner,
            ScenePoint::SouthEast => &self.se_corner,
            ScenePoint::SouthWest => &self.sw_corner,
        }
    }

    pub fn center(&self) -> &GeoPoint {
        &self.center
    }

    pub fn nw_corner(&self) -> &GeoPoint {
        &self.nw_corner
    }

    pub fn ne_corner(&self) -> &GeoPoint {
        &self.ne_corner
    }

    pub fn se_corner(&self) -> &GeoPoint {
        &self.se_corner
    }

    pub fn sw_corner(&self) -> &GeoPoint {
        &self.sw_corner
    }

    // Flat accessors, one per schema field.

    pub fn center_latitude(&self) -> &str {
        self.center.latitude.raw()
    }

    pub fn center_longitude(&self) -> &str {
        self.center.longitude.raw()
    }

    pub fn nw_corner_lat(&self) -> &str {
        self.nw_corner.latitude.raw()
    }

    pub fn nw_corner_long(&self) -> &str {
        self.nw_corner.longitude.raw()
    }

    pub fn ne_corner_lat(&self) -> &str {
        self.ne_corner.latitude.raw()
    }

    pub fn ne_corner_long(&self) -> &str {
        self.ne_corner.longitude.raw()
    }

    pub fn se_corner_lat(&self) -> &str {
        self.se_corner.latitude.raw()
    }

    pub fn se_corner_long(&self) -> &str {
        self.se_corner.longitude.raw()
    }

    pub fn sw_corner_lat(&self) -> &str {
        self.sw_corner.latitude.raw()
    }

    pub fn sw_corner_long(&self) -> &str {
        self.sw_corner.longitude.raw()
    }

    pub fn center_latitude_dec(&self) -> f64 {
        self.center.latitude.decimal()
    }

    pub fn center_longitude_dec(&self) -> f64 {
        self.center.longitude.decimal()
    }

    pub fn nw_corner_lat_dec(&self) -> f64 {
        self.nw_corner.latitude.decimal()
    }

    pub fn nw_corner_long_dec(&self) -> f64 {
        self.nw_corner.longitude.decimal()
    }

    pub fn ne_corner_lat_dec(&self) -> f64 {
        self.ne_corner.latitude.decimal()
    }

    pub fn ne_corner_long_dec(&self) -> f64 {
        self.ne_corner.longitude.decimal()
    }

    pub fn se_corner_lat_dec(&self) -> f64 {
        self.se_corner.latitude.decimal()
    }

    pub fn se_corner_long_dec(&self) -> f64 {
        self.se_corner.longitude.decimal()
    }

    pub fn sw_corner_lat_dec(&self) -> f64 {
        self.sw_corner.latitude.decimal()
    }

    pub fn sw_corner_long_dec(&self) -> f64 {
        self.sw_corner.longitude.decimal()
    }

    pub fn browse_link(&self) -> &str {
        &self.browse_link
    }

    pub fn browse_thumbnail_link(&self) -> &str {
        &self.browse_thumbnail_link
    }
}
