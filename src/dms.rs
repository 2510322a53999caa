//! Degree-minute-second coordinate strings.
//!
//! Scene corners are published as text such as `13&deg;05'46.48"N`. The
//! degree token is the literal `&deg;` left behind once the XML escape
//! `&amp;deg;` is resolved; a plain `°` is accepted as the same token.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{MetadataError, Result};

/// `<degrees><deg>[ws]<minutes>'[ws]<seconds.fraction>"`, anchored at the start.
static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(-?[0-9]+)(?:&deg;|°)\s*([0-9]+)'\s*([0-9]+\.[0-9]+)""#)
        .expect("DMS pattern is valid")
});

/// Converts a DMS string into signed decimal degrees.
///
/// The magnitude is `D + M/60 + S/3600`. It stays positive only when the
/// string ends with `N` or `E`; every other ending, including `S`, `W`, an
/// unknown letter or no letter at all, negates it.
///
/// ```
/// let lat = ee_metadata::convert_dms("45°30'15.500\"N").unwrap();
/// assert!((lat - 45.504305555).abs() < 1e-6);
/// ```
pub fn convert_dms(dms: &str) -> Result<f64> {
    let caps = DMS_PATTERN
        .captures(dms)
        .ok_or_else(|| MetadataError::InvalidDms(dms.to_string()))?;

    let invalid = || MetadataError::InvalidDms(dms.to_string());
    let degrees: i64 = caps[1].parse().map_err(|_| invalid())?;
    let minutes: i64 = caps[2].parse().map_err(|_| invalid())?;
    let seconds: f64 = caps[3].parse().map_err(|_| invalid())?;

    let decimal = degrees as f64 + minutes as f64 / 60.0 + seconds / 3600.0;

    if dms.ends_with('N') || dms.ends_with('E') {
        Ok(decimal)
    } else {
        Ok(-decimal)
    }
}

/// A raw DMS string paired with its decimal-degree value.
///
/// Only [`DmsCoordinate::parse`] builds one, so the two always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct DmsCoordinate {
    raw: String,
    decimal: f64,
}

impl DmsCoordinate {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let decimal = convert_dms(&raw)?;
        Ok(Self { raw, decimal })
    }

    /// The string as it appeared in the document.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Signed decimal degrees.
    pub fn decimal(&self) -> f64 {
        self.decimal
    }
}
