use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use tracing::{debug, info, warn};

use crate::error::{MetadataError, Result};
use crate::model::{BrowseLinks, MetadataDocument, SatelliteImageRecord};

/// Parses a metadata document into a record.
pub fn parse_metadata_xml<R: BufRead>(reader: R) -> Result<SatelliteImageRecord> {
    let document = extract_metadata(reader)?;
    let record = SatelliteImageRecord::try_from(document)?;

    info!(
        "Parsed scene {} (path {}, row {})",
        record.entity_id(),
        record.wrs_path(),
        record.wrs_row()
    );

    Ok(record)
}

/// Opens `path` and parses it with [`parse_metadata_xml`].
pub fn parse_metadata_file<P: AsRef<Path>>(path: P) -> Result<SatelliteImageRecord> {
    let path = path.as_ref();
    debug!("Reading metadata file: {:?}", path);

    let file = File::open(path)?;
    parse_metadata_xml(BufReader::new(file))
}

pub fn parse_metadata_str(xml: &str) -> Result<SatelliteImageRecord> {
    parse_metadata_xml(xml.as_bytes())
}

/// Turns a vendor field name into its lookup key: spaces become underscores,
/// then everything is lowercased.
pub fn normalize_field_name(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

/// Reads the raw `metadataFields` and `browseLinks` content of a document.
///
/// Every element is matched by local name inside the namespace of the root
/// element. Values are kept as the unescaped text of each `metadataValue`.
pub fn extract_metadata<R: BufRead>(reader: R) -> Result<MetadataDocument> {
    let mut reader = NsReader::from_reader(reader);
    let mut buf = Vec::new();
    let mut state = ExtractState::default();

    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (ns, Event::Start(e)) => {
                let scope = state.open(&ns, &e)?;
                state.stack.push(scope);
            }
            (ns, Event::Empty(e)) => {
                let scope = state.open(&ns, &e)?;
                state.close(scope)?;
            }
            (_, Event::End(_)) => {
                if let Some(scope) = state.stack.pop() {
                    state.close(scope)?;
                }
            }
            (_, Event::Text(e)) => {
                if state.collecting_text() {
                    state.text.push_str(&e.unescape()?);
                }
            }
            (_, Event::CData(e)) => {
                if state.collecting_text() {
                    state.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
        buf.clear();
    }

    state.finish()
}

/// Role of an open element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    MetadataFields,
    MetadataField,
    MetadataValue,
    BrowseLinks,
    Browse,
    BrowseLink,
    Other,
}

#[derive(Debug, Default)]
struct PendingField {
    name: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Default)]
struct ExtractState {
    namespace: Option<Vec<u8>>,
    stack: Vec<Scope>,
    text: String,
    field: Option<PendingField>,
    fields: HashMap<String, String>,
    browse_seen: bool,
    thumb_link: Option<String>,
    browse_link: Option<String>,
}

impl ExtractState {
    fn in_namespace(&self, ns: &ResolveResult) -> bool {
        matches!(ns, ResolveResult::Bound(Namespace(uri)) if self.namespace.as_deref() == Some(*uri))
    }

    fn collecting_text(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Scope::MetadataValue | Scope::BrowseLink)
        )
    }

    fn open(&mut self, ns: &ResolveResult, e: &BytesStart) -> Result<Scope> {
        let local_name = e.local_name();
        let local = local_name.as_ref();

        let Some(&parent) = self.stack.last() else {
            if self.namespace.is_some() {
                return Ok(Scope::Other);
            }
            return self.open_root(ns, local);
        };

        if parent == Scope::Other || !self.in_namespace(ns) {
            return Ok(Scope::Other);
        }

        let scope = match (parent, local) {
            (Scope::Root, b"metadataFields") => Scope::MetadataFields,
            (Scope::MetadataFields, b"metadataField") => {
                self.field = Some(PendingField {
                    name: attribute(e, b"name")?,
                    value: None,
                });
                Scope::MetadataField
            }
            (Scope::MetadataField, b"metadataValue")
                if self.field.as_ref().is_some_and(|f| f.value.is_none()) =>
            {
                self.text.clear();
                Scope::MetadataValue
            }
            (Scope::Root, b"browseLinks") => Scope::BrowseLinks,
            (Scope::BrowseLinks, b"browse") if !self.browse_seen => {
                self.browse_seen = true;
                self.thumb_link = attribute(e, b"thumbLink")?;
                Scope::Browse
            }
            (Scope::Browse, b"browseLink") if self.browse_link.is_none() => {
                self.text.clear();
                Scope::BrowseLink
            }
            _ => Scope::Other,
        };

        Ok(scope)
    }

    fn open_root(&mut self, ns: &ResolveResult, local: &[u8]) -> Result<Scope> {
        match ns {
            ResolveResult::Bound(Namespace(uri)) => {
                debug!("Root namespace: {}", String::from_utf8_lossy(uri));
                self.namespace = Some(uri.to_vec());
                Ok(Scope::Root)
            }
            _ => Err(MetadataError::MissingNamespace {
                root: String::from_utf8_lossy(local).into_owned(),
            }),
        }
    }

    fn close(&mut self, scope: Scope) -> Result<()> {
        match scope {
            Scope::MetadataValue => {
                if let Some(field) = self.field.as_mut() {
                    field.value = Some(mem::take(&mut self.text));
                }
            }
            Scope::MetadataField => {
                if let Some(field) = self.field.take() {
                    self.insert_field(field)?;
                }
            }
            Scope::BrowseLink => {
                self.browse_link = Some(mem::take(&mut self.text));
            }
            _ => {}
        }
        Ok(())
    }

    fn insert_field(&mut self, field: PendingField) -> Result<()> {
        let name = field
            .name
            .ok_or_else(|| MetadataError::missing_element("metadataFields/metadataField[@name]"))?;
        let value = field.value.ok_or_else(|| {
            MetadataError::missing_element(format!(
                "metadataFields/metadataField[@name='{}']/metadataValue",
                name
            ))
        })?;

        let key = normalize_field_name(&name);
        if self.fields.insert(key.clone(), value).is_some() {
            warn!("Duplicate metadata field '{}', keeping the last value", key);
        }
        Ok(())
    }

    fn finish(self) -> Result<MetadataDocument> {
        let namespace = self
            .namespace
            .ok_or_else(|| MetadataError::missing_element("/"))?;

        if !self.browse_seen {
            return Err(MetadataError::missing_element("browseLinks/browse"));
        }
        let browse_link = self
            .browse_link
            .ok_or_else(|| MetadataError::missing_element("browseLinks/browse/browseLink"))?;
        let thumbnail_link = self
            .thumb_link
            .ok_or_else(|| MetadataError::missing_element("browseLinks/browse[@thumbLink]"))?;

        debug!("Extracted {} metadata fields", self.fields.len());

        Ok(MetadataDocument {
            namespace: String::from_utf8_lossy(&namespace).into_owned(),
            fields: self.fields,
            browse: BrowseLinks {
                browse_link,
                thumbnail_link,
            },
        })
    }
}

/// Unescaped value of an unprefixed attribute.
fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dms::convert_dms;

    const SAMPLE: &str = include_str!("../tests/fixtures/LE70820552011359EDC00.xml");
    const NS: &str = "http://earthexplorer.usgs.gov/eemetadata.xsd";

    /// Builds a default-namespace document from `(name, value)` pairs.
    fn build_xml(fields: &[(&str, &str)], browse: &str) -> String {
        let mut xml = format!("<scene xmlns=\"{}\">\n  <metadataFields>\n", NS);
        for (name, value) in fields {
            xml.push_str(&format!(
                "    <metadataField name=\"{}\"><metadataValue>{}</metadataValue></metadataField>\n",
                name, value
            ));
        }
        xml.push_str("  </metadataFields>\n");
        xml.push_str(browse);
        xml.push_str("</scene>\n");
        xml
    }

    const BROWSE: &str = r#"  <browseLinks>
    <browse thumbLink="https://example.com/t.jpg"><browseLink>https://example.com/b.jpg</browseLink></browse>
  </browseLinks>
"#;

    #[test]
    fn test_normalize_field_name() {
        assert_eq!(normalize_field_name("Entity ID"), "entity_id");
        assert_eq!(normalize_field_name("NW Corner Lat"), "nw_corner_lat");
        assert_eq!(normalize_field_name("Sun  Azimuth"), "sun__azimuth");
        assert_eq!(normalize_field_name("datum"), "datum");
    }

    #[test]
    fn test_extract_sample() {
        let doc = extract_metadata(SAMPLE.as_bytes()).unwrap();

        assert_eq!(doc.namespace, NS);
        assert_eq!(doc.len(), 26);
        assert_eq!(doc.get("entity_id"), Some("LE70820552011359EDC00"));
        assert_eq!(doc.get("cloud_cover"), Some("12"));
        assert_eq!(doc.get("center_latitude"), Some("4&deg;20'28.41\"N"));
        assert_eq!(
            doc.browse.thumbnail_link,
            "https://ims.cr.usgs.gov/thumbnail/gls/2010/082/055/LE70820552011359EDC00.jpg?size=small&v=2"
        );
        assert_eq!(
            doc.browse.browse_link,
            "https://ims.cr.usgs.gov/browse/gls/2010/082/055/LE70820552011359EDC00.jpg"
        );
    }

    #[test]
    fn test_parse_sample() {
        let record = parse_metadata_str(SAMPLE).unwrap();

        assert_eq!(record.entity_id(), "LE70820552011359EDC00");
        assert_eq!(record.acquisition_date(), "2011/12/25");
        assert_eq!(record.wrs_path(), 82);
        assert_eq!(record.wrs_row(), 55);
        assert_eq!(record.wrs_type(), "2");
        assert_eq!(record.time_series(), "2010");
        assert_eq!(record.datum(), "WGS84");
        assert_eq!(record.zone_number(), 56);
        assert_eq!(record.file_size(), 221_380_480);
        assert_eq!(record.orientation(), "NORTH_UP");
        assert_eq!(record.product_type(), "L1T");
        assert_eq!(record.resampling_technique(), "CC");
        assert_eq!(record.satellite_number(), "7");
        assert!((record.sun_azimuth() - 139.51).abs() < 1e-9);
        assert!((record.sun_elevation() - 56.7).abs() < 1e-9);
        assert_eq!(record.sw_corner_long(), "146&deg;24'28.80\"E");

        let expected = 4.0 + 20.0 / 60.0 + 28.41 / 3600.0;
        assert!((record.center_latitude_dec() - expected).abs() < 1e-9);
        assert_eq!(
            record.center_longitude_dec(),
            convert_dms(record.center_longitude()).unwrap()
        );
    }

    #[test]
    fn test_parse_is_repeatable() {
        let first = parse_metadata_str(SAMPLE).unwrap();
        let second = parse_metadata_str(SAMPLE).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_entity_id() {
        let xml = SAMPLE.replace("name=\"Entity ID\"", "name=\"Scene ID\"");

        match parse_metadata_str(&xml) {
            Err(MetadataError::MissingField { key }) => assert_eq!(key, "entity_id"),
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_field_without_value() {
        let xml = format!(
            "<scene xmlns=\"{}\"><metadataFields><metadataField name=\"Datum\"/></metadataFields>{}</scene>",
            NS, BROWSE
        );

        match extract_metadata(xml.as_bytes()) {
            Err(MetadataError::MissingElement { path }) => {
                assert!(path.ends_with("metadataValue"), "{}", path);
                assert!(path.contains("Datum"));
            }
            other => panic!("expected MissingElement, got {:?}", other),
        }
    }

    #[test]
    fn test_field_without_name() {
        let xml = format!(
            "<scene xmlns=\"{}\"><metadataFields><metadataField><metadataValue>x</metadataValue></metadataField></metadataFields>{}</scene>",
            NS, BROWSE
        );

        match extract_metadata(xml.as_bytes()) {
            Err(MetadataError::MissingElement { path }) => {
                assert_eq!(path, "metadataFields/metadataField[@name]")
            }
            other => panic!("expected MissingElement, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_value_is_empty_string() {
        let xml = format!(
            "<scene xmlns=\"{}\"><metadataFields><metadataField name=\"Datum\"><metadataValue/></metadataField></metadataFields>{}</scene>",
            NS, BROWSE
        );

        let doc = extract_metadata(xml.as_bytes()).unwrap();
        assert_eq!(doc.get("datum"), Some(""));
    }

    #[test]
    fn test_missing_browse_links() {
        let xml = build_xml(&[("Datum", "WGS84")], "");

        match extract_metadata(xml.as_bytes()) {
            Err(MetadataError::MissingElement { path }) => assert_eq!(path, "browseLinks/browse"),
            other => panic!("expected MissingElement, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_thumb_link() {
        let browse = "<browseLinks><browse><browseLink>b</browseLink></browse></browseLinks>";
        let xml = build_xml(&[("Datum", "WGS84")], browse);

        match extract_metadata(xml.as_bytes()) {
            Err(MetadataError::MissingElement { path }) => {
                assert_eq!(path, "browseLinks/browse[@thumbLink]")
            }
            other => panic!("expected MissingElement, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_browse_link() {
        let browse = "<browseLinks><browse thumbLink=\"t\"/></browseLinks>";
        let xml = build_xml(&[("Datum", "WGS84")], browse);

        match extract_metadata(xml.as_bytes()) {
            Err(MetadataError::MissingElement { path }) => {
                assert_eq!(path, "browseLinks/browse/browseLink")
            }
            other => panic!("expected MissingElement, got {:?}", other),
        }
    }

    #[test]
    fn test_elements_outside_namespace_are_ignored() {
        let xml = format!(
            r#"<scene xmlns="{}" xmlns:other="urn:other">
  <other:metadataFields>
    <metadataField name="Datum"><metadataValue>NAD27</metadataValue></metadataField>
  </other:metadataFields>
  <metadataFields>
    <metadataField name="Datum"><metadataValue>WGS84</metadataValue></metadataField>
  </metadataFields>
{}</scene>"#,
            NS, BROWSE
        );

        let doc = extract_metadata(xml.as_bytes()).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get("datum"), Some("WGS84"));
    }

    #[test]
    fn test_nested_fields_are_not_matched() {
        let xml = format!(
            r#"<scene xmlns="{}">
  <wrapper><metadataFields>
    <metadataField name="Datum"><metadataValue>NAD27</metadataValue></metadataField>
  </metadataFields></wrapper>
{}</scene>"#,
            NS, BROWSE
        );

        let doc = extract_metadata(xml.as_bytes()).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_duplicate_field_keeps_last() {
        let xml = build_xml(&[("Datum", "NAD27"), ("DATUM", "WGS84")], BROWSE);

        let doc = extract_metadata(xml.as_bytes()).unwrap();
        assert_eq!(doc.get("datum"), Some("WGS84"));
    }

    #[test]
    fn test_cdata_value() {
        let xml = build_xml(&[("Center Latitude", "<![CDATA[45&deg;30'15.500\"S]]>")], BROWSE);

        let doc = extract_metadata(xml.as_bytes()).unwrap();
        assert_eq!(doc.get("center_latitude"), Some("45&deg;30'15.500\"S"));
    }

    #[test]
    fn test_root_without_namespace() {
        let xml = "<scene><metadataFields/></scene>";

        match extract_metadata(xml.as_bytes()) {
            Err(MetadataError::MissingNamespace { root }) => assert_eq!(root, "scene"),
            other => panic!("expected MissingNamespace, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_document() {
        match extract_metadata("".as_bytes()) {
            Err(MetadataError::MissingElement { path }) => assert_eq!(path, "/"),
            other => panic!("expected MissingElement, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_xml() {
        let xml = format!("<scene xmlns=\"{}\"><metadataFields></scene>", NS);
        assert!(matches!(
            extract_metadata(xml.as_bytes()),
            Err(MetadataError::Xml(_))
        ));
    }
}
