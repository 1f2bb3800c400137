// Feature names of a GeoJSON map.

use geojson::{Feature, GeoJson};

use crate::atlas::io_common::read_source_text;
use crate::atlas::*;

const DEFAULT_NAME_PROPERTY: &str = "name";

/// The display names of the features, in the order of the file.
///
/// Features without the name property are skipped.
pub fn read_feature_names(path: String, source: &GeoJsonSource) -> BAtlasResult<Vec<String>> {
    let text = read_source_text(&path)?;
    let gj: GeoJson = text
        .parse::<GeoJson>()
        .context(ParsingGeoJsonSnafu { path: path.clone() })?;
    let features: Vec<Feature> = match gj {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(Box::new(AtlasError::Whatever {
                message: format!("The GeoJSON file {} has no features", path),
                source: None,
            }))
        }
    };
    let property = source
        .name_property
        .as_deref()
        .unwrap_or(DEFAULT_NAME_PROPERTY);

    let mut names: Vec<String> = Vec::with_capacity(features.len());
    for (idx, f) in features.iter().enumerate() {
        match f.property(property) {
            Some(JSValue::String(s)) if !s.trim().is_empty() => names.push(s.trim().to_string()),
            Some(JSValue::Number(n)) => names.push(n.to_string()),
            x => warn!(
                "read_feature_names: {}: feature {} has no {:?}: {:?}",
                path, idx, property, x
            ),
        }
    }
    info!("read_feature_names: {} features in {}", names.len(), path);
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(property: Option<&str>) -> GeoJsonSource {
        GeoJsonSource {
            file_path: "ccaa.geojson".to_string(),
            name_property: property.map(|s| s.to_string()),
        }
    }

    #[test]
    fn names_in_order() {
        let path = format!("{}/testdata/ccaa.geojson", env!("CARGO_MANIFEST_DIR"));
        let names = read_feature_names(path, &source(None)).unwrap();
        assert_eq!(names[0], "Comunidad de Madrid");
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn other_property() {
        let path = format!("{}/testdata/ccaa.geojson", env!("CARGO_MANIFEST_DIR"));
        let names = read_feature_names(path, &source(Some("iso"))).unwrap();
        assert_eq!(names[0], "ES-MD");
        // Galicia has no iso property.
        assert_eq!(names.len(), 8);
    }
}
