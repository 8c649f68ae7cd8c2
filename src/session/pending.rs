use std::collections::HashSet;

use geojson::Feature;
use geojson::Geometry;

use crate::errors::CommandError;

/// Serializes the geometry's coordinate structure with object keys in sorted order, so two structurally equal geometries give the same text.
pub(crate) fn canonical_geometry(geometry: &Geometry) -> Result<String,CommandError> {
    // serde_json's default map is a BTreeMap, so converting to a Value sorts the keys. Foreign members and bbox are ignored.
    let value = serde_json::to_value(&geometry.value)?;
    Ok(value.to_string())
}

/// The result of capturing one batch of drawings.
#[derive(Debug,Default,PartialEq,Eq)]
pub(crate) struct CaptureReport {
    pub(crate) added: usize,
    pub(crate) duplicates: usize,
    pub(crate) without_geometry: usize
}

/// Drawings which have been captured from the map but not yet merged into the working set.
#[derive(Default)]
pub(crate) struct PendingDrawings {
    seen: HashSet<String>,
    features: Vec<Feature>
}

impl PendingDrawings {

    /// Adds features whose geometry isn't already pending. The drawing tool re-sends everything drawn so far on every refresh, so most features in a batch are usually duplicates.
    pub(crate) fn capture(&mut self, features: Vec<Feature>) -> Result<CaptureReport,CommandError> {
        let mut report = CaptureReport::default();
        for feature in features {
            let Some(geometry) = &feature.geometry else {
                report.without_geometry += 1;
                continue;
            };
            let canonical = canonical_geometry(geometry)?;
            if self.seen.insert(canonical) {
                self.features.push(feature);
                report.added += 1;
            } else {
                report.duplicates += 1;
            }
        }
        Ok(report)
    }

    pub(crate) fn features(&self) -> &[Feature] {
        &self.features
    }

    pub(crate) fn len(&self) -> usize {
        self.features.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Empties the pending set, returning what was in it.
    pub(crate) fn drain(&mut self) -> Vec<Feature> {
        self.seen.clear();
        core::mem::replace(&mut self.features, Vec::new())
    }

}

#[cfg(test)]
mod test {

    use geojson::Feature;
    use geojson::Geometry;
    use geojson::Value;
    use serde_json::json;

    use super::canonical_geometry;
    use super::PendingDrawings;

    fn feature(value: Value) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(value)),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    #[test]
    fn test_same_drawing_across_refreshes_is_pending_once() {
        let mut pending = PendingDrawings::default();
        let point = feature(Value::Point(vec![-70.6,-33.4]));
        let line = feature(Value::LineString(vec![vec![-70.6,-33.4],vec![-70.5,-33.3]]));

        let report = pending.capture(vec![point.clone()]).unwrap();
        assert_eq!(report.added,1);
        let report = pending.capture(vec![point,line]).unwrap();
        assert_eq!(report.added,1);
        assert_eq!(report.duplicates,1);
        assert_eq!(pending.len(),2);
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let mut pending = PendingDrawings::default();
        let point = feature(Value::Point(vec![1.0,2.0]));
        let report = pending.capture(vec![point.clone(),point]).unwrap();
        assert_eq!(report.added,1);
        assert_eq!(pending.len(),1);
    }

    #[test]
    fn test_empty_batch_and_missing_geometry() {
        let mut pending = PendingDrawings::default();
        assert_eq!(pending.capture(Vec::new()).unwrap().added,0);
        let mut no_geometry = feature(Value::Point(vec![0.0,0.0]));
        no_geometry.geometry = None;
        let report = pending.capture(vec![no_geometry]).unwrap();
        assert_eq!(report.without_geometry,1);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_canonical_ignores_properties_and_key_order() {
        let first: Geometry = serde_json::from_value(json!({"type": "Point", "coordinates": [1.0, 2.0]})).unwrap();
        let second: Geometry = serde_json::from_value(json!({"coordinates": [1.0, 2.0], "type": "Point"})).unwrap();
        assert_eq!(canonical_geometry(&first).unwrap(),canonical_geometry(&second).unwrap());
    }

    #[test]
    fn test_drain_allows_drawing_again() {
        let mut pending = PendingDrawings::default();
        let point = feature(Value::Point(vec![1.0,2.0]));
        _ = pending.capture(vec![point.clone()]).unwrap();
        assert_eq!(pending.drain().len(),1);
        assert!(pending.is_empty());
        assert_eq!(pending.capture(vec![point]).unwrap().added,1);
    }
}
