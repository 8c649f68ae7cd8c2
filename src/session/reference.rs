use std::path::PathBuf;

use indexmap::IndexMap;

use crate::errors::CommandError;
use crate::table::AttributeTable;
use crate::utils::color::LayerColor;
use crate::utils::extent::Extent;

/// A raster which has been rendered to an image for display over the map.
#[derive(Clone,Debug,PartialEq)]
pub(crate) struct RasterOverlay {
    pub(crate) image: PathBuf,
    pub(crate) bounds: Extent
}

#[derive(Clone,Debug,PartialEq)]
pub(crate) enum ReferencePayload {
    Vector(AttributeTable),
    Raster(RasterOverlay)
}

impl ReferencePayload {

    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::Vector(_) => "vector",
            Self::Raster(_) => "raster",
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub(crate) struct ReferenceLayer {
    payload: ReferencePayload,
    color: LayerColor
}

impl ReferenceLayer {

    pub(crate) const fn payload(&self) -> &ReferencePayload {
        &self.payload
    }

    pub(crate) const fn color(&self) -> LayerColor {
        self.color
    }
}

/// Layers loaded for reference, keyed by the name of the file they came from. They can't be edited, only recolored or removed.
#[derive(Default)]
pub(crate) struct ReferenceLayers {
    layers: IndexMap<String,ReferenceLayer>
}

impl ReferenceLayers {

    /// Loading a file with the same name as an existing layer replaces it, but the layer keeps its color. Returns true if a layer was replaced.
    pub(crate) fn insert(&mut self, name: String, payload: ReferencePayload, color: LayerColor) -> bool {
        match self.layers.get_mut(&name) {
            Some(existing) => {
                existing.payload = payload;
                true
            },
            None => {
                _ = self.layers.insert(name, ReferenceLayer { payload, color });
                false
            }
        }
    }

    pub(crate) fn get(&self, name: &str) -> Result<&ReferenceLayer,CommandError> {
        self.layers.get(name).ok_or_else(|| CommandError::UnknownReferenceLayer(name.to_owned()))
    }

    pub(crate) fn vector(&self, name: &str) -> Result<&AttributeTable,CommandError> {
        match &self.get(name)?.payload {
            ReferencePayload::Vector(table) => Ok(table),
            ReferencePayload::Raster(_) => Err(CommandError::ReferenceLayerNotVector(name.to_owned()))
        }
    }

    /// Returns true if the color was actually changed.
    pub(crate) fn set_color(&mut self, name: &str, color: LayerColor) -> Result<bool,CommandError> {
        let layer = self.layers.get_mut(name).ok_or_else(|| CommandError::UnknownReferenceLayer(name.to_owned()))?;
        if layer.color == color {
            Ok(false)
        } else {
            layer.color = color;
            Ok(true)
        }
    }

    pub(crate) fn remove(&mut self, name: &str) -> Result<ReferenceLayer,CommandError> {
        self.layers.shift_remove(name).ok_or_else(|| CommandError::UnknownReferenceLayer(name.to_owned()))
    }

    pub(crate) fn iter(&self) -> indexmap::map::Iter<'_,String,ReferenceLayer> {
        self.layers.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.layers.len()
    }

}

impl<'layers> IntoIterator for &'layers ReferenceLayers {
    type Item = (&'layers String,&'layers ReferenceLayer);

    type IntoIter = indexmap::map::Iter<'layers,String,ReferenceLayer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {

    use std::path::PathBuf;

    use super::RasterOverlay;
    use super::ReferenceLayers;
    use super::ReferencePayload;
    use crate::table::AttributeTable;
    use crate::utils::color::LayerColor;
    use crate::utils::extent::Extent;

    #[test]
    fn test_replacing_a_layer_keeps_color() {
        let mut layers = ReferenceLayers::default();
        let red = LayerColor::from_rgb(255,0,0);
        assert!(!layers.insert("roads.shp".to_owned(), ReferencePayload::Vector(AttributeTable::default()), red));
        assert!(layers.insert("roads.shp".to_owned(), ReferencePayload::Vector(AttributeTable::default()), LayerColor::from_rgb(0,0,0)));
        assert_eq!(layers.get("roads.shp").unwrap().color(),red);
        assert_eq!(layers.len(),1);
    }

    #[test]
    fn test_recolor_and_remove() {
        let mut layers = ReferenceLayers::default();
        let gray = LayerColor::from_rgb(0x55,0x55,0x55);
        _ = layers.insert("roads.shp".to_owned(), ReferencePayload::Vector(AttributeTable::default()), gray);
        assert!(!layers.set_color("roads.shp", gray).unwrap());
        assert!(layers.set_color("roads.shp", LayerColor::from_rgb(1,2,3)).unwrap());
        assert!(layers.set_color("rivers.shp", gray).is_err());
        _ = layers.remove("roads.shp").unwrap();
        assert!(layers.remove("roads.shp").is_err());
    }

    #[test]
    fn test_raster_has_no_table() {
        let mut layers = ReferenceLayers::default();
        let overlay = RasterOverlay {
            image: PathBuf::from("dem.png"),
            bounds: Extent::new(0.0,0.0,1.0,1.0)
        };
        _ = layers.insert("dem.tif".to_owned(), ReferencePayload::Raster(overlay), LayerColor::from_rgb(0,0,0));
        assert!(layers.vector("dem.tif").is_err());
        assert_eq!(layers.get("dem.tif").unwrap().payload().kind(),"raster");
    }
}
