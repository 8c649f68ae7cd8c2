use geo::BoundingRect;
use geo_types::Geometry as GeoGeometry;
use serde::Serialize;

use crate::errors::CommandError;

#[derive(Clone,Debug,PartialEq,Serialize)]
pub(crate) struct Extent {
    pub(crate) height: f64,
    pub(crate) width: f64,
    pub(crate) south: f64,
    pub(crate) west: f64,
}

impl Extent {

    pub(crate) fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        let width = east - west;
        let height = north - south;
        Self {
            height,
            width,
            south,
            west
        }
    }

    /// Returns None for empty geometries, such as an empty collection.
    pub(crate) fn from_geometry(geometry: &geojson::Geometry) -> Result<Option<Self>,CommandError> {
        let geometry: GeoGeometry<f64> = geometry.value.clone().try_into().map_err(|e: geojson::Error| CommandError::InvalidGeometry(format!("{}",e)))?;
        Ok(geometry.bounding_rect().map(|rect| {
            let min = rect.min();
            let max = rect.max();
            Self::new(min.x, min.y, max.x, max.y)
        }))
    }

    /// Computes the combined extent of several geometries, skipping the ones that have no extent.
    pub(crate) fn from_geometries<'geometry, Geometries: IntoIterator<Item = &'geometry geojson::Geometry>>(geometries: Geometries) -> Result<Option<Self>,CommandError> {
        let mut result: Option<Self> = None;
        for geometry in geometries {
            if let Some(extent) = Self::from_geometry(geometry)? {
                result = Some(match result {
                    Some(previous) => previous.union(&extent),
                    None => extent
                })
            }
        }
        Ok(result)
    }

    pub(crate) fn union(&self, other: &Self) -> Self {
        Self::new(
            self.west.min(other.west),
            self.south.min(other.south),
            self.east().max(other.east()),
            self.north().max(other.north())
        )
    }

    pub(crate) fn east(&self) -> f64 {
        self.west + self.width
    }

    pub(crate) fn north(&self) -> f64 {
        self.south + self.height
    }

    /// Bounds in the `[[lat_min, lon_min], [lat_max, lon_max]]` order web maps expect.
    pub(crate) fn lat_lon_bounds(&self) -> [[f64;2];2] {
        [[self.south,self.west],[self.north(),self.east()]]
    }

    pub(crate) fn center(&self) -> (f64,f64) {
        (self.south + self.height / 2.0, self.west + self.width / 2.0)
    }

}
