use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FormatResult;
use std::path::Path;
use std::path::PathBuf;

use crate::errors::CommandError;
use crate::session::reference::RasterOverlay;
use crate::table::AttributeTable;

pub(crate) mod raster;
pub(crate) mod upload;
pub(crate) mod vector;

pub(crate) use raster::RasterSettings;

/// Where to find a vector dataset.
#[derive(Clone,Debug,PartialEq,Eq)]
pub(crate) enum VectorSource {
    File(PathBuf),
    /// The first entry in a zip archive with the specified extension.
    ArchiveEntry {
        archive: PathBuf,
        extension: &'static str
    }
}

impl Display for VectorSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            Self::File(path) => write!(f,"{}",path.display()),
            Self::ArchiveEntry { archive, extension } => write!(f,"{} (first .{} entry)",archive.display(),extension),
        }
    }
}

/// The GIS operations a session needs. Everything passes through here so the session logic can be exercised without real files.
pub(crate) trait GisBackend {

    /// Reads every layer in the source into one table, reprojected to WGS 84 longitude and latitude.
    fn read_vector(&mut self, source: &VectorSource) -> Result<AttributeTable,CommandError>;

    /// Reprojects a raster to WGS 84 and renders it as an image that can be laid over the map.
    fn render_raster(&mut self, path: &Path, settings: &RasterSettings) -> Result<RasterOverlay,CommandError>;

    /// Writes a table as GeoJSON, or as a shapefile if the path ends with '.shp'.
    fn write_vector(&mut self, path: &Path, table: &AttributeTable) -> Result<(),CommandError>;

}

pub(crate) struct GdalBackend;

impl GisBackend for GdalBackend {

    fn read_vector(&mut self, source: &VectorSource) -> Result<AttributeTable,CommandError> {
        vector::read_table(source)
    }

    fn render_raster(&mut self, path: &Path, settings: &RasterSettings) -> Result<RasterOverlay,CommandError> {
        raster::render_overlay(path, settings)
    }

    fn write_vector(&mut self, path: &Path, table: &AttributeTable) -> Result<(),CommandError> {
        vector::write_table(path, table)
    }
}
