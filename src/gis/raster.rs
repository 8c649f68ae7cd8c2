use std::path::Path;
use std::path::PathBuf;

use gdal::Dataset;
use gdal::raster::Buffer;
use gdal::spatial_ref::AxisMappingStrategy;
use gdal::spatial_ref::CoordTransform;
use gdal::spatial_ref::SpatialRef;
use image::GrayImage;
use image::ImageFormat;
use image::Luma;
use image::Rgb as ImageRgb;
use image::RgbImage;

use crate::errors::CommandError;
use crate::gis::vector::wgs84;
use crate::session::reference::RasterOverlay;
use crate::utils::extent::Extent;

// points sampled along each edge of the raster when finding its geographic bounds, since straight edges in a projected system may curve in latitude and longitude.
const EDGE_SAMPLES: usize = 21;

#[derive(Clone,Debug)]
pub(crate) struct RasterSettings {
    pub(crate) max_dimension: usize,
    pub(crate) output_directory: PathBuf
}

pub(crate) struct RasterBounds {
    coord_min_x: f64,
    transform_x_factor: f64,
    coord_min_y: f64,
    transform_y_factor: f64,
    pixel_width: usize,
    pixel_height: usize,
}

impl RasterBounds {

    pub(crate) fn pixels_to_coords(&self, x: f64, y: f64) -> (f64,f64) {
        // https://gis.stackexchange.com/a/299572
        let lon = x * self.transform_x_factor + self.coord_min_x;
        let lat = y * self.transform_y_factor + self.coord_min_y;
        (lon,lat)
    }

    pub(crate) fn coords_to_pixels(&self, lon: f64, lat: f64) -> (f64,f64) {
        // this is just the reverse of the other
        let x = (lon - self.coord_min_x)/self.transform_x_factor;
        let y = (lat - self.coord_min_y)/self.transform_y_factor;
        (x,y)

    }

    /// Pixel positions around the outside of the raster, corners included.
    fn edge_pixels(&self) -> Vec<(f64,f64)> {
        #[allow(clippy::cast_precision_loss)]
        let (width,height) = (self.pixel_width as f64, self.pixel_height as f64);
        let mut result = Vec::with_capacity(EDGE_SAMPLES * 4);
        for step in 0..EDGE_SAMPLES {
            #[allow(clippy::cast_precision_loss)]
            let fraction = step as f64 / (EDGE_SAMPLES - 1) as f64;
            result.push((fraction * width, 0.0));
            result.push((fraction * width, height));
            result.push((0.0, fraction * height));
            result.push((width, fraction * height));
        }
        result
    }

}

pub(crate) struct RasterBandBuffer {
    width: usize,
    height: usize,
    buffer: Buffer<u8>,
}

impl RasterBandBuffer {

    /// Nearest neighbor lookup. Positions outside of the raster have no value.
    pub(crate) fn get_value(&self, x: f64, y: f64) -> Option<u8> {
        if y.is_sign_positive() && x.is_sign_positive() {
            let (column,row) = (x.floor() as usize, y.floor() as usize);
            if column < self.width && row < self.height {
                self.buffer.data().get((row * self.width) + column).copied()
            } else {
                None
            }
        } else {
            None
        }

    }

}

pub(crate) struct RasterMap {
    dataset: Dataset
}

impl RasterMap {

    pub(crate) fn open<FilePath: AsRef<Path>>(path: FilePath) -> Result<Self,CommandError> {
        Ok(Self {
            dataset: Dataset::open(path)?
        })
    }

    pub(crate) fn band_count(&self) -> usize {
        self.dataset.raster_count()
    }

    /// Reads a band as bytes. GDAL clamps values that don't fit.
    pub(crate) fn read_band(&self, index: usize) -> Result<RasterBandBuffer,CommandError> {
        if index == 0 || index > self.band_count() {
            return Err(CommandError::EmptyRasterBand(index))
        }
        let band = self.dataset.rasterband(index)?; // 1-based array
        let buffer = band.read_band_as::<u8>()?;
        let (width,height) = self.dataset.raster_size();
        Ok(RasterBandBuffer {
            width,
            height,
            buffer
        })
    }

    pub(crate) fn bounds(&self) -> Result<RasterBounds,CommandError> {
        let [coord_left,transform_x_factor,_,coord_top,_,transform_y_factor] = self.dataset.geo_transform()?;
        let (pixel_width,pixel_height) = self.dataset.raster_size();
        Ok(RasterBounds {
            coord_min_x: coord_left,
            transform_x_factor,
            coord_min_y: coord_top,
            transform_y_factor,
            pixel_width,
            pixel_height
        })

    }

    pub(crate) fn spatial_ref(&self, name: &str) -> Result<SpatialRef,CommandError> {
        let mut srs = self.dataset.spatial_ref().map_err(|_| CommandError::MissingSpatialReference(name.to_owned()))?;
        srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        Ok(srs)
    }

    pub(crate) fn pixel_size(&self) -> (usize,usize) {
        self.dataset.raster_size()
    }

}

/// The geographic extent of the raster, found by projecting points along its edges.
fn geographic_extent(bounds: &RasterBounds, to_geographic: &CoordTransform) -> Result<Extent,CommandError> {
    let (mut xs,mut ys): (Vec<f64>,Vec<f64>) = bounds.edge_pixels().into_iter().map(|(x,y)| bounds.pixels_to_coords(x, y)).unzip();
    let mut zs = vec![0.0;xs.len()];
    to_geographic.transform_coords(&mut xs, &mut ys, &mut zs)?;
    let west = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let east = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let south = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let north = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(Extent::new(west, south, east, north))
}

/// Chooses the image size for the reprojected raster. It keeps the aspect ratio of the geographic extent, and is never larger than the source or the configured maximum.
pub(crate) fn output_size(extent: &Extent, source_size: (usize,usize), max_dimension: usize) -> (usize,usize) {
    let longest = source_size.0.max(source_size.1).min(max_dimension).max(1);
    #[allow(clippy::cast_precision_loss)]
    let longest_float = longest as f64;
    if extent.width >= extent.height {
        let height = if extent.width > 0.0 {
            (longest_float * extent.height / extent.width).round() as usize
        } else {
            longest
        };
        (longest,height.max(1))
    } else {
        let width = (longest_float * extent.width / extent.height).round() as usize;
        (width.max(1),longest)
    }
}

fn overlay_file_name(path: &Path) -> String {
    let stem = path.file_stem().map_or_else(|| "raster".to_owned(), |stem| stem.to_string_lossy().into_owned());
    let stem: String = stem.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect();
    format!("{stem}_overlay.png")
}

/// Reprojects the raster to WGS 84 with nearest neighbor sampling, and writes it as a PNG. Rasters with three or more bands become RGB from the first three, others are grayscale from the first.
pub(crate) fn render_overlay(path: &Path, settings: &RasterSettings) -> Result<RasterOverlay,CommandError> {
    let name = path.display().to_string();
    let raster = RasterMap::open(path)?;
    let source_srs = raster.spatial_ref(&name)?;
    let target_srs = wgs84()?;
    let to_geographic = CoordTransform::new(&source_srs, &target_srs)?;
    let from_geographic = CoordTransform::new(&target_srs, &source_srs)?;

    let bounds = raster.bounds()?;
    let extent = geographic_extent(&bounds, &to_geographic)?;
    let (width,height) = output_size(&extent, raster.pixel_size(), settings.max_dimension);

    let bands = if raster.band_count() >= 3 {
        vec![raster.read_band(1)?,raster.read_band(2)?,raster.read_band(3)?]
    } else {
        vec![raster.read_band(1)?]
    };

    #[allow(clippy::cast_precision_loss)]
    let (step_x,step_y) = (extent.width / width as f64, extent.height / height as f64);
    let mut pixels = vec![0_u8; width * height * bands.len()];

    for row in 0..height {
        #[allow(clippy::cast_precision_loss)]
        let lat = extent.north() - (row as f64 + 0.5) * step_y;
        #[allow(clippy::cast_precision_loss)]
        let mut xs: Vec<f64> = (0..width).map(|column| extent.west + (column as f64 + 0.5) * step_x).collect();
        let mut ys = vec![lat;width];
        let mut zs = vec![0.0;width];
        from_geographic.transform_coords(&mut xs, &mut ys, &mut zs)?;
        for (column,(x,y)) in xs.into_iter().zip(ys).enumerate() {
            let (pixel_x,pixel_y) = bounds.coords_to_pixels(x, y);
            for (band_index,band) in bands.iter().enumerate() {
                if let Some(value) = band.get_value(pixel_x, pixel_y) {
                    if let Some(target) = pixels.get_mut((row * width + column) * bands.len() + band_index) {
                        *target = value
                    }
                }
            }
        }
    }

    let image_width = u32::try_from(width).map_err(|_| CommandError::RasterTooLarge(width,height))?;
    let image_height = u32::try_from(height).map_err(|_| CommandError::RasterTooLarge(width,height))?;
    std::fs::create_dir_all(&settings.output_directory)?;
    let output = settings.output_directory.join(overlay_file_name(path));

    if bands.len() >= 3 {
        let image = RgbImage::from_fn(image_width, image_height, |x,y| {
            let start = ((y as usize) * width + (x as usize)) * 3;
            let pixel = pixels.get(start..start + 3).unwrap_or(&[0,0,0]);
            ImageRgb([pixel[0],pixel[1],pixel[2]])
        });
        image.save_with_format(&output, ImageFormat::Png)?;
    } else {
        let image = GrayImage::from_fn(image_width, image_height, |x,y| {
            Luma([pixels.get((y as usize) * width + (x as usize)).copied().unwrap_or(0)])
        });
        image.save_with_format(&output, ImageFormat::Png)?;
    }

    Ok(RasterOverlay {
        image: output,
        bounds: extent
    })
}

#[cfg(test)]
mod test {

    use std::path::Path;

    use gdal::DriverManager;
    use gdal::spatial_ref::SpatialRef;

    use super::output_size;
    use super::overlay_file_name;
    use super::render_overlay;
    use super::RasterBounds;
    use super::RasterSettings;
    use crate::errors::CommandError;
    use crate::gis::VectorSource;
    use crate::gis::vector::read_table;
    use crate::test::scratch_directory;
    use crate::utils::extent::Extent;

    fn create_geotiff(path: &Path, epsg: u32, geo_transform: [f64;6], size: (usize,usize), bands: usize) {
        let mut dataset = DriverManager::get_driver_by_name("GTiff").unwrap().create_with_band_type::<u8,_>(path, size.0, size.1, bands).unwrap();
        dataset.set_geo_transform(&geo_transform).unwrap();
        dataset.set_spatial_ref(&SpatialRef::from_epsg(epsg).unwrap()).unwrap();
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9,"{actual} != {expected}");
    }

    #[test]
    fn test_output_size_keeps_aspect_and_limit() {
        let wide = Extent::new(0.0,0.0,2.0,1.0);
        assert_eq!(output_size(&wide,(4000,3000),2048),(2048,1024));
        assert_eq!(output_size(&wide,(100,80),2048),(100,50));
        let tall = Extent::new(0.0,0.0,1.0,4.0);
        assert_eq!(output_size(&tall,(500,500),2048),(125,500));
    }

    #[test]
    fn test_pixel_coordinate_round_trip() {
        let bounds = RasterBounds {
            coord_min_x: 300000.0,
            transform_x_factor: 30.0,
            coord_min_y: 6300000.0,
            transform_y_factor: -30.0,
            pixel_width: 100,
            pixel_height: 50,
        };
        let (x,y) = bounds.pixels_to_coords(10.0, 20.0);
        assert_eq!((x,y),(300300.0,6299400.0));
        assert_eq!(bounds.coords_to_pixels(x, y),(10.0,20.0));
        assert_eq!(bounds.edge_pixels().len(),84);
    }

    #[test]
    fn test_overlay_file_name() {
        assert_eq!(overlay_file_name(Path::new("/tmp/my dem.tif")),"my_dem_overlay.png");
    }

    #[test]
    fn test_geographic_raster_keeps_its_bounds() {
        let directory = scratch_directory("geographic_raster");
        let path = directory.join("dem.tif");
        create_geotiff(&path, 4326, [-71.0,0.01,0.0,-33.0,0.0,-0.01], (100,50), 1);
        let settings = RasterSettings {
            max_dimension: 2048,
            output_directory: directory.join("overlays")
        };
        let overlay = render_overlay(&path, &settings).unwrap();
        assert_close(overlay.bounds.west,-71.0);
        assert_close(overlay.bounds.south,-33.5);
        assert_close(overlay.bounds.east(),-70.0);
        assert_close(overlay.bounds.north(),-33.0);
        assert_eq!(overlay.image,directory.join("overlays").join("dem_overlay.png"));
        assert_eq!(image::image_dimensions(&overlay.image).unwrap(),(100,50));

        // a raster isn't a vector source
        assert!(matches!(read_table(&VectorSource::File(path)),Err(CommandError::NoVectorLayers(_))));
    }

    #[test]
    fn test_projected_raster_bounds_are_geographic() {
        let directory = scratch_directory("projected_raster");
        let path = directory.join("photo.tif");
        // 3 km square in UTM zone 19S, near Santiago
        create_geotiff(&path, 32719, [350000.0,30.0,0.0,6300000.0,0.0,-30.0], (100,100), 3);
        let settings = RasterSettings {
            max_dimension: 64,
            output_directory: directory.clone()
        };
        let overlay = render_overlay(&path, &settings).unwrap();
        let bounds = overlay.bounds;
        assert!((-71.0..-70.0).contains(&bounds.west),"west {}",bounds.west);
        assert!((-34.0..-33.0).contains(&bounds.south),"south {}",bounds.south);
        assert!(bounds.width > 0.02 && bounds.width < 0.05,"width {}",bounds.width);
        assert!(bounds.height > 0.02 && bounds.height < 0.05,"height {}",bounds.height);
        let (width,height) = image::image_dimensions(&overlay.image).unwrap();
        assert_eq!(width.max(height),64);
    }
}
