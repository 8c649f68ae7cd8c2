use std::path::Path;
use std::path::PathBuf;

use gdal::Dataset;
use gdal::DriverManager;
use gdal::vector::LayerOptions;
use gdal::spatial_ref::AxisMappingStrategy;
use gdal::spatial_ref::CoordTransform;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::Feature;
use gdal::vector::LayerAccess;
use gdal::vector::OGRwkbGeometryType;
use gdal::vector::ToGdal;
use geo_types::Geometry as GeoGeometry;
use indexmap::IndexMap;

use crate::errors::CommandError;
use crate::gis::VectorSource;
use crate::table::AttributeTable;
use crate::table::AttributeValue;
use crate::table::ColumnType;
use crate::table::TableRow;

const SHAPEFILE_DRIVER: &str = "ESRI Shapefile";
const GEOJSON_DRIVER: &str = "GeoJSON";
const SHAPEFILE_SIDECARS: [&str;4] = ["shx","dbf","prj","cpg"];

/// WGS 84, with longitude first so coordinates come out in GeoJSON order.
pub(crate) fn wgs84() -> Result<SpatialRef,CommandError> {
    let mut srs = SpatialRef::from_epsg(4326)?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|found| found.eq_ignore_ascii_case(extension))
}

fn archive_path(archive: &Path) -> PathBuf {
    PathBuf::from(format!("/vsizip/{}",archive.display()))
}

/// Finds the first entry in a zip archive with the given extension, as a path GDAL can open.
fn find_archive_entry(archive: &Path, extension: &'static str) -> Result<PathBuf,CommandError> {
    let root = archive_path(archive);
    let mut entries = gdal::vsi::read_dir(&root, true)?;
    entries.sort();
    let entry = entries.into_iter().find(|entry| has_extension(entry, extension))
                       .ok_or_else(|| CommandError::MissingArchiveEntry(archive.display().to_string(),extension))?;
    Ok(root.join(entry))
}

fn open_source(source: &VectorSource) -> Result<Dataset,CommandError> {
    match source {
        VectorSource::File(path) => Ok(Dataset::open(path)?),
        VectorSource::ArchiveEntry { archive, extension } => Ok(Dataset::open(find_archive_entry(archive, extension)?)?),
    }
}

fn read_geometry(geometry: &gdal::vector::Geometry, transform: Option<&CoordTransform>) -> Result<geojson::Geometry,CommandError> {
    let json = match transform {
        Some(transform) => geometry.transform(transform)?.json()?,
        None => geometry.json()?
    };
    serde_json::from_str(&json).map_err(|e| CommandError::InvalidGeometry(format!("{}",e)))
}

/// Reads all of the layers in the source into one table. Columns from later layers are added on, and a column that changes type between layers becomes text.
pub(crate) fn read_table(source: &VectorSource) -> Result<AttributeTable,CommandError> {
    let dataset = open_source(source)?;
    if dataset.layer_count() == 0 {
        return Err(CommandError::NoVectorLayers(source.to_string()))
    }
    let target = wgs84()?;
    let mut table = AttributeTable::default();

    for mut layer in dataset.layers() {

        let transform = match layer.spatial_ref() {
            Some(mut layer_srs) => {
                layer_srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
                if layer_srs == target {
                    None
                } else {
                    Some(CoordTransform::new(&layer_srs, &target)?)
                }
            },
            // GeoJSON and KML are always in geographic coordinates, and there's nothing to reproject from anyway.
            None => None
        };

        for field in layer.defn().fields() {
            let column_type = ColumnType::from_storage_type(field.field_type());
            let name = field.name();
            let merged_type = match table.columns.get(&name) {
                Some(existing) if *existing != column_type => ColumnType::Text,
                Some(existing) => *existing,
                None => column_type
            };
            _ = table.columns.insert(name, merged_type);
        }

        for feature in layer.features() {
            let geometry = feature.geometry().map(|geometry| read_geometry(geometry, transform.as_ref())).transpose()?;
            let values: IndexMap<String,AttributeValue> = feature.fields().map(|(name,value)| {
                (name,value.map_or(AttributeValue::Null, AttributeValue::from))
            }).collect();
            table.push_row(TableRow::new(geometry, values));
        }
    }

    // rows from layers which had columns of a different type still need to fit the table.
    for row in &mut table.rows {
        for (name,value) in &mut row.values {
            if let Some(ColumnType::Text) = table.columns.get(name) {
                if !value.is_null() && !matches!(value,AttributeValue::Text(_)) {
                    *value = AttributeValue::Text(value.to_string())
                }
            }
        }
    }

    Ok(table)
}

fn remove_existing(path: &Path, is_shapefile: bool) -> Result<(),CommandError> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if is_shapefile {
        for sidecar in SHAPEFILE_SIDECARS {
            let sidecar = path.with_extension(sidecar);
            if sidecar.exists() {
                std::fs::remove_file(sidecar)?;
            }
        }
    }
    Ok(())
}

fn to_gdal_geometry(geometry: &geojson::Geometry) -> Result<gdal::vector::Geometry,CommandError> {
    let geometry: GeoGeometry<f64> = geometry.value.clone().try_into().map_err(|e: geojson::Error| CommandError::InvalidGeometry(format!("{}",e)))?;
    Ok(geometry.to_gdal()?)
}

/// Writes the table to a new file, replacing any that is already there. Fields are set by position, since shapefiles may shorten the column names.
pub(crate) fn write_table(path: &Path, table: &AttributeTable) -> Result<(),CommandError> {
    let is_shapefile = has_extension(path, "shp");
    let driver = DriverManager::get_driver_by_name(if is_shapefile { SHAPEFILE_DRIVER } else { GEOJSON_DRIVER })?;
    remove_existing(path, is_shapefile)?;
    let mut dataset = driver.create_vector_only(path)?;

    let srs = wgs84()?;
    let layer_name = path.file_stem().map_or_else(|| "features".to_owned(), |stem| stem.to_string_lossy().into_owned());
    let layer = dataset.create_layer(LayerOptions {
        name: &layer_name,
        ty: OGRwkbGeometryType::wkbUnknown,
        srs: Some(&srs),
        options: None
    })?;

    let field_defs: Vec<(&str,_)> = table.columns.iter().map(|(name,column_type)| (name.as_str(),column_type.storage_type())).collect();
    layer.create_defn_fields(&field_defs)?;

    for row in &table.rows {
        let mut feature = Feature::new(layer.defn())?;
        if let Some(geometry) = &row.geometry {
            feature.set_geometry(to_gdal_geometry(geometry)?)?;
        }
        for (index,name) in table.columns.keys().enumerate() {
            match row.value(name) {
                AttributeValue::Null => feature.set_field_null(index)?,
                AttributeValue::Boolean(value) => feature.set_field_integer(index, i32::from(*value))?,
                AttributeValue::Integer(value) => feature.set_field_integer64(index, *value)?,
                AttributeValue::Real(value) => feature.set_field_double(index, *value)?,
                AttributeValue::Text(value) => feature.set_field_string(index, value)?,
            }
        }
        feature.create(&layer)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {

    use std::path::Path;

    use gdal::Dataset;
    use gdal::DriverManager;
    use gdal::vector::LayerOptions;
    use gdal::spatial_ref::SpatialRef;
    use gdal::vector::Feature;
    use gdal::vector::Geometry;
    use gdal::vector::OGRFieldType;
    use gdal::vector::LayerAccess;
    use gdal::vector::OGRwkbGeometryType;
    use geojson::Value;
    use indexmap::IndexMap;

    use super::find_archive_entry;
    use super::has_extension;
    use super::read_table;
    use super::wgs84;
    use super::write_table;
    use crate::errors::CommandError;
    use crate::gis::VectorSource;
    use crate::table::AttributeTable;
    use crate::table::AttributeValue;
    use crate::table::ColumnType;
    use crate::table::TableRow;
    use crate::test::scratch_directory;

    /// Adds a layer of points, given as WKT with their values in field order.
    fn add_point_layer(dataset: &mut Dataset, name: &str, srs: &SpatialRef, fields: &[(&str,OGRFieldType::Type)], points: &[(&str,Vec<AttributeValue>)]) {
        let layer = dataset.create_layer(LayerOptions {
            name,
            ty: OGRwkbGeometryType::wkbPoint,
            srs: Some(srs),
            options: None
        }).unwrap();
        layer.create_defn_fields(fields).unwrap();
        for (wkt,values) in points {
            let mut feature = Feature::new(layer.defn()).unwrap();
            feature.set_geometry(Geometry::from_wkt(wkt).unwrap()).unwrap();
            for (index,value) in values.iter().enumerate() {
                match value {
                    AttributeValue::Null => feature.set_field_null(index).unwrap(),
                    AttributeValue::Integer(value) => feature.set_field_integer64(index, *value).unwrap(),
                    AttributeValue::Real(value) => feature.set_field_double(index, *value).unwrap(),
                    AttributeValue::Text(value) => feature.set_field_string(index, value).unwrap(),
                    AttributeValue::Boolean(value) => feature.set_field_integer(index, i32::from(*value)).unwrap(),
                }
            }
            feature.create(&layer).unwrap();
        }
    }

    fn point(row: &TableRow) -> (f64,f64) {
        match row.geometry.as_ref().map(|geometry| &geometry.value) {
            Some(Value::Point(position)) => (position[0],position[1]),
            other => panic!("expected a point, found {other:?}")
        }
    }

    fn working_table() -> AttributeTable {
        let mut table = AttributeTable::new(IndexMap::from([
            ("selected".to_owned(),ColumnType::Boolean),
            ("name".to_owned(),ColumnType::Text),
            ("area".to_owned(),ColumnType::Real),
            ("count".to_owned(),ColumnType::Integer),
        ]));
        table.push_row(TableRow::new(
            Some(geojson::Geometry::new(Value::Point(vec![-70.5,-33.5]))),
            IndexMap::from([
                ("selected".to_owned(),AttributeValue::Boolean(true)),
                ("name".to_owned(),AttributeValue::Text("uno".to_owned())),
                ("area".to_owned(),AttributeValue::Real(1.5)),
                ("count".to_owned(),AttributeValue::Integer(3)),
            ])
        ));
        table.push_row(TableRow::new(
            Some(geojson::Geometry::new(Value::Point(vec![-70.25,-33.25]))),
            IndexMap::from([
                ("selected".to_owned(),AttributeValue::Boolean(false)),
                ("name".to_owned(),AttributeValue::Text("dos".to_owned())),
                ("area".to_owned(),AttributeValue::Null),
                ("count".to_owned(),AttributeValue::Null),
            ])
        ));
        table
    }

    #[test]
    fn test_extension_ignores_case() {
        assert!(has_extension(Path::new("roads.SHP"),"shp"));
        assert!(has_extension(Path::new("dir/roads.shp"),"shp"));
        assert!(!has_extension(Path::new("roads.shp.xml"),"shp"));
        assert!(!has_extension(Path::new("shp"),"shp"));
    }

    #[test]
    fn test_projected_layer_is_read_as_lon_lat() {
        let directory = scratch_directory("projected");
        let path = directory.join("wells.shp");
        {
            let mut dataset = DriverManager::get_driver_by_name("ESRI Shapefile").unwrap().create_vector_only(&path).unwrap();
            // UTM zone 19S, near Santiago
            add_point_layer(&mut dataset, "wells", &SpatialRef::from_epsg(32719).unwrap(), &[("code",OGRFieldType::OFTInteger64)], &[
                ("POINT (350000 6300000)",vec![AttributeValue::Integer(7)])
            ]);
        }
        let table = read_table(&VectorSource::File(path)).unwrap();
        assert_eq!(table.rows.len(),1);
        let (lon,lat) = point(&table.rows[0]);
        assert!((-71.0..-70.0).contains(&lon),"longitude {lon}");
        assert!((-34.0..-33.0).contains(&lat),"latitude {lat}");
        assert_eq!(table.rows[0].value("code"),&AttributeValue::Integer(7));
    }

    #[test]
    fn test_columns_are_merged_across_layers() {
        let directory = scratch_directory("layers");
        let path = directory.join("sites.gpkg");
        {
            let mut dataset = DriverManager::get_driver_by_name("GPKG").unwrap().create_vector_only(&path).unwrap();
            let srs = wgs84().unwrap();
            add_point_layer(&mut dataset, "first", &srs, &[("code",OGRFieldType::OFTInteger64),("name",OGRFieldType::OFTString)], &[
                ("POINT (-70.5 -33.5)",vec![AttributeValue::Integer(1),AttributeValue::Text("uno".to_owned())])
            ]);
            add_point_layer(&mut dataset, "second", &srs, &[("code",OGRFieldType::OFTString),("area",OGRFieldType::OFTReal)], &[
                ("POINT (-70.0 -33.0)",vec![AttributeValue::Text("B-2".to_owned()),AttributeValue::Real(3.5)])
            ]);
        }
        let table = read_table(&VectorSource::File(path)).unwrap();
        assert_eq!(table.columns,IndexMap::from([
            ("code".to_owned(),ColumnType::Text),
            ("name".to_owned(),ColumnType::Text),
            ("area".to_owned(),ColumnType::Real),
        ]));
        assert_eq!(table.rows.len(),2);
        assert_eq!(table.rows[0].value("code"),&AttributeValue::Text("1".to_owned()));
        assert_eq!(table.rows[0].value("area"),&AttributeValue::Null);
        assert_eq!(table.rows[1].value("code"),&AttributeValue::Text("B-2".to_owned()));
        assert_eq!(table.rows[1].value("area"),&AttributeValue::Real(3.5));
        assert_eq!(point(&table.rows[1]),(-70.0,-33.0));
    }

    #[test]
    fn test_shapefile_round_trip() {
        let directory = scratch_directory("shapefile");
        let path = directory.join("work.shp");
        write_table(&path, &working_table()).unwrap();
        // writing again replaces the old files instead of failing
        write_table(&path, &working_table()).unwrap();
        let table = read_table(&VectorSource::File(path)).unwrap();
        assert_eq!(table.columns.get("selected"),Some(&ColumnType::Integer));
        assert_eq!(table.rows.len(),2);
        assert_eq!(table.rows[0].value("selected"),&AttributeValue::Integer(1));
        assert_eq!(table.rows[1].value("selected"),&AttributeValue::Integer(0));
        assert_eq!(table.rows[0].value("name"),&AttributeValue::Text("uno".to_owned()));
        assert_eq!(table.rows[0].value("area"),&AttributeValue::Real(1.5));
        assert_eq!(table.rows[0].value("count"),&AttributeValue::Integer(3));
        assert_eq!(table.rows[1].value("area"),&AttributeValue::Null);
        let (lon,lat) = point(&table.rows[0]);
        assert!((lon + 70.5).abs() < 1e-9 && (lat + 33.5).abs() < 1e-9);
    }

    #[test]
    fn test_geojson_round_trip_keeps_nulls() {
        let directory = scratch_directory("geojson");
        let path = directory.join("work.geojson");
        write_table(&path, &working_table()).unwrap();
        let table = read_table(&VectorSource::File(path)).unwrap();
        let columns: Vec<&str> = table.columns.keys().map(String::as_str).collect();
        assert_eq!(columns,vec!["selected","name","area","count"]);
        assert_eq!(table.rows[0].value("selected"),&AttributeValue::Integer(1));
        assert_eq!(table.rows[1].value("selected"),&AttributeValue::Integer(0));
        assert_eq!(table.rows[1].value("name"),&AttributeValue::Text("dos".to_owned()));
        assert_eq!(table.rows[1].value("area"),&AttributeValue::Null);
        assert_eq!(table.rows[1].value("count"),&AttributeValue::Null);
        assert_eq!(point(&table.rows[1]),(-70.25,-33.25));
    }

    #[test]
    fn test_first_kml_entry_in_archive() {
        let directory = scratch_directory("archive");
        let archive = directory.join("places.kmz");
        {
            let entry = format!("/vsizip/{}/doc.kml",archive.display());
            let mut dataset = DriverManager::get_driver_by_name("KML").unwrap().create_vector_only(entry).unwrap();
            add_point_layer(&mut dataset, "places", &wgs84().unwrap(), &[], &[
                ("POINT (-70.6 -33.4)",Vec::new())
            ]);
        }
        let entry = find_archive_entry(&archive, "kml").unwrap();
        assert!(entry.ends_with("doc.kml"));
        assert!(matches!(find_archive_entry(&archive, "shp"),Err(CommandError::MissingArchiveEntry(_,"shp"))));

        let table = read_table(&VectorSource::ArchiveEntry { archive, extension: "kml" }).unwrap();
        assert_eq!(table.rows.len(),1);
        // KML points may come back with an elevation, only the first two positions are checked
        let (lon,lat) = point(&table.rows[0]);
        assert!((lon + 70.6).abs() < 1e-6 && (lat + 33.4).abs() < 1e-6);
    }
}
