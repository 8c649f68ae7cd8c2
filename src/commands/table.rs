use std::io::Write as _;
use std::path::PathBuf;

use clap::Args;

use super::Task;
use crate::diff::export::DelimitedWriter;
use crate::errors::CommandError;
use crate::gis::GdalBackend;
use crate::gis::GisBackend;
use crate::gis::VectorSource;
use crate::progress::ProgressObserver;
use crate::table::AttributeTable;

const SUGGESTION_LIMIT: usize = 10;

fn geometry_type(geometry: Option<&geojson::Geometry>) -> &'static str {
    match geometry.map(|geometry| &geometry.value) {
        None => "",
        Some(geojson::Value::Point(_)) => "Point",
        Some(geojson::Value::MultiPoint(_)) => "MultiPoint",
        Some(geojson::Value::LineString(_)) => "LineString",
        Some(geojson::Value::MultiLineString(_)) => "MultiLineString",
        Some(geojson::Value::Polygon(_)) => "Polygon",
        Some(geojson::Value::MultiPolygon(_)) => "MultiPolygon",
        Some(geojson::Value::GeometryCollection(_)) => "GeometryCollection",
    }
}

fn write_rows<Target: std::io::Write>(writer: &mut DelimitedWriter<Target>, table: &AttributeTable) -> Result<(),CommandError> {
    let mut header = vec!["geometry".to_owned()];
    header.extend(table.columns.keys().cloned());
    writer.write_record(&header)?;
    for row in &table.rows {
        let mut record = vec![geometry_type(row.geometry.as_ref()).to_owned()];
        record.extend(table.columns.keys().map(|column| row.value(column).to_string()));
        writer.write_record(&record)?;
    }
    Ok(())
}

#[derive(Args)]
/// Prints the attribute table of a vector file, after reprojecting it the way a reference layer would be.
pub(crate) struct Table {

    /// The vector file to read
    source: PathBuf,

    #[arg(long,default_value = ",")]
    /// Field delimiter for the printed rows
    delimiter: char,

    #[arg(long)]
    /// Instead of printing the rows, lists the features matching this text, ignoring case and accents
    search: Option<String>

}

impl Task for Table {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
        progress.start_unknown_endpoint(|| format!("Reading {}.",self.source.display()));
        let table = GdalBackend.read_vector(&VectorSource::File(self.source.clone()))?;
        progress.finish(|| "Table read.");

        progress.announce(&format!("{} column(s)",table.columns.len()));
        for (name,column_type) in &table.columns {
            progress.message(|| format!("{name}: {column_type}"))
        }
        if let Some(extent) = table.extent()? {
            progress.message(|| format!("Bounds: {:?}",extent.lat_lon_bounds()))
        }

        if let Some(query) = &self.search {
            let suggestions = table.suggest(query, SUGGESTION_LIMIT);
            progress.announce(&format!("{} match(es) for '{query}'",suggestions.len()));
            for suggestion in suggestions {
                progress.message(|| suggestion.to_string())
            }
        } else {
            progress.announce(&format!("{} row(s)",table.rows.len()));
            let mut writer = DelimitedWriter::new(std::io::stdout().lock(), self.delimiter);
            write_rows(&mut writer, &table)?;
            writer.into_inner().flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {

    use geojson::Geometry;
    use geojson::Value;
    use indexmap::IndexMap;

    use super::write_rows;
    use crate::diff::export::DelimitedWriter;
    use crate::table::AttributeTable;
    use crate::table::AttributeValue;
    use crate::table::ColumnType;
    use crate::table::TableRow;

    #[test]
    fn test_rows_are_written_with_geometry_type() {
        let mut table = AttributeTable::new(IndexMap::from([
            ("name".to_owned(),ColumnType::Text),
            ("area".to_owned(),ColumnType::Real),
        ]));
        table.push_row(TableRow::new(
            Some(Geometry::new(Value::Point(vec![1.0,2.0]))),
            IndexMap::from([("name".to_owned(),AttributeValue::Text("a, b".to_owned())),("area".to_owned(),AttributeValue::Real(1.5))])
        ));
        table.push_row(TableRow::new(None,IndexMap::new()));
        let mut writer = DelimitedWriter::new(Vec::new(), ',');
        write_rows(&mut writer, &table).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text,"geometry,name,area\r\nPoint,\"a, b\",1.5\r\n,,\r\n");
    }
}
