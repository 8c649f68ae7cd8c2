use std::fs::File;
use std::io::BufWriter;
use std::io::Write as _;
use std::path::PathBuf;

use clap::Args;

use super::Task;
use crate::diff::KeyedDiff;
use crate::diff::SchemaDiff;
use crate::diff::export::DelimitedWriter;
use crate::diff::export::write_keyed_diff;
use crate::diff::export::write_schema_diff;
use crate::errors::CommandError;
use crate::gis::GdalBackend;
use crate::gis::GisBackend;
use crate::gis::VectorSource;
use crate::progress::ProgressObserver;

fn list<Item: AsRef<str>>(items: &[Item]) -> String {
    if items.is_empty() {
        "(none)".to_owned()
    } else {
        let items: Vec<&str> = items.iter().map(|item| item.as_ref()).collect();
        items.join(", ")
    }
}

#[derive(Args)]
/// Compares the columns of two vector files and, given a key column, matches their rows to find what was added, removed or modified.
pub(crate) struct Diff {

    /// The earlier version of the data
    a: PathBuf,

    /// The later version of the data
    b: PathBuf,

    #[arg(long)]
    /// Column that identifies the same feature in both files. Rows are matched by the text of this value.
    key: Option<String>,

    #[arg(long)]
    /// Exports the column differences as delimited text
    schema_out: Option<PathBuf>,

    #[arg(long,requires = "key")]
    /// Exports the row differences as delimited text
    rows_out: Option<PathBuf>,

    #[arg(long,default_value = ",")]
    /// Field delimiter for exported files
    delimiter: char

}

impl Task for Diff {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
        let mut backend = GdalBackend;
        progress.start_unknown_endpoint(|| "Reading tables.");
        let a = backend.read_vector(&VectorSource::File(self.a.clone()))?;
        let b = backend.read_vector(&VectorSource::File(self.b.clone()))?;
        progress.finish(|| "Tables read.");

        let schema = SchemaDiff::compare(&a, &b);
        progress.announce("Columns");
        let only_a: Vec<String> = schema.only_in_a.iter().map(|(name,column_type)| format!("{name} ({column_type})")).collect();
        let only_b: Vec<String> = schema.only_in_b.iter().map(|(name,column_type)| format!("{name} ({column_type})")).collect();
        progress.message(|| format!("Only in {}: {}",self.a.display(),list(&only_a)));
        progress.message(|| format!("Only in {}: {}",self.b.display(),list(&only_b)));
        progress.message(|| format!("In both: {}",list(&schema.common)));
        for change in &schema.type_changes {
            progress.warning(|| format!("Type of {} changed from {} to {}",change.column,change.before,change.after))
        }

        if let Some(path) = &self.schema_out {
            let mut writer = DelimitedWriter::new(BufWriter::new(File::create(path)?), self.delimiter);
            write_schema_diff(&mut writer, &schema)?;
            writer.into_inner().flush()?;
        }

        if let Some(key) = &self.key {
            let rows = KeyedDiff::compare(&a, &b, key)?;
            progress.announce(&format!("Rows by {key}"));
            progress.message(|| format!("Removed: {}",list(&rows.removed)));
            progress.message(|| format!("Added: {}",list(&rows.added)));
            progress.message(|| format!("In both: {}",rows.common.len()));
            let modified: Vec<&str> = rows.attribute_modified.iter().map(|change| change.key.as_str()).collect();
            progress.message(|| format!("Attributes modified: {}",list(&modified)));
            progress.message(|| format!("Geometry modified: {}",list(&rows.geometry_modified)));
            for (value,table) in &rows.duplicate_keys {
                progress.warning(|| format!("Key '{value}' appears more than once in table {table}, only the first row was compared."))
            }

            if let Some(path) = &self.rows_out {
                let mut writer = DelimitedWriter::new(BufWriter::new(File::create(path)?), self.delimiter);
                write_keyed_diff(&mut writer, key, &rows)?;
                writer.into_inner().flush()?;
            }
        }

        Ok(())
    }
}
