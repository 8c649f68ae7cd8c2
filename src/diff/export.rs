use std::io::Write;

use crate::diff::KeyedDiff;
use crate::diff::SchemaDiff;
use crate::errors::CommandError;

/// Writes delimited text. Fields containing the delimiter, quotes or line breaks are quoted, with quotes doubled.
pub(crate) struct DelimitedWriter<Target: Write> {
    target: Target,
    delimiter: char
}

impl<Target: Write> DelimitedWriter<Target> {

    pub(crate) const fn new(target: Target, delimiter: char) -> Self {
        Self {
            target,
            delimiter
        }
    }

    fn quote(&self, field: &str) -> String {
        if field.contains(self.delimiter) || field.contains(['"','\n','\r']) {
            format!("\"{}\"",field.replace('"', "\"\""))
        } else {
            field.to_owned()
        }
    }

    pub(crate) fn write_record<Field: AsRef<str>>(&mut self, fields: &[Field]) -> Result<(),CommandError> {
        let line = fields.iter().map(|field| self.quote(field.as_ref())).collect::<Vec<_>>().join(&self.delimiter.to_string());
        write!(self.target,"{line}\r\n")?;
        Ok(())
    }

    pub(crate) fn into_inner(self) -> Target {
        self.target
    }

}

/// One row for each column that is only in one table or that changed type.
pub(crate) fn write_schema_diff<Target: Write>(writer: &mut DelimitedWriter<Target>, diff: &SchemaDiff) -> Result<(),CommandError> {
    writer.write_record(&["column","change","type_a","type_b"])?;
    for (column,column_type) in &diff.only_in_a {
        writer.write_record(&[column.as_str(),"only_in_a",column_type.to_string().as_str(),""])?;
    }
    for (column,column_type) in &diff.only_in_b {
        writer.write_record(&[column.as_str(),"only_in_b","",column_type.to_string().as_str()])?;
    }
    for change in &diff.type_changes {
        writer.write_record(&[change.column.as_str(),"type_changed",change.before.to_string().as_str(),change.after.to_string().as_str()])?;
    }
    Ok(())
}

/// One row for each changed value, plus a row for each key that was removed, added or had its geometry changed.
pub(crate) fn write_keyed_diff<Target: Write>(writer: &mut DelimitedWriter<Target>, key: &str, diff: &KeyedDiff) -> Result<(),CommandError> {
    writer.write_record(&[key,"change","column","value_a","value_b"])?;
    for value in &diff.removed {
        writer.write_record(&[value.as_str(),"removed","","",""])?;
    }
    for value in &diff.added {
        writer.write_record(&[value.as_str(),"added","","",""])?;
    }
    for modified in &diff.attribute_modified {
        for change in &modified.changes {
            writer.write_record(&[modified.key.as_str(),"attribute_modified",change.column.as_str(),change.before.as_str(),change.after.as_str()])?;
        }
    }
    for value in &diff.geometry_modified {
        writer.write_record(&[value.as_str(),"geometry_modified","","",""])?;
    }
    Ok(())
}
