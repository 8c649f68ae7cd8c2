use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FormatResult;
use std::collections::BTreeMap;
use std::collections::HashSet;

use geojson::Feature;
use geojson::feature::Id;
use geojson::Geometry;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::CommandError;
use crate::table::AttributeTable;
use crate::table::AttributeValue;
use crate::table::ColumnType;
use crate::table::TableRow;

/// Identifies a row in the working set. Ids are assigned when the row is created and are never reused within a session.
#[derive(Clone,Copy,Debug,PartialEq,Eq,PartialOrd,Ord,Hash,Serialize,Deserialize,JsonSchema)]
#[serde(transparent)]
pub(crate) struct RowId(u64);

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write!(f,"{}",self.0)
    }
}

#[derive(Clone,Debug,PartialEq)]
pub(crate) struct WorkingRecord {
    id: RowId,
    geometry: Option<Geometry>,
    values: IndexMap<String,AttributeValue>,
    selected: bool
}

impl WorkingRecord {

    pub(crate) const fn id(&self) -> RowId {
        self.id
    }

    pub(crate) const fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub(crate) const fn is_selected(&self) -> bool {
        self.selected
    }

    pub(crate) fn value(&self, column: &str) -> Option<&AttributeValue> {
        self.values.get(column)
    }

}

/// The table of accepted geometries the user is building. The selection flag is kept apart from the other columns but is presented as the first column.
#[derive(Clone)]
pub(crate) struct WorkingSet {
    selection_column: String,
    columns: IndexMap<String,ColumnType>,
    records: Vec<WorkingRecord>,
    next_id: u64
}

impl WorkingSet {

    pub(crate) fn new(selection_column: &str) -> Self {
        Self {
            selection_column: selection_column.to_owned(),
            columns: IndexMap::new(),
            records: Vec::new(),
            next_id: 0
        }
    }

    pub(crate) const fn columns(&self) -> &IndexMap<String,ColumnType> {
        &self.columns
    }

    pub(crate) fn records(&self) -> &[WorkingRecord] {
        &self.records
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn get(&self, id: RowId) -> Option<&WorkingRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    fn has_column(&self, name: &str) -> bool {
        name == self.selection_column || self.columns.contains_key(name)
    }

    fn column_type(&self, name: &str) -> Result<ColumnType,CommandError> {
        if name == self.selection_column {
            Ok(ColumnType::Boolean)
        } else {
            self.columns.get(name).copied().ok_or_else(|| CommandError::UnknownColumn(name.to_owned()))
        }
    }

    fn allocate_id(&mut self) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds a column to the schema, filling it with nulls in every row. Returns false if the column already exists.
    pub(crate) fn add_column(&mut self, name: &str, column_type: ColumnType) -> Result<bool,CommandError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CommandError::EmptyColumnName)
        }
        if self.has_column(name) {
            return Ok(false)
        }
        _ = self.columns.insert(name.to_owned(), column_type);
        for record in &mut self.records {
            _ = record.values.insert(name.to_owned(), AttributeValue::Null);
        }
        Ok(true)
    }

    /// Switches a column to text, converting the values already in it.
    fn widen_to_text(&mut self, name: &str) {
        if let Some(column_type) = self.columns.get_mut(name) {
            *column_type = ColumnType::Text;
            for record in &mut self.records {
                if let Some(value) = record.values.get_mut(name) {
                    if !value.is_null() {
                        *value = AttributeValue::Text(value.to_string())
                    }
                }
            }
        }
    }

    /// Turns a captured drawing into a record. Properties the schema doesn't know about become new columns, with a type inferred from the value.
    pub(crate) fn append_feature(&mut self, feature: Feature) -> Result<RowId,CommandError> {
        let mut selected = false;
        let mut values: IndexMap<String,AttributeValue> = self.columns.iter().map(|(name,column_type)| (name.clone(),column_type.default_value())).collect();

        for (name,value) in feature.properties.unwrap_or_default() {
            let value = AttributeValue::from_json(&value);
            // column names are stored trimmed, so properties are looked up the same way.
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if name == self.selection_column {
                selected = value.is_truthy();
                continue;
            }
            if !self.has_column(name) {
                _ = self.add_column(name, value.inferred_type())?;
            }
            let column_type = self.column_type(name)?;
            let value = match value.clone().coerce(name, column_type) {
                Ok(value) => value,
                Err(_) => {
                    // a drawing shouldn't be rejected over a property type, so the column becomes text instead.
                    self.widen_to_text(name);
                    AttributeValue::Text(value.to_string())
                }
            };
            _ = values.insert(name.to_owned(), value);
        }

        let id = self.allocate_id();
        self.records.push(WorkingRecord {
            id,
            geometry: feature.geometry,
            values,
            selected
        });
        Ok(id)
    }

    /// Appends a row from the table editor. Unlike drawings, values must fit the columns they are given for.
    pub(crate) fn insert_row(&mut self, geometry: Option<Geometry>, values: IndexMap<String,AttributeValue>) -> Result<RowId,CommandError> {
        let mut selected = false;
        let mut row: IndexMap<String,AttributeValue> = self.columns.iter().map(|(name,column_type)| (name.clone(),column_type.default_value())).collect();
        for (name,value) in values {
            let column_type = self.column_type(&name)?;
            let value = value.coerce(&name, column_type)?;
            if name == self.selection_column {
                selected = value.is_truthy();
            } else {
                _ = row.insert(name, value);
            }
        }
        let id = self.allocate_id();
        self.records.push(WorkingRecord {
            id,
            geometry,
            values: row,
            selected
        });
        Ok(id)
    }

    /// Applies sparse cell edits. Every edit is checked before any is applied, so a bad edit leaves the table untouched. Returns true if any row was selected or unselected.
    pub(crate) fn apply_edits(&mut self, edits: &BTreeMap<RowId,IndexMap<String,AttributeValue>>) -> Result<bool,CommandError> {
        let mut checked = Vec::new();
        for (id,changes) in edits {
            let index = self.records.iter().position(|record| record.id == *id).ok_or_else(|| CommandError::UnknownRow(id.to_string()))?;
            for (column,value) in changes {
                let column_type = self.column_type(column)?;
                let value = value.clone().coerce(column, column_type)?;
                checked.push((index,column.clone(),value));
            }
        }

        let mut selection_changed = false;
        for (index,column,value) in checked {
            let Some(record) = self.records.get_mut(index) else {
                continue;
            };
            if column == self.selection_column {
                let selected = value.is_truthy();
                if selected != record.selected {
                    selection_changed = true;
                    record.selected = selected;
                }
            } else {
                _ = record.values.insert(column, value);
            }
        }
        Ok(selection_changed)
    }

    /// Removes the rows, keeping the rest in their original order. Unknown ids are an error, and nothing is removed in that case.
    pub(crate) fn delete(&mut self, ids: &[RowId]) -> Result<usize,CommandError> {
        let doomed: HashSet<RowId> = ids.iter().copied().collect();
        for id in &doomed {
            if self.get(*id).is_none() {
                return Err(CommandError::UnknownRow(id.to_string()))
            }
        }
        let before = self.records.len();
        self.records.retain(|record| !doomed.contains(&record.id));
        Ok(before - self.records.len())
    }

    /// Finds the ids of rows at the given positions in the current order.
    pub(crate) fn resolve_positions(&self, positions: &[usize]) -> Result<Vec<RowId>,CommandError> {
        positions.iter().map(|position| {
            self.records.get(*position).map(WorkingRecord::id).ok_or(CommandError::UnknownRowPosition(*position))
        }).collect()
    }

    /// Splits the drawable records into unselected and selected. Records without geometry are left out.
    pub(crate) fn partition_for_render(&self) -> (Vec<&WorkingRecord>,Vec<&WorkingRecord>) {
        self.records.iter().filter(|record| record.geometry.is_some()).partition(|record| !record.selected)
    }

    fn record_to_row(&self, record: &WorkingRecord) -> TableRow {
        let mut values = IndexMap::new();
        _ = values.insert(self.selection_column.clone(), AttributeValue::Boolean(record.selected));
        for name in self.columns.keys() {
            _ = values.insert(name.clone(), record.values.get(name).cloned().unwrap_or(AttributeValue::Null));
        }
        TableRow::new(record.geometry.clone(), values)
    }

    /// The record as a feature for display, identified by its row id.
    pub(crate) fn record_feature(&self, record: &WorkingRecord) -> Feature {
        let mut feature = self.record_to_row(record).to_feature();
        feature.id = Some(Id::Number(record.id.0.into()));
        feature
    }

    /// The records as a plain table, with the selection column first.
    pub(crate) fn to_table(&self) -> AttributeTable {
        let mut columns = IndexMap::new();
        _ = columns.insert(self.selection_column.clone(), ColumnType::Boolean);
        columns.extend(self.columns.iter().map(|(name,column_type)| (name.clone(),*column_type)));
        let mut table = AttributeTable::new(columns);
        for record in &self.records {
            table.push_row(self.record_to_row(record))
        }
        table
    }

    /// Builds the records from a loaded file. Every row gets a fresh id.
    pub(crate) fn from_table(table: AttributeTable, selection_column: &str) -> Self {
        let mut result = Self::new(selection_column);
        result.columns = table.columns.into_iter().filter(|(name,_)| name != selection_column).collect();
        for mut row in table.rows {
            let selected = row.values.shift_remove(selection_column).is_some_and(|value| value.is_truthy());
            let values = result.columns.keys().map(|name| (name.clone(),row.values.shift_remove(name).unwrap_or(AttributeValue::Null))).collect();
            let id = result.allocate_id();
            result.records.push(WorkingRecord {
                id,
                geometry: row.geometry,
                values,
                selected
            })
        }
        result
    }

}
