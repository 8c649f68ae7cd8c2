use indexmap::IndexMap;
use serde::Serialize;

use crate::table::AttributeTable;
use crate::table::ColumnType;

#[derive(Clone,Debug,PartialEq,Eq,Serialize)]
pub(crate) struct TypeChange {
    pub(crate) column: String,
    pub(crate) before: ColumnType,
    pub(crate) after: ColumnType
}

/// The difference between the columns of two tables. Lists are in the order the columns appear in their tables.
#[derive(Clone,Debug,Default,PartialEq,Eq,Serialize)]
pub(crate) struct SchemaDiff {
    pub(crate) only_in_a: Vec<(String,ColumnType)>,
    pub(crate) only_in_b: Vec<(String,ColumnType)>,
    pub(crate) common: Vec<String>,
    pub(crate) type_changes: Vec<TypeChange>
}

impl SchemaDiff {

    pub(crate) fn compare(a: &AttributeTable, b: &AttributeTable) -> Self {
        Self::compare_columns(&a.columns, &b.columns)
    }

    fn compare_columns(a: &IndexMap<String,ColumnType>, b: &IndexMap<String,ColumnType>) -> Self {
        let mut result = Self::default();
        for (name,column_type) in a {
            match b.get(name) {
                Some(other_type) => {
                    result.common.push(name.clone());
                    if other_type != column_type {
                        result.type_changes.push(TypeChange {
                            column: name.clone(),
                            before: *column_type,
                            after: *other_type
                        })
                    }
                },
                None => result.only_in_a.push((name.clone(),*column_type))
            }
        }
        result.only_in_b = b.iter().filter(|(name,_)| !a.contains_key(*name)).map(|(name,column_type)| (name.clone(),*column_type)).collect();
        result
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty() && self.type_changes.is_empty()
    }

}
