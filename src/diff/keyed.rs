use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::CommandError;
use crate::table::AttributeTable;
use crate::table::TableRow;

#[derive(Clone,Debug,PartialEq,Eq,Serialize)]
pub(crate) struct ValueChange {
    pub(crate) column: String,
    pub(crate) before: String,
    pub(crate) after: String
}

#[derive(Clone,Debug,PartialEq,Eq,Serialize)]
pub(crate) struct AttributeChange {
    pub(crate) key: String,
    pub(crate) changes: Vec<ValueChange>
}

/// Rows of two tables matched by the text of a key column. Keys are listed in the order they appear in their table.
#[derive(Clone,Debug,Default,PartialEq,Eq,Serialize)]
pub(crate) struct KeyedDiff {
    pub(crate) removed: Vec<String>,
    pub(crate) added: Vec<String>,
    pub(crate) common: Vec<String>,
    pub(crate) attribute_modified: Vec<AttributeChange>,
    pub(crate) geometry_modified: Vec<String>,
    /// Keys which appear more than once in a table, with the table they appear in. Only the first of those rows is compared.
    pub(crate) duplicate_keys: Vec<(String,&'static str)>
}

fn index_by_key<'table>(table: &'table AttributeTable, key: &str, table_name: &'static str, duplicates: &mut Vec<(String,&'static str)>) -> Result<IndexMap<String,&'table TableRow>,CommandError> {
    if !table.has_column(key) {
        return Err(CommandError::MissingKeyColumn(key.to_owned(), table_name))
    }
    let mut result = IndexMap::new();
    for row in &table.rows {
        let value = row.value(key).comparison_text();
        if result.contains_key(&value) {
            duplicates.push((value,table_name))
        } else {
            _ = result.insert(value, row);
        }
    }
    Ok(result)
}

impl KeyedDiff {

    /// Full outer join of the tables on the key column. Matched rows are compared on every other column both tables have, and on their geometry.
    pub(crate) fn compare(a: &AttributeTable, b: &AttributeTable, key: &str) -> Result<Self,CommandError> {
        let mut result = Self::default();
        let rows_a = index_by_key(a, key, "A", &mut result.duplicate_keys)?;
        let rows_b = index_by_key(b, key, "B", &mut result.duplicate_keys)?;
        let compared: Vec<&String> = a.columns.keys().filter(|column| *column != key && b.columns.contains_key(*column)).collect();

        for (value,row_a) in &rows_a {
            let Some(row_b) = rows_b.get(value) else {
                result.removed.push(value.clone());
                continue;
            };
            result.common.push(value.clone());

            let changes: Vec<ValueChange> = compared.iter().filter_map(|column| {
                let before = row_a.value(column).comparison_text();
                let after = row_b.value(column).comparison_text();
                (before != after).then(|| ValueChange {
                    column: (*column).clone(),
                    before,
                    after
                })
            }).collect();
            if !changes.is_empty() {
                result.attribute_modified.push(AttributeChange {
                    key: value.clone(),
                    changes
                })
            }

            if row_a.geometry.as_ref().map(|geometry| &geometry.value) != row_b.geometry.as_ref().map(|geometry| &geometry.value) {
                result.geometry_modified.push(value.clone())
            }
        }

        result.added = rows_b.keys().filter(|value| !rows_a.contains_key(*value)).cloned().collect();
        Ok(result)
    }

}

#[cfg(test)]
mod test {

    use geojson::Geometry;
    use geojson::Value;
    use indexmap::IndexMap;

    use super::KeyedDiff;
    use super::ValueChange;
    use crate::table::AttributeTable;
    use crate::table::AttributeValue;
    use crate::table::ColumnType;
    use crate::table::TableRow;

    fn table(rows: &[(i64,&str,f64)]) -> AttributeTable {
        let mut result = AttributeTable::new(IndexMap::from([
            ("id".to_owned(),ColumnType::Integer),
            ("name".to_owned(),ColumnType::Text),
        ]));
        for (id,name,x) in rows {
            result.push_row(TableRow::new(
                Some(Geometry::new(Value::Point(vec![*x,0.0]))),
                IndexMap::from([
                    ("id".to_owned(),AttributeValue::Integer(*id)),
                    ("name".to_owned(),AttributeValue::Text((*name).to_owned())),
                ])
            ))
        }
        result
    }

    #[test]
    fn test_outer_join_partitions() {
        let a = table(&[(1,"one",1.0),(2,"two",2.0),(3,"three",3.0)]);
        let b = table(&[(2,"two",2.0),(3,"three",3.0),(4,"four",4.0)]);
        let diff = KeyedDiff::compare(&a, &b, "id").unwrap();
        assert_eq!(diff.removed,vec!["1".to_owned()]);
        assert_eq!(diff.added,vec!["4".to_owned()]);
        assert_eq!(diff.common,vec!["2".to_owned(),"3".to_owned()]);
        assert!(diff.attribute_modified.is_empty());
        assert!(diff.geometry_modified.is_empty());
    }

    #[test]
    fn test_attribute_change_is_not_geometry_change() {
        let a = table(&[(1,"one",1.0),(2,"two",2.0)]);
        let b = table(&[(1,"uno",1.0),(2,"two",2.5)]);
        let diff = KeyedDiff::compare(&a, &b, "id").unwrap();
        assert_eq!(diff.attribute_modified.len(),1);
        assert_eq!(diff.attribute_modified[0].key,"1");
        assert_eq!(diff.attribute_modified[0].changes,vec![ValueChange {
            column: "name".to_owned(),
            before: "one".to_owned(),
            after: "uno".to_owned()
        }]);
        assert_eq!(diff.geometry_modified,vec!["2".to_owned()]);
    }

    #[test]
    fn test_columns_missing_from_one_table_are_not_compared() {
        let a = table(&[(1,"one",1.0)]);
        let mut b = table(&[(1,"one",1.0)]);
        _ = b.columns.insert("extra".to_owned(), ColumnType::Text);
        _ = b.rows[0].values.insert("extra".to_owned(), AttributeValue::Text("x".to_owned()));
        let diff = KeyedDiff::compare(&a, &b, "id").unwrap();
        assert!(diff.attribute_modified.is_empty());
    }

    #[test]
    fn test_missing_key_and_duplicates() {
        let a = table(&[(1,"one",1.0),(1,"again",2.0)]);
        let b = table(&[(1,"one",1.0)]);
        assert!(KeyedDiff::compare(&a, &b, "code").is_err());
        let diff = KeyedDiff::compare(&a, &b, "id").unwrap();
        assert_eq!(diff.duplicate_keys,vec![("1".to_owned(),"A")]);
        assert!(diff.attribute_modified.is_empty());
    }
}
