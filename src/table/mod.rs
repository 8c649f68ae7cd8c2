use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FormatResult;

use geojson::Feature;
use geojson::FeatureCollection;
use geojson::Geometry;
use geojson::JsonObject;
use indexmap::IndexMap;

use crate::errors::CommandError;
use crate::utils::extent::Extent;
use crate::utils::text::fold_for_search;

mod fields;

static NULL_VALUE: AttributeValue = AttributeValue::Null;

// columns whose value is shown as the name of a feature in search suggestions, in order of preference.
const LABEL_COLUMNS: [&str;5] = ["name","nombre","Name","NAME","id"];

/// A search match to show while the user is still typing.
#[derive(Clone,Debug,PartialEq,Eq)]
pub(crate) struct SearchSuggestion {
    pub(crate) row: usize,
    pub(crate) label: String,
    /// The matching column and value, when the match wasn't on the label itself.
    pub(crate) context: Option<String>
}

impl Display for SearchSuggestion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match &self.context {
            Some(context) => write!(f,"row {}: {} ({context})",self.row,self.label),
            None => write!(f,"row {}: {}",self.row,self.label)
        }
    }
}

pub(crate) use fields::AttributeValue;
pub(crate) use fields::ColumnType;

#[derive(Clone,Debug,PartialEq)]
pub(crate) struct TableRow {
    pub(crate) geometry: Option<Geometry>,
    pub(crate) values: IndexMap<String,AttributeValue>
}

impl TableRow {

    pub(crate) const fn new(geometry: Option<Geometry>, values: IndexMap<String,AttributeValue>) -> Self {
        Self {
            geometry,
            values
        }
    }

    /// Missing values are treated as null.
    pub(crate) fn value(&self, column: &str) -> &AttributeValue {
        self.values.get(column).unwrap_or(&NULL_VALUE)
    }

    pub(crate) fn to_feature(&self) -> Feature {
        let properties: JsonObject = self.values.iter().map(|(name,value)| (name.clone(),value.to_json())).collect();
        Feature {
            bbox: None,
            geometry: self.geometry.clone(),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }

}

/// A plain attribute table with geometries, as read from a vector file. Columns are kept in source order.
#[derive(Clone,Debug,Default,PartialEq)]
pub(crate) struct AttributeTable {
    pub(crate) columns: IndexMap<String,ColumnType>,
    pub(crate) rows: Vec<TableRow>
}

impl AttributeTable {

    pub(crate) const fn new(columns: IndexMap<String,ColumnType>) -> Self {
        Self {
            columns,
            rows: Vec::new()
        }
    }

    pub(crate) fn push_row(&mut self, row: TableRow) {
        self.rows.push(row)
    }

    pub(crate) fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Only rows that have a geometry become features, the others can't be drawn.
    pub(crate) fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.rows.iter().filter(|row| row.geometry.is_some()).map(TableRow::to_feature).collect(),
            foreign_members: None,
        }
    }

    pub(crate) fn extent(&self) -> Result<Option<Extent>,CommandError> {
        Extent::from_geometries(self.rows.iter().filter_map(|row| row.geometry.as_ref()))
    }

    /// Finds the first row whose value in the column, as text, equals the requested value. Null is matched by "None".
    pub(crate) fn find_first(&self, column: &str, value: &str) -> Result<Option<&TableRow>,CommandError> {
        if !self.has_column(column) {
            return Err(CommandError::UnknownColumn(column.to_owned()))
        }
        Ok(self.rows.iter().find(|row| row.value(column).comparison_text() == value))
    }

    /// Finds the first row where any value contains the query, ignoring case and accents.
    pub(crate) fn search(&self, query: &str) -> Option<&TableRow> {
        let query = fold_for_search(query.trim());
        if query.is_empty() {
            return None
        }
        self.rows.iter().find(|row| {
            row.values.values().any(|value| !value.is_null() && fold_for_search(&value.to_string()).contains(&query))
        })
    }

    /// Lists up to `limit` matching rows. Queries shorter than two characters match too much to be useful, so they give nothing.
    pub(crate) fn suggest(&self, query: &str, limit: usize) -> Vec<SearchSuggestion> {
        let query = fold_for_search(query.trim());
        if query.chars().count() < 2 {
            return Vec::new()
        }
        self.rows.iter().enumerate().filter_map(|(index,row)| {
            let (column,value) = row.values.iter().find(|(_,value)| !value.is_null() && fold_for_search(&value.to_string()).contains(&query))?;
            let label = LABEL_COLUMNS.iter().map(|column| row.value(column)).find(|value| !value.is_null())
                                     .map_or_else(|| "Unnamed feature".to_owned(), ToString::to_string);
            let value = value.to_string();
            Some(SearchSuggestion {
                row: index,
                context: if value == label { None } else { Some(format!("{column}: {value}")) },
                label
            })
        }).take(limit).collect()
    }

}

#[cfg(test)]
mod test {

    use geojson::Geometry;
    use geojson::Value;
    use indexmap::IndexMap;

    use super::AttributeTable;
    use super::AttributeValue;
    use super::ColumnType;
    use super::TableRow;

    fn communes() -> AttributeTable {
        let mut table = AttributeTable::new(IndexMap::from([
            ("code".to_owned(),ColumnType::Integer),
            ("name".to_owned(),ColumnType::Text),
        ]));
        for (code,name,lon) in [(13101,"Santiago",-70.75),(13120,"Ñuñoa",-70.5),(13114,"Las Condes",-70.25)] {
            table.push_row(TableRow::new(
                Some(Geometry::new(Value::Point(vec![lon,-33.5]))),
                IndexMap::from([
                    ("code".to_owned(),AttributeValue::Integer(code)),
                    ("name".to_owned(),AttributeValue::Text(name.to_owned())),
                ])
            ));
        }
        table.push_row(TableRow::new(None,IndexMap::from([
            ("code".to_owned(),AttributeValue::Integer(0)),
        ])));
        table
    }

    #[test]
    fn test_search_ignores_accents_and_case() {
        let table = communes();
        let found = table.search("NUNOA").unwrap();
        assert_eq!(found.value("code"),&AttributeValue::Integer(13120));
        let found = table.search("condes").unwrap();
        assert_eq!(found.value("code"),&AttributeValue::Integer(13114));
        assert!(table.search("valparaiso").is_none());
        assert!(table.search("  ").is_none());
    }

    #[test]
    fn test_suggestions_show_label_and_context() {
        let table = communes();
        let suggestions = table.suggest("nun", 10);
        assert_eq!(suggestions.len(),1);
        assert_eq!(suggestions[0].label,"Ñuñoa");
        assert_eq!(suggestions[0].context,None);
        let suggestions = table.suggest("131", 2);
        assert_eq!(suggestions.len(),2);
        assert_eq!(suggestions[0].label,"Santiago");
        assert_eq!(suggestions[0].context,Some("code: 13101".to_owned()));
        assert!(table.suggest("s", 10).is_empty());
        assert_eq!(suggestions[0].to_string(),"row 0: Santiago (code: 13101)");
    }

    #[test]
    fn test_find_first_by_column() {
        let table = communes();
        let found = table.find_first("code","13101").unwrap().unwrap();
        assert_eq!(found.value("name"),&AttributeValue::Text("Santiago".to_owned()));
        assert!(table.find_first("code","1").unwrap().is_none());
        assert!(table.find_first("region","1").is_err());
        let unnamed = table.find_first("name","None").unwrap().unwrap();
        assert_eq!(unnamed.value("code"),&AttributeValue::Integer(0));
        assert!(table.find_first("name","").unwrap().is_none());
    }

    #[test]
    fn test_rows_without_geometry_are_not_features() {
        let table = communes();
        let collection = table.to_feature_collection();
        assert_eq!(collection.features.len(),3);
        let properties = collection.features[1].properties.as_ref().unwrap();
        assert_eq!(properties.get("name").unwrap(),"Ñuñoa");
    }

    #[test]
    fn test_missing_values_are_null() {
        let table = communes();
        assert_eq!(table.rows[3].value("name"),&AttributeValue::Null);
        let extent = table.extent().unwrap().unwrap();
        assert_eq!(extent.lat_lon_bounds(),[[-33.5,-70.75],[-33.5,-70.25]]);
    }
}
