use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FormatResult;

use gdal::vector::FieldValue;
use gdal::vector::OGRFieldType;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::errors::CommandError;

// -2^63 and 2^63, the range of reals that convert to i64 exactly. The upper bound is exclusive.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// The declared type of an attribute column.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,Serialize,Deserialize,JsonSchema)]
pub(crate) enum ColumnType {
    Text,
    Integer,
    Real,
    Boolean
}

impl ColumnType {

    pub(crate) const fn storage_type(self) -> OGRFieldType::Type {
        match self {
            Self::Text => OGRFieldType::OFTString,
            Self::Integer => OGRFieldType::OFTInteger64,
            Self::Real => OGRFieldType::OFTReal,
            // shapefiles have no boolean, so these are stored as 0 or 1
            Self::Boolean => OGRFieldType::OFTInteger,
        }
    }

    /// Booleans are stored as integers, so they are read back as integers. The selection column is recognized by name instead.
    pub(crate) const fn from_storage_type(field_type: OGRFieldType::Type) -> Self {
        match field_type {
            OGRFieldType::OFTInteger | OGRFieldType::OFTInteger64 => Self::Integer,
            OGRFieldType::OFTReal => Self::Real,
            _ => Self::Text
        }
    }

    /// The value a new row gets for this column when the source didn't supply one.
    pub(crate) const fn default_value(self) -> AttributeValue {
        match self {
            Self::Boolean => AttributeValue::Boolean(false),
            Self::Text | Self::Integer | Self::Real => AttributeValue::Null
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            Self::Text => write!(f,"text"),
            Self::Integer => write!(f,"integer"),
            Self::Real => write!(f,"real"),
            Self::Boolean => write!(f,"boolean"),
        }
    }
}

/// A single cell in an attribute table. In JSON these are written as plain values, `null` for Null.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize,JsonSchema)]
#[serde(untagged)]
pub(crate) enum AttributeValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String)
}

impl AttributeValue {

    pub(crate) fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(value) => Self::Boolean(*value),
            JsonValue::Number(number) => if let Some(integer) = number.as_i64() {
                Self::Integer(integer)
            } else if let Some(real) = number.as_f64() {
                Self::Real(real)
            } else {
                // u64 values above i64::MAX
                Self::Text(number.to_string())
            },
            JsonValue::String(text) => Self::Text(text.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => Self::Text(value.to_string())
        }
    }

    pub(crate) fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Boolean(value) => JsonValue::Bool(*value),
            Self::Integer(value) => JsonValue::from(*value),
            Self::Real(value) => serde_json::Number::from_f64(*value).map_or(JsonValue::Null, JsonValue::Number),
            Self::Text(value) => JsonValue::String(value.clone()),
        }
    }

    pub(crate) const fn is_null(&self) -> bool {
        matches!(self,Self::Null)
    }

    /// The column type a new column should get when this is the first value seen for it.
    pub(crate) const fn inferred_type(&self) -> ColumnType {
        match self {
            Self::Null | Self::Text(_) => ColumnType::Text,
            Self::Boolean(_) => ColumnType::Boolean,
            Self::Integer(_) => ColumnType::Integer,
            Self::Real(_) => ColumnType::Real,
        }
    }

    /// Truthiness used for the selection flag. Anything that isn't clearly "on" is false.
    pub(crate) fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(value) => *value,
            Self::Integer(value) => *value != 0,
            Self::Real(value) => *value != 0.0 && !value.is_nan(),
            Self::Text(value) => matches!(value.trim().to_lowercase().as_str(),"true" | "1" | "yes" | "y" | "t")
        }
    }

    /// Converts the value to one that can be stored in a column of the specified type.
    pub(crate) fn coerce(self, column: &str, column_type: ColumnType) -> Result<Self,CommandError> {
        let invalid = |value: &Self| CommandError::InvalidValueForColumn(column.to_owned(),column_type,value.to_string());
        match (column_type,self) {
            (_,Self::Null) => Ok(Self::Null),
            (ColumnType::Text,value) => Ok(Self::Text(value.to_string())),
            (ColumnType::Integer,Self::Integer(value)) => Ok(Self::Integer(value)),
            (ColumnType::Integer,Self::Boolean(value)) => Ok(Self::Integer(value.into())),
            (ColumnType::Integer,Self::Real(value)) => if value.is_finite() && value.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(&value) {
                #[allow(clippy::cast_possible_truncation)] // whole and in range
                Ok(Self::Integer(value as i64))
            } else {
                Err(invalid(&Self::Real(value)))
            },
            (ColumnType::Integer,Self::Text(value)) => match value.trim() {
                "" => Ok(Self::Null),
                trimmed => trimmed.parse().map(Self::Integer).map_err(|_| invalid(&Self::Text(value.clone())))
            },
            (ColumnType::Real,Self::Real(value)) => Ok(Self::Real(value)),
            (ColumnType::Real,Self::Integer(value)) => Ok(Self::Real(value as f64)),
            (ColumnType::Real,Self::Boolean(value)) => Ok(Self::Real(f64::from(u8::from(value)))),
            (ColumnType::Real,Self::Text(value)) => match value.trim() {
                "" => Ok(Self::Null),
                trimmed => trimmed.parse().map(Self::Real).map_err(|_| invalid(&Self::Text(value.clone())))
            },
            (ColumnType::Boolean,Self::Boolean(value)) => Ok(Self::Boolean(value)),
            (ColumnType::Boolean,Self::Integer(value)) => Ok(Self::Boolean(value != 0)),
            (ColumnType::Boolean,Self::Real(value)) => Ok(Self::Boolean(value != 0.0)),
            (ColumnType::Boolean,Self::Text(value)) => match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "y" | "t" => Ok(Self::Boolean(true)),
                "false" | "0" | "no" | "n" | "f" => Ok(Self::Boolean(false)),
                "" => Ok(Self::Null),
                _ => Err(invalid(&Self::Text(value.clone())))
            }
        }
    }

    /// The string used when comparing values between two tables. Unlike Display, null is distinguishable from an empty string.
    pub(crate) fn comparison_text(&self) -> String {
        match self {
            Self::Null => "None".to_owned(),
            value => value.to_string()
        }
    }
}

impl From<FieldValue> for AttributeValue {

    fn from(value: FieldValue) -> Self {
        fn join<Item: ToString>(items: &[Item]) -> String {
            items.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
        }

        match value {
            FieldValue::IntegerValue(value) => Self::Integer(value.into()),
            FieldValue::Integer64Value(value) => Self::Integer(value),
            FieldValue::RealValue(value) => Self::Real(value),
            FieldValue::StringValue(value) => Self::Text(value),
            FieldValue::IntegerListValue(values) => Self::Text(join(&values)),
            FieldValue::Integer64ListValue(values) => Self::Text(join(&values)),
            FieldValue::RealListValue(values) => Self::Text(join(&values)),
            FieldValue::StringListValue(values) => Self::Text(values.join(",")),
            FieldValue::DateValue(value) => Self::Text(value.to_string()),
            FieldValue::DateTimeValue(value) => Self::Text(value.to_rfc3339()),
            #[allow(unreachable_patterns)] // in case gdal adds more
            other => Self::Text(format!("{other:?}"))
        }
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            Self::Null => Ok(()),
            Self::Boolean(value) => write!(f,"{}",value),
            Self::Integer(value) => write!(f,"{}",value),
            Self::Real(value) => write!(f,"{}",value),
            Self::Text(value) => write!(f,"{}",value),
        }
    }
}

#[cfg(test)]
mod test {

    use serde_json::json;

    use super::AttributeValue;
    use super::ColumnType;

    #[test]
    fn test_values_from_json() {
        assert_eq!(AttributeValue::from_json(&json!(null)),AttributeValue::Null);
        assert_eq!(AttributeValue::from_json(&json!(3)),AttributeValue::Integer(3));
        assert_eq!(AttributeValue::from_json(&json!(3.5)),AttributeValue::Real(3.5));
        assert_eq!(AttributeValue::from_json(&json!("x")),AttributeValue::Text("x".to_owned()));
        assert_eq!(AttributeValue::from_json(&json!([1,2])),AttributeValue::Text("[1,2]".to_owned()));
    }

    #[test]
    fn test_coerce_to_column_type() {
        assert_eq!(AttributeValue::Text(" 42 ".to_owned()).coerce("n",ColumnType::Integer).unwrap(),AttributeValue::Integer(42));
        assert_eq!(AttributeValue::Integer(2).coerce("n",ColumnType::Real).unwrap(),AttributeValue::Real(2.0));
        assert_eq!(AttributeValue::Real(2.0).coerce("n",ColumnType::Integer).unwrap(),AttributeValue::Integer(2));
        assert_eq!(AttributeValue::Text("true".to_owned()).coerce("n",ColumnType::Boolean).unwrap(),AttributeValue::Boolean(true));
        assert_eq!(AttributeValue::Integer(7).coerce("n",ColumnType::Text).unwrap(),AttributeValue::Text("7".to_owned()));
        assert_eq!(AttributeValue::Null.coerce("n",ColumnType::Boolean).unwrap(),AttributeValue::Null);
        assert!(AttributeValue::Real(2.5).coerce("n",ColumnType::Integer).is_err());
        assert!(AttributeValue::Real(1e20).coerce("n",ColumnType::Integer).is_err());
        assert!(AttributeValue::Real(f64::NAN).coerce("n",ColumnType::Integer).is_err());
        assert!(AttributeValue::Real(9_223_372_036_854_775_808.0).coerce("n",ColumnType::Integer).is_err());
        assert_eq!(AttributeValue::Real(-9_223_372_036_854_775_808.0).coerce("n",ColumnType::Integer).unwrap(),AttributeValue::Integer(i64::MIN));
        assert!(AttributeValue::Text("abc".to_owned()).coerce("n",ColumnType::Real).is_err());
    }

    #[test]
    fn test_booleans_are_stored_as_integers() {
        assert_eq!(ColumnType::from_storage_type(ColumnType::Boolean.storage_type()),ColumnType::Integer);
        assert_eq!(ColumnType::from_storage_type(ColumnType::Real.storage_type()),ColumnType::Real);
        assert_eq!(ColumnType::from_storage_type(ColumnType::Text.storage_type()),ColumnType::Text);
    }

    #[test]
    fn test_comparison_text_keeps_null_apart() {
        assert_eq!(AttributeValue::Null.to_string(),"");
        assert_eq!(AttributeValue::Null.comparison_text(),"None");
        assert_ne!(AttributeValue::Null.comparison_text(),AttributeValue::Text(String::new()).comparison_text());
    }

    #[test]
    fn test_untagged_json_values() {
        let values: Vec<AttributeValue> = serde_json::from_str(r#"[null,true,1,1.5,"a"]"#).unwrap();
        assert_eq!(values,vec![
            AttributeValue::Null,
            AttributeValue::Boolean(true),
            AttributeValue::Integer(1),
            AttributeValue::Real(1.5),
            AttributeValue::Text("a".to_owned())
        ]);
    }

    #[test]
    fn test_truthiness() {
        assert!(AttributeValue::Text("True".to_owned()).is_truthy());
        assert!(AttributeValue::Integer(1).is_truthy());
        assert!(!AttributeValue::Null.is_truthy());
        assert!(!AttributeValue::Text("maybe".to_owned()).is_truthy());
    }
}
