pub(crate) mod export;
pub(crate) mod keyed;
pub(crate) mod schema;

pub(crate) use keyed::KeyedDiff;
pub(crate) use schema::SchemaDiff;
