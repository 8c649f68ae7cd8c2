pub(crate) mod color;
pub(crate) mod extent;
pub(crate) mod random;
pub(crate) mod text;
