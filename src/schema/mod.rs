//! Schema metadata: type descriptions, the schema model and its builder.

pub mod meta;
pub mod model;
