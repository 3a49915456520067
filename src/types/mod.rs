//! Built-in types shipped with every schema.

pub mod scalars;
