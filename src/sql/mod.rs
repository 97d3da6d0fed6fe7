//! Parameterized SQL for record types: identifiers come from the registry, values are always bound.

mod builder;
pub mod params;

pub use builder::*;
pub use params::PgBindValue;
