//! HTTP handlers for the generic table operations and registry metadata.

pub mod isud;
pub mod meta;
