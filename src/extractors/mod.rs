//! Request extractors.

pub mod payload;
pub use payload::{InsertPayload, UploadedFile};
