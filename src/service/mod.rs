//! IsudService: generic insert/select/update/delete over registry record types.

mod isud;
mod validation;
pub use isud::{parse_id, require_filters, IsudService, Selection, UpdateOutcome};
pub use validation::{json_inputs, RawInput, RequestValidator};
