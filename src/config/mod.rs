pub mod types;
pub mod catalog;
pub mod validator;

pub use types::*;
pub use catalog::*;
pub use validator::*;
