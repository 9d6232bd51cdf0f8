//! Search results and the payload validator

mod payload;
mod search_result;
mod validator;

pub use search_result::SearchResult;
pub use validator::validate;
