mod client_utils;
mod errors;
pub mod google;
mod language_model;
pub mod mock;
mod opentelemetry;
mod types;
mod types_ext;

pub use errors::*;
pub use language_model::LanguageModel;
pub use types::*;
