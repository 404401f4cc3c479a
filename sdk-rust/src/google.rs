mod api;
mod model;

pub use model::{GoogleModel, GoogleModelOptions, DEFAULT_GOOGLE_BASE_URL};
