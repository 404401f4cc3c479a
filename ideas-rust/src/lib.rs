mod credential;
mod errors;
mod generator;
mod opentelemetry;
pub mod prompt;
pub mod store;
mod task;
mod types;

pub use credential::{mask, CredentialProvider, CredentialStore, StaticCredential, CREDENTIAL_KEY};
pub use errors::{GenerationFailure, IdeaError};
pub use generator::{
    GoogleModelFactory, GoogleModelFactoryOptions, IdeaGenerator, ModelFactory, DEFAULT_MODEL_ID,
};
pub use task::GenerationTask;
pub use types::*;
