//! Command line front end for the brainstorming core.
//!
//! ```text
//! cargo run --example brainstorm -- set-key AIza...
//! cargo run --example brainstorm -- show-key
//! cargo run --example brainstorm -- "new ways to raise team productivity"
//! ```
//!
//! The key is kept in `$IDEABOARD_STORE` (default `.ideaboard/store.json`).
//! When no key is stored, `GOOGLE_API_KEY` is used instead. `IDEABOARD_LOCALE`
//! selects the idea language (`ja` or `en`).

use dotenvy::dotenv;
use ideaboard::{
    store::FileStore, CredentialProvider, CredentialStore, GoogleModelFactoryOptions, IdeaError,
    IdeaGenerator, Locale, StaticCredential,
};
use std::{env, process::ExitCode, sync::Arc};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let store_path =
        env::var("IDEABOARD_STORE").unwrap_or_else(|_| ".ideaboard/store.json".to_string());
    let credentials = Arc::new(CredentialStore::new(Arc::new(FileStore::new(store_path))));

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("set-key") => {
            let key = args.get(1).cloned().unwrap_or_default();
            if let Err(error) = credentials.set(key) {
                eprintln!("Could not save the API key: {error}");
                return ExitCode::FAILURE;
            }
            println!("Saved API key: {}", credentials.masked());
            ExitCode::SUCCESS
        }
        Some("show-key") => {
            if credentials.is_set() {
                println!("Current API key: {}", credentials.masked());
            } else {
                println!("No API key configured.");
            }
            ExitCode::SUCCESS
        }
        Some(_) => generate(credentials, &args.join(" ")).await,
        None => {
            eprintln!("usage: brainstorm <topic> | set-key <key> | show-key");
            ExitCode::FAILURE
        }
    }
}

async fn generate(credentials: Arc<CredentialStore>, topic: &str) -> ExitCode {
    let provider: Arc<dyn CredentialProvider> = match env::var("GOOGLE_API_KEY") {
        Ok(key) if !credentials.is_set() => Arc::new(StaticCredential::new(key)),
        _ => credentials,
    };
    let locale = env::var("IDEABOARD_LOCALE")
        .ok()
        .and_then(|tag| Locale::from_tag(&tag))
        .unwrap_or_default();

    let generator =
        IdeaGenerator::google(provider, GoogleModelFactoryOptions::default()).with_locale(locale);

    match generator.generate(topic).await {
        Ok(ideas) => {
            for (index, idea) in ideas.iter().enumerate() {
                println!("{}. {}", index + 1, idea.title);
                if !idea.description.is_empty() {
                    println!("   {}", idea.description);
                }
                if !idea.tags.is_empty() {
                    println!("   #{}", idea.tags.join(" #"));
                }
            }
            ExitCode::SUCCESS
        }
        Err(IdeaError::Auth) => {
            eprintln!("{}. Run `brainstorm set-key <key>` first.", IdeaError::Auth);
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("{error}. Please try again.");
            ExitCode::FAILURE
        }
    }
}
