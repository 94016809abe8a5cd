use std::io::{Error, ErrorKind, Result};

use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::{core::settings::Settings, i18n::Translations, server::start_server};

mod core {
    pub mod data;
    #[cfg(test)]
    pub mod fake;
    pub mod settings;
    pub mod sync;
}
mod i18n;
mod render;
mod server;
mod types;

#[actix_web::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::load().map_err(|error| {
        error!(%error, "Settings load error");
        Error::new(ErrorKind::InvalidInput, error)
    })?;
    let translations = Translations::load().map_err(|error| {
        error!(%error, "Language bundle load error");
        Error::new(ErrorKind::InvalidData, error)
    })?;

    start_server(settings, translations).await
}
