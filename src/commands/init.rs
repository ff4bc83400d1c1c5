use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the tickets home directory, its history subdirectory and an initial `config.json`.
///
/// # Arguments
/// - `tickets_home` - The directory that will hold the configuration, e.g. `$HOME/tickets`
/// - `api_base_url` - The address of the classification service, e.g. `http://localhost:8000/`
///
/// # Errors
/// - Returns an error if any file operations fail or the URL cannot be parsed.
pub async fn init(tickets_home: &Path, api_base_url: &str) -> Result<Out<()>> {
    let config = Config::create(tickets_home, api_base_url).await?;
    Ok(format!(
        "Successfully created the tickets directory, using the service at {}",
        config.api_base_url()
    )
    .into())
}
