use readlist_core::config::ClientConfig;
use readlist_core::ItemId;

use crate::commands::common::open_service;
use crate::error::CliError;

pub async fn run_remove(id: ItemId, config: &ClientConfig) -> Result<(), CliError> {
    let service = open_service(config).await?;
    if !service.remove(id).await? {
        return Err(CliError::ItemNotFound(id));
    }

    println!("Removed {id}");
    Ok(())
}
