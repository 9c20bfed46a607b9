use chrono::Utc;
use readlist_core::config::ClientConfig;
use readlist_core::models::ReadingStatus;
use readlist_core::ItemId;

use crate::commands::common::{format_progress, open_service, require_item};
use crate::error::CliError;

pub async fn run_mark(id: ItemId, index: usize, config: &ClientConfig) -> Result<(), CliError> {
    let service = open_service(config).await?;
    let item = require_item(&service, id).await?;
    if index >= item.sub_units.len() {
        return Err(CliError::ChapterOutOfRange { id, index });
    }

    let now = Utc::now();
    let item = service
        .update_item(id, |item| {
            item.mark_read(index, now);
        })
        .await?;
    println!("Marked chapter {index} of {id} read ({})", format_progress(&item));
    Ok(())
}

pub async fn run_status(
    id: ItemId,
    status: ReadingStatus,
    config: &ClientConfig,
) -> Result<(), CliError> {
    let service = open_service(config).await?;
    require_item(&service, id).await?;
    service.update_item(id, |item| item.status = status).await?;
    println!("{id}: {}", status.upper_text());
    Ok(())
}

pub async fn run_rate(id: ItemId, rating: u8, config: &ClientConfig) -> Result<(), CliError> {
    let service = open_service(config).await?;
    require_item(&service, id).await?;
    service.update_item(id, |item| item.rating = rating).await?;
    println!("{id}: rated {rating}");
    Ok(())
}
