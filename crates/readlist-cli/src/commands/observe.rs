use readlist_core::config::ClientConfig;
use readlist_core::models::StructuralSnapshot;
use readlist_core::ItemId;

use crate::commands::common::{format_progress, open_service};
use crate::error::CliError;

pub async fn run_observe(
    id: ItemId,
    title: &str,
    authors: &[String],
    chapters: &str,
    config: &ClientConfig,
) -> Result<(), CliError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CliError::EmptyTitle);
    }

    let authors = authors
        .iter()
        .map(|author| author.trim())
        .filter(|author| !author.is_empty())
        .collect::<Vec<_>>();
    let snapshot = StructuralSnapshot::from_listing(id, title, &authors, chapters)?;

    let service = open_service(config).await?;
    let outcome = service.observe(&snapshot).await?;
    if outcome.changed {
        println!("Updated {id} ({})", format_progress(&outcome.item));
    } else {
        println!("No changes for {id}");
    }
    Ok(())
}
