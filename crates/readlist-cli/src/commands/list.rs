use readlist_core::config::ClientConfig;
use readlist_core::models::ReadingStatus;
use readlist_core::Item;

use crate::commands::common::{format_item_lines, item_to_list_item, open_service, ItemListItem};
use crate::error::CliError;

pub async fn run_list(
    status: Option<ReadingStatus>,
    as_json: bool,
    config: &ClientConfig,
) -> Result<(), CliError> {
    let service = open_service(config).await?;
    let items = service
        .list()
        .await?
        .into_values()
        .filter(|item| status.map_or_else(|| item.is_in_list(), |status| item.status == status))
        .collect::<Vec<Item>>();

    if as_json {
        let json_items = items
            .iter()
            .map(item_to_list_item)
            .collect::<Vec<ItemListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if items.is_empty() {
        println!("No items tracked.");
    } else {
        for line in format_item_lines(&items) {
            println!("{line}");
        }
    }

    Ok(())
}
