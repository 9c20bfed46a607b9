use readlist_core::config::ClientConfig;
use readlist_core::ItemId;

use crate::commands::common::{format_item_detail, item_to_detail, open_service, require_item};
use crate::error::CliError;

pub async fn run_show(id: ItemId, as_json: bool, config: &ClientConfig) -> Result<(), CliError> {
    let service = open_service(config).await?;
    let item = require_item(&service, id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&item_to_detail(&item))?);
    } else {
        for line in format_item_detail(&item) {
            println!("{line}");
        }
    }
    Ok(())
}
