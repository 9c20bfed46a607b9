use readlist_core::config::ClientConfig;
use readlist_core::models::record::ItemRecord;
use readlist_core::models::Conflict;
use readlist_core::notify::ChangeBus;
use readlist_core::remote::HttpRemoteStore;
use readlist_core::services::ReadingListService;
use readlist_core::{Item, ItemId};
use serde::Serialize;

use crate::error::CliError;

pub type Service = ReadingListService<HttpRemoteStore>;

#[derive(Debug, Serialize)]
pub struct ItemListItem {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub status: String,
    pub rating: u8,
    pub read: usize,
    pub chapters: usize,
    pub total: Option<u32>,
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct ItemDetail {
    pub id: u64,
    #[serde(flatten)]
    pub record: ItemRecord,
}

pub fn remote_store(config: &ClientConfig) -> Result<Option<HttpRemoteStore>, CliError> {
    match &config.remote_url {
        Some(url) => Ok(Some(HttpRemoteStore::new(
            url.clone(),
            config.remote_token.clone(),
        )?)),
        None => Ok(None),
    }
}

pub async fn open_service(config: &ClientConfig) -> Result<Service, CliError> {
    let db_path = config.resolve_db_path()?;
    let remote = remote_store(config)?;
    Ok(ReadingListService::open_path(db_path, remote, ChangeBus::global().clone()).await?)
}

pub async fn require_item(service: &Service, id: ItemId) -> Result<Item, CliError> {
    service.get(id).await?.ok_or(CliError::ItemNotFound(id))
}

pub fn item_to_list_item(item: &Item) -> ItemListItem {
    ItemListItem {
        id: item.id.get(),
        title: item.title.clone(),
        author: item.author.clone(),
        status: item.status.to_string(),
        rating: item.rating,
        read: item.read_count(),
        chapters: item.sub_units.len(),
        total: item.total_sub_units,
        link: item.link_url(),
    }
}

pub fn item_to_detail(item: &Item) -> ItemDetail {
    ItemDetail {
        id: item.id.get(),
        record: item.to_record(),
    }
}

/// Progress as `read/available/total`, `?` for an open-ended total
pub fn format_progress(item: &Item) -> String {
    let total = item
        .total_sub_units
        .map_or_else(|| "?".to_string(), |total| total.to_string());
    format!("{}/{}/{}", item.read_count(), item.sub_units.len(), total)
}

fn display_title(item: &Item) -> &str {
    if item.title.is_empty() {
        "(untitled)"
    } else {
        &item.title
    }
}

pub fn format_item_lines(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let byline = if item.author.is_empty() {
                String::new()
            } else {
                format!(" by {}", item.author)
            };
            format!(
                "{:>10}  {:<8}  {:>9}  {}{}",
                item.id,
                item.status,
                format_progress(item),
                display_title(item),
                byline
            )
        })
        .collect()
}

pub fn format_item_detail(item: &Item) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", display_title(item), item.id),
        format!("Author:   {}", item.author),
        format!("Status:   {}", item.status.upper_text()),
        format!("Rating:   {}", item.rating),
        format!("Progress: {}", format_progress(item)),
        format!("Link:     {}", item.link_url()),
    ];
    if let Some(bookmark) = item.bookmark_url() {
        lines.push(format!("Bookmark: {bookmark}"));
    }

    for sub_unit in &item.sub_units {
        let mark = if sub_unit.is_read() { "x" } else { " " };
        let completed = sub_unit.completed_text().unwrap_or_default();
        let href = sub_unit.href(item.id, false, false);
        lines.push(format!(
            "  [{mark}] {:>4}  {completed:<10}  {href}",
            sub_unit.index
        ));
    }
    lines
}

pub fn format_conflict_lines(conflicts: &[Conflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            let paths = conflict
                .paths
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{:>10}  {}  local: {}/{}  remote: {}/{}",
                conflict.item_id,
                paths,
                conflict.local.status,
                conflict.local.rating,
                conflict.remote.status,
                conflict.remote.rating
            )
        })
        .collect()
}
