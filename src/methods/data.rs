//! Item data exported by the game-data tools: `{item name: ItemProfile}`.

use super::types::ItemProfile;
use crate::persistence::read_json;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

pub type ItemData = BTreeMap<String, ItemProfile>;

pub fn load_item_data(path: &Path) -> io::Result<ItemData> {
    let data: ItemData = read_json(path)?;
    tracing::debug!(path = %path.display(), items = data.len(), "loaded item data");
    Ok(data)
}

/// Look an item up by exact name, then case-insensitively.
pub fn find_item<'a>(data: &'a ItemData, name: &str) -> Option<&'a ItemProfile> {
    data.get(name).or_else(|| {
        data.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, item)| item)
    })
}
