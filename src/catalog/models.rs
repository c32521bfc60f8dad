use super::error::CatalogError;
use crate::store::Item;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A music record as stored in the catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(rename = "music_id")]
    pub item_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i64,
    /// Stored cover reference. When absent the key is derived from the artist.
    #[serde(rename = "img_url", default, skip_serializing_if = "Option::is_none")]
    pub asset_key: Option<String>,
}

/// Cover image key derived from an artist name: whitespace removed, lowercased, `.jpg`.
pub fn asset_key_for_artist(artist: &str) -> String {
    let mut key: String = artist
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    key.push_str(".jpg");
    key
}

impl CatalogItem {
    pub fn from_item(item: &Item) -> Result<Self, CatalogError> {
        serde_json::from_value(Value::Object(item.clone())).map_err(|err| {
            let id = item
                .get("music_id")
                .and_then(Value::as_str)
                .unwrap_or("<unknown>");
            CatalogError::MalformedRecord(format!("catalog item {}: {}", id, err))
        })
    }

    pub fn to_item(&self) -> Item {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Item::new(),
        }
    }

    pub fn resolved_asset_key(&self) -> String {
        match &self.asset_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => asset_key_for_artist(&self.artist),
        }
    }
}

/// Row of the subscription join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionLink {
    pub principal_id: String,
    pub item_id: String,
}

impl SubscriptionLink {
    pub fn new(principal_id: &str, item_id: &str) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            item_id: item_id.to_string(),
        }
    }

    /// Row key: the pair as a JSON array, so no separator can be forged
    /// from inside either component.
    pub fn key(&self) -> String {
        Value::Array(vec![
            Value::from(self.principal_id.as_str()),
            Value::from(self.item_id.as_str()),
        ])
        .to_string()
    }

    pub fn from_item(item: &Item) -> Result<Self, CatalogError> {
        serde_json::from_value(Value::Object(item.clone()))
            .map_err(|err| CatalogError::MalformedRecord(format!("subscription row: {}", err)))
    }

    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert("principal_id".to_string(), Value::from(self.principal_id.clone()));
        item.insert("item_id".to_string(), Value::from(self.item_id.clone()));
        item
    }
}

/// A catalog record joined with its cover image, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseItem {
    #[serde(rename = "music_id")]
    pub item_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: i64,
    /// Base64 image payload, `null` when the cover could not be fetched.
    #[serde(rename = "img_url")]
    pub image_data: Option<String>,
}

impl ResponseItem {
    pub fn new(item: CatalogItem, image_data: Option<String>) -> Self {
        Self {
            item_id: item.item_id,
            title: item.title,
            artist: item.artist,
            album: item.album,
            year: item.year,
            image_data,
        }
    }
}
