//! Wire-level payloads returned by the remote catalog and their normalized
//! in-memory form.
//!
//! The remote API is inconsistent about list-shaped fields: depending on
//! the endpoint and embed options, platforms/genres/developers/publishers
//! arrive as a `{"data": [...]}` envelope, a bare array of objects, a bare
//! array of strings, or a single string. Everything is coerced to
//! `Vec<String>` before leaving this module.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Envelope wrapping every remote collection response.
#[derive(Debug, Deserialize)]
pub struct GamesEnvelope {
    /// The records themselves.
    #[serde(default)]
    pub data: Vec<RawGame>,
}

/// One game record as returned by the remote API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGame {
    /// Remote identifier; the deduplication key.
    pub id: String,
    /// Localized name variants.
    #[serde(default)]
    pub names: Option<RawNames>,
    /// Short URL-friendly identifier.
    #[serde(default)]
    pub abbreviation: Option<String>,
    /// Whether the entry is a romhack/extension rather than an official
    /// release.
    #[serde(default)]
    pub romhack: Option<bool>,
    /// Cover/logo/background art.
    #[serde(default)]
    pub assets: Option<RawAssets>,
    /// Platforms, in any of the four remote shapes.
    #[serde(default, deserialize_with = "coerce_name_list")]
    pub platforms: Vec<String>,
    /// Genres, in any of the four remote shapes.
    #[serde(default, deserialize_with = "coerce_name_list")]
    pub genres: Vec<String>,
    /// Developers, in any of the four remote shapes.
    #[serde(default, deserialize_with = "coerce_name_list")]
    pub developers: Vec<String>,
    /// Publishers, in any of the four remote shapes.
    #[serde(default, deserialize_with = "coerce_name_list")]
    pub publishers: Vec<String>,
    /// Related-resource links; the count doubles as a popularity proxy.
    #[serde(default)]
    pub links: Vec<Value>,
}

/// Localized names of a game.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNames {
    /// The international (usually English) name.
    #[serde(default)]
    pub international: Option<String>,
}

/// Asset block of a game record.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAssets {
    /// Large cover art.
    #[serde(default, rename = "cover-large")]
    pub cover_large: Option<RawAsset>,
    /// Logo art.
    #[serde(default)]
    pub logo: Option<RawAsset>,
    /// Background art.
    #[serde(default)]
    pub background: Option<RawAsset>,
}

/// A single asset entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAsset {
    /// Absolute URI of the asset.
    #[serde(default)]
    pub uri: Option<String>,
}

/// Normalized view of one catalog entry, the aggregator's working unit.
/// Constructed per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteGame {
    /// Remote identifier; two records sharing it are the same entity.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short URL-friendly identifier.
    pub abbreviation: String,
    /// Cover art URI.
    pub cover_uri: Option<String>,
    /// Logo art URI.
    pub logo_uri: Option<String>,
    /// Background art URI.
    pub background_uri: Option<String>,
    /// Platform names.
    pub platforms: Vec<String>,
    /// Genre names.
    pub genres: Vec<String>,
    /// Developer names.
    pub developers: Vec<String>,
    /// Publisher names.
    pub publishers: Vec<String>,
    /// Number of related-resource links (popularity proxy).
    pub link_count: usize,
    /// Whether the entry is a romhack/extension.
    pub romhack: bool,
}

impl RawGame {
    /// Normalize a raw record, rejecting entries without a usable name.
    pub fn normalize(self) -> Option<RemoteGame> {
        let name = self.names.and_then(|names| names.international)?;
        let assets = self.assets;
        let asset_uri = |pick: fn(&RawAssets) -> Option<&RawAsset>| {
            assets
                .as_ref()
                .and_then(pick)
                .and_then(|asset| asset.uri.clone())
        };

        Some(RemoteGame {
            id: self.id,
            name,
            abbreviation: self.abbreviation.unwrap_or_default(),
            cover_uri: asset_uri(|a| a.cover_large.as_ref()),
            logo_uri: asset_uri(|a| a.logo.as_ref()),
            background_uri: asset_uri(|a| a.background.as_ref()),
            platforms: self.platforms,
            genres: self.genres,
            developers: self.developers,
            publishers: self.publishers,
            link_count: self.links.len(),
            romhack: self.romhack.unwrap_or(false),
        })
    }
}

/// Coerce any of the remote list shapes into a flat list of names.
fn coerce_name_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flatten_name_list(value))
}

fn flatten_name_list(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(single) => vec![single],
        Value::Array(items) => items.into_iter().filter_map(entry_name).collect(),
        Value::Object(mut object) => match object.remove("data") {
            Some(inner) => flatten_name_list(inner),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Extract a display name from one list entry (a bare string, or an object
/// with a `name` field).
fn entry_name(value: Value) -> Option<String> {
    match value {
        Value::String(name) => Some(name),
        Value::Object(object) => match object.get("name") {
            Some(Value::String(name)) => Some(name.clone()),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> RawGame {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn coerces_data_envelope_shape() {
        let game = parse(json!({
            "id": "abc",
            "names": {"international": "Celeste"},
            "platforms": {"data": [{"id": "p1", "name": "PC"}, {"id": "p2", "name": "Switch"}]}
        }));
        assert_eq!(game.platforms, vec!["PC", "Switch"]);
    }

    #[test]
    fn coerces_bare_object_array_shape() {
        let game = parse(json!({
            "id": "abc",
            "genres": [{"id": "g1", "name": "Platformer"}]
        }));
        assert_eq!(game.genres, vec!["Platformer"]);
    }

    #[test]
    fn coerces_string_array_and_single_string_shapes() {
        let game = parse(json!({
            "id": "abc",
            "developers": ["Matt Makes Games"],
            "publishers": "Matt Makes Games"
        }));
        assert_eq!(game.developers, vec!["Matt Makes Games"]);
        assert_eq!(game.publishers, vec!["Matt Makes Games"]);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let game = parse(json!({"id": "abc"}));
        assert!(game.platforms.is_empty());
        assert!(game.genres.is_empty());
        assert!(game.links.is_empty());
    }

    #[test]
    fn normalize_requires_an_international_name() {
        let nameless = parse(json!({"id": "abc"}));
        assert!(nameless.normalize().is_none());

        let named = parse(json!({
            "id": "abc",
            "names": {"international": "Celeste"},
            "abbreviation": "celeste",
            "romhack": false,
            "assets": {"cover-large": {"uri": "https://img/cover.png"}},
            "links": [{}, {}, {}]
        }));
        let game = named.normalize().unwrap();
        assert_eq!(game.name, "Celeste");
        assert_eq!(game.cover_uri.as_deref(), Some("https://img/cover.png"));
        assert_eq!(game.link_count, 3);
        assert!(!game.romhack);
    }
}
