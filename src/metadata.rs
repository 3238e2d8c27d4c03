use crate::config::MetadataSettings;
use serde::{Deserialize, Serialize};

/// 画像ごとにアップロードする NFT メタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<Attribute>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Number(serde_json::Number),
}

impl NftMetadata {
    /// コレクション共通のフィールドから雛形を作る（`image` は空、`attributes` は最低でも空配列）
    pub fn template(settings: &MetadataSettings) -> Self {
        NftMetadata {
            name: settings.name.clone(),
            description: settings.description.clone(),
            image: String::new(),
            external_url: Some(settings.external_url.clone()),
            background_color: Some(settings.background_color.clone()),
            animation_url: settings.animation_url.clone(),
            attributes: Some(settings.attributes.clone().unwrap_or_default()),
        }
    }

    pub fn with_image(&self, image: impl Into<String>) -> Self {
        NftMetadata {
            image: image.into(),
            ..self.clone()
        }
    }
}
