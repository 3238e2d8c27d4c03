use crate::error::Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

/// アップロード済みメタデータ1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub metadata_name: String,
    pub metadata_url: String,
}

/// 確定したミント1件
/// トークン ID が読めなかった場合 `tokenId` は `null` だが、`txHash` から辿れる
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintLogEntry {
    pub destination_address: String,
    pub metadata_url: String,
    pub token_id: Option<u64>,
    pub tx_hash: String,
}

pub fn read(path: &Path) -> Result<Vec<LedgerEntry>> {
    let parse = || -> Result<Vec<LedgerEntry>> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    };
    parse().map_err(|source| {
        Error::Ledger {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// `entries` を整形済み JSON 配列として `path` に書き出す（上書き）
pub fn write<T: Serialize>(path: &Path, entries: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries).context("JSONシリアライズに失敗しました")?;
    fs::write(path, json).with_context(|| format!("書き込みに失敗しました: {}", path.display()))
}

/// ミント前に全エントリが絶対 URL を持つことを確認する
pub fn validate(entries: &[LedgerEntry]) -> Result<()> {
    for entry in entries {
        if entry.metadata_url.is_empty() || Url::parse(&entry.metadata_url).is_err() {
            return Err(Error::InvalidMetadataUrl {
                name: entry.metadata_name.clone(),
                url: entry.metadata_url.clone(),
            }
            .into());
        }
    }
    Ok(())
}
