use anyhow::{Context, Result};
use std::path::Path;

/// アップロードに付ける `name: value` タグ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Tag {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn content_type(value: impl Into<String>) -> Self {
        Tag::new("Content-Type", value)
    }
}

/// アップロードを受け付ける分散ストレージのアカウント
/// 金額はトークンの最小単位で扱う
#[allow(async_fn_in_trait)]
pub trait Storage {
    /// 入金先アカウントのアドレス
    fn address(&self) -> String;

    /// `data` をアップロードしてコンテンツ ID を返す
    async fn upload(&self, data: Vec<u8>, tags: &[Tag]) -> Result<String>;

    async fn price(&self, bytes: u64) -> Result<u128>;

    async fn balance(&self) -> Result<u128>;

    async fn fund(&self, amount: u128) -> Result<()>;

    async fn upload_file(&self, path: &Path, tags: &[Tag]) -> Result<String> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("ファイルの読み込みに失敗しました: {}", path.display()))?;
        self.upload(data, tags).await
    }
}

/// 最小単位の金額をトークン単位で表示する
/// 例: 18 桁で `1500000000000000000` は `1.5`
pub fn from_atomic(amount: u128, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}
