use std::path::PathBuf;
use thiserror::Error;

/// パイプラインが返す失敗の種類
///
/// `anyhow::Error` に包んで返すので、種類は `downcast_ref::<Error>()` で取り出す
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {}", .0.join("; "))]
    Config(Vec<String>),

    #[error("unsupported file type {extension:?}: {path}")]
    UnsupportedFileType { path: PathBuf, extension: String },

    #[error("upload failed for {what}")]
    Upload {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("ledger {path} is unreadable")]
    Ledger {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid metadataUrl in entry {name:?}: {url:?}")]
    InvalidMetadataUrl { name: String, url: String },

    #[error("mint of {uri} failed: {reason}")]
    MintCall { uri: String, reason: String },
}
