use crate::config::{AcceptedTypes, Settings, extension_of};
use crate::error::Error;
use crate::gateway::Gateway;
use crate::ledger::LedgerEntry;
use crate::metadata::NftMetadata;
use crate::storage::{Storage, Tag};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// アップロード処理が設定から必要とするもの
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub image_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub accepted: AcceptedTypes,
    pub gateway: Gateway,
    pub template: NftMetadata,
}

impl UploadPlan {
    pub fn from_settings(settings: &Settings) -> Self {
        UploadPlan {
            image_dir: settings.paths.image_dir.clone(),
            metadata_dir: settings.paths.metadata_dir.clone(),
            accepted: settings.paths.accepted_types.clone(),
            gateway: Gateway::new(
                &settings.storage.gateway,
                settings.storage.image_mutable,
                settings.storage.metadata_mutable,
            ),
            template: NftMetadata::template(&settings.metadata),
        }
    }
}

/// 直下のファイル（シンボリックリンク先を含む）をファイル名順に列挙
/// ディレクトリやリンク切れは警告して飛ばす
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() > 0 => {
                let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                log::warn!("skipping {path}: {err}");
                continue;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("ディレクトリの走査に失敗しました: {}", dir.display()));
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        } else {
            log::warn!("skipping {}: not a regular file", entry.path().display());
        }
    }
    Ok(files)
}

/// 対象画像とそのメタデータをアップロードし、画像ごとに台帳エントリを返す
/// 最初の失敗で中断し、書き出し済みのメタデータはそのまま残す
pub async fn upload_all<S: Storage>(storage: &S, plan: &UploadPlan) -> Result<Vec<LedgerEntry>> {
    fs::create_dir_all(&plan.metadata_dir).with_context(|| {
        format!(
            "メタデータ出力ディレクトリの作成に失敗しました: {}",
            plan.metadata_dir.display()
        )
    })?;

    let mut entries = Vec::new();
    for path in list_files(&plan.image_dir)? {
        if !plan.accepted.accepts(&path) {
            let extension = extension_of(&path);
            log::warn!(
                "skipping {}",
                Error::UnsupportedFileType { path, extension }
            );
            continue;
        }

        entries.push(upload_one(storage, plan, &path).await?);
    }

    Ok(entries)
}

async fn upload_one<S: Storage>(storage: &S, plan: &UploadPlan, path: &Path) -> Result<LedgerEntry> {
    log::info!("uploading {}", path.display());
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let image_id = storage
        .upload_file(path, &[Tag::content_type(mime.essence_str())])
        .await
        .map_err(|source| Error::Upload {
            what: path.display().to_string(),
            source,
        })?;

    let metadata = plan.template.with_image(plan.gateway.image_url(&image_id));
    let metadata_name = format!("{}.json", file_stem(path));

    log::info!("uploading metadata {metadata_name}");
    let json = serde_json::to_vec(&metadata).context("メタデータのJSONシリアライズに失敗しました")?;
    let metadata_id = storage
        .upload(json, &[Tag::content_type("application/json")])
        .await
        .map_err(|source| Error::Upload {
            what: metadata_name.clone(),
            source,
        })?;
    let metadata_url = plan.gateway.metadata_url(&metadata_id);

    let metadata_path = plan.metadata_dir.join(&metadata_name);
    let pretty = serde_json::to_string_pretty(&metadata).context("メタデータのJSONシリアライズに失敗しました")?;
    fs::write(&metadata_path, pretty)
        .with_context(|| format!("メタデータの書き込みに失敗しました: {}", metadata_path.display()))?;

    log::info!("{} -> {}", path.display(), metadata_url);

    Ok(LedgerEntry {
        metadata_name,
        metadata_url,
    })
}

/// パスから拡張子抜きのファイル名を取得
fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
