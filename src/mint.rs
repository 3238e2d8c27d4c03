use crate::chain::{Minted, Minter};
use crate::error::Error;
use crate::ledger::{self, LedgerEntry, MintLogEntry};
use alloy::primitives::Address;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

/// ミント処理1回分の指定
#[derive(Debug, Clone)]
pub struct MintJob {
    pub ledger: PathBuf,
    pub log: PathBuf,
    /// 受取先（`None` なら署名アカウント）
    pub to: Option<Address>,
    pub overwrite_log: bool,
}

#[derive(Debug)]
pub struct MintReport {
    pub destination: Address,
    pub minted: Vec<MintLogEntry>,
}

/// 台帳とログの出力先を確認してから接続し、ミントする
///
/// `connect` は台帳が正しいと分かってから呼ぶ
pub async fn run<M, F, Fut>(job: &MintJob, connect: F) -> Result<MintReport>
where
    M: Minter,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<M>>,
{
    let entries = load_ledger(&job.ledger)
        .with_context(|| format!("{} からはミントしません", job.ledger.display()))?;
    check_log_target(&job.log, job.overwrite_log)?;

    let minter = connect().await?;
    let destination = job.to.unwrap_or_else(|| minter.signer());
    let minted = mint_all(&minter, &entries, destination, &job.log).await?;

    Ok(MintReport {
        destination,
        minted,
    })
}

/// チェーンに触れる前に台帳を読み、全 `metadataUrl` を検証する
pub fn load_ledger(path: &Path) -> Result<Vec<LedgerEntry>> {
    let entries = ledger::read(path)?;
    ledger::validate(&entries)?;
    log::info!("all {} metadata entries are valid", entries.len());
    Ok(entries)
}

/// ミント済みトークンを記録したログは上書きしない
pub fn check_log_target(path: &Path, overwrite: bool) -> Result<()> {
    if overwrite || !path.exists() {
        return Ok(());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("ミントログの読み込みに失敗しました: {}", path.display()))?;
    match serde_json::from_str::<Vec<MintLogEntry>>(&text) {
        Ok(entries) if entries.is_empty() => Ok(()),
        Ok(entries) => bail!(
            "{} には既に {} 件のミント記録があります。退避するか --overwrite-log を指定してください",
            path.display(),
            entries.len()
        ),
        Err(_) => bail!(
            "{} は空のミントログではありません。退避するか --overwrite-log を指定してください",
            path.display()
        ),
    }
}

/// 台帳の順に全エントリを `destination` へミントする
///
/// ミントが確定するたびに `log_path` を書き直すので、途中で失敗してもチェーン上の
/// トークンはすべてログに残る。トークン ID が読めないミントは `null` で記録して中断する。
pub async fn mint_all<M: Minter>(
    minter: &M,
    entries: &[LedgerEntry],
    destination: Address,
    log_path: &Path,
) -> Result<Vec<MintLogEntry>> {
    let destination_address = destination.to_checksum(None);
    let mut minted: Vec<MintLogEntry> = Vec::with_capacity(entries.len());
    ledger::write(log_path, &minted)?;

    for (index, entry) in entries.iter().enumerate() {
        log::info!(
            "[{}/{}] minting {} to {}",
            index + 1,
            entries.len(),
            entry.metadata_url,
            destination_address
        );

        let Minted { tx_hash, token_id } = minter.mint_to(destination, &entry.metadata_url).await?;

        minted.push(MintLogEntry {
            destination_address: destination_address.clone(),
            metadata_url: entry.metadata_url.clone(),
            token_id,
            tx_hash: format!("{tx_hash:#x}"),
        });
        ledger::write(log_path, &minted)?;

        match token_id {
            Some(id) => log::info!("token {id} minted in {tx_hash:#x}"),
            None => {
                return Err(Error::MintCall {
                    uri: entry.metadata_url.clone(),
                    reason: format!("minted in {tx_hash:#x}, but the receipt has no readable token id"),
                }
                .into());
            }
        }
    }

    Ok(minted)
}
