use crate::config::Settings;
use crate::error::Error;
use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, B256, LogData, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use anyhow::{Context, Result, anyhow, bail};
use url::Url;

sol! {
    #[sol(rpc)]
    interface Erc721Mintable {
        function mintTo(address to, string uri) external;
    }
}

/// 確定したミント。レシートからトークン ID が読めなかった場合 `token_id` は `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Minted {
    pub tx_hash: B256,
    pub token_id: Option<u64>,
}

/// 1回の呼び出しで1トークンをミントし、確定まで待つ
#[allow(async_fn_in_trait)]
pub trait Minter {
    /// ミントトランザクションに署名するアカウント
    fn signer(&self) -> Address;

    async fn mint_to(&self, to: Address, uri: &str) -> Result<Minted>;
}

pub struct ChainMinter {
    contract: Erc721Mintable::Erc721MintableInstance<DynProvider>,
    signer: Address,
    explorer: Url,
}

impl ChainMinter {
    /// デフォルト RPC に接続し、設定どおりのチェーンかを確認する
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let chain = &settings.chain;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(settings.signer.clone()))
            .connect_http(chain.rpc_default.clone())
            .erased();

        let remote_id = provider
            .get_chain_id()
            .await
            .with_context(|| format!("RPC に接続できません: {}", chain.rpc_default))?;
        if remote_id != chain.id {
            bail!(
                "{} のチェーン ID は {remote_id} ですが、{} ({}) は {} です",
                chain.rpc_default,
                chain.name,
                chain.network,
                chain.id
            );
        }

        log::info!(
            "connected to {} ({}), paying in {} ({}); public rpc {}",
            chain.name,
            chain.id,
            chain.currency.name,
            chain.currency.symbol,
            chain.rpc_public
        );
        log::info!(
            "minting through {:?} contract {}, transactions on {} ({})",
            settings.contract.kind,
            settings.contract.address,
            chain.explorer.name,
            chain.explorer.url
        );

        Ok(ChainMinter {
            contract: Erc721Mintable::new(settings.contract.address, provider),
            signer: settings.signer.address(),
            explorer: chain.explorer.url.clone(),
        })
    }

    fn tx_link(&self, hash: B256) -> String {
        let base = self.explorer.as_str().trim_end_matches('/');
        format!("{base}/tx/{hash:#x}")
    }
}

impl Minter for ChainMinter {
    fn signer(&self) -> Address {
        self.signer
    }

    async fn mint_to(&self, to: Address, uri: &str) -> Result<Minted> {
        let failed = |reason: String| Error::MintCall {
            uri: uri.to_string(),
            reason,
        };

        let pending = self
            .contract
            .mintTo(to, uri.to_string())
            .send()
            .await
            .map_err(|err| failed(format!("transaction rejected: {err}")))?;
        log::info!("sent {}", self.tx_link(*pending.tx_hash()));

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|err| failed(format!("no receipt: {err}")))?;
        if !receipt.status() {
            return Err(failed(format!("{} reverted", self.tx_link(receipt.transaction_hash))).into());
        }

        let decoded = match receipt.inner.logs().first() {
            Some(entry) => token_id_from_log(entry.data()),
            None => Err(anyhow!("レシートにログがありません")),
        };
        let token_id = match decoded {
            Ok(id) => Some(id),
            Err(err) => {
                log::warn!("{}: {err:#}", self.tx_link(receipt.transaction_hash));
                None
            }
        };

        Ok(Minted {
            tx_hash: receipt.transaction_hash,
            token_id,
        })
    }
}

/// 最初のログからトークン ID を取り出す
/// data が空なら ERC-721 `Transfer` の indexed `tokenId` トピックを使う
pub fn token_id_from_log(log: &LogData) -> Result<u64> {
    match log.topics() {
        [_, _, _, token_id] if log.data.is_empty() => token_id_from_log_data(token_id.as_slice()),
        _ => token_id_from_log_data(&log.data),
    }
}

/// ログの data をビッグエンディアンの整数として読む
pub fn token_id_from_log_data(data: &[u8]) -> Result<u64> {
    if data.is_empty() {
        bail!("最初のログに data がありません");
    }
    let value = U256::try_from_be_slice(data)
        .with_context(|| format!("ログの data が {} バイトあり、トークン ID として長すぎます", data.len()))?;
    u64::try_from(value)
        .ok()
        .with_context(|| format!("トークン ID {value} が 64 ビットに収まりません"))
}
