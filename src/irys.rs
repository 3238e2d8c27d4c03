use crate::config::Settings;
use crate::data_item::DataItem;
use crate::storage::{Storage, Tag};
use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

const MAINNET_NODE: &str = "https://node1.irys.xyz/";
const DEVNET_NODE: &str = "https://devnet.irys.xyz/";

/// EVM トークンで支払う Irys ノードクライアント
pub struct Irys {
    http: reqwest::Client,
    node: Url,
    token: String,
    signer: PrivateKeySigner,
    funding_rpc: Url,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: Value,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    addresses: HashMap<String, String>,
}

impl Irys {
    pub fn new(settings: &Settings) -> Result<Self> {
        let node = node_url(&settings.storage.network)?;
        // only mainnet may leave IRYS_PROVIDER_URL unset
        let funding_rpc = settings
            .storage
            .provider_url
            .clone()
            .unwrap_or_else(|| settings.chain.rpc_default.clone());

        log::debug!("irys node {node}, token {}", settings.storage.token);

        Ok(Irys {
            http: reqwest::Client::new(),
            node,
            token: settings.storage.token.clone(),
            signer: settings.signer.clone(),
            funding_rpc,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.node
            .join(path)
            .with_context(|| format!("ノードのエンドポイントが不正です: {path}"))
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        log::debug!("GET {url}");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("リクエストに失敗しました: {url}"))?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            bail!("{url} returned {status}: {body}");
        }
        Ok(body)
    }
}

impl Storage for Irys {
    fn address(&self) -> String {
        self.signer.address().to_checksum(None)
    }

    async fn upload(&self, data: Vec<u8>, tags: &[Tag]) -> Result<String> {
        let item = DataItem::sign(&self.signer, &data, tags)?;
        let url = self.endpoint(&format!("tx/{}", self.token))?;

        log::debug!("POST {url} ({} bytes, item {})", item.bytes.len(), item.id);
        let response = self
            .http
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(item.bytes)
            .send()
            .await
            .with_context(|| format!("リクエストに失敗しました: {url}"))?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            bail!("{url} returned {status}: {body}");
        }

        let receipt: UploadResponse = serde_json::from_str(&body)
            .with_context(|| format!("想定外のアップロード応答: {body}"))?;
        if receipt.id != item.id {
            log::warn!("node returned id {} for item {}", receipt.id, item.id);
        }
        Ok(receipt.id)
    }

    async fn price(&self, bytes: u64) -> Result<u128> {
        let url = self.endpoint(&format!("price/{}/{}", self.token, bytes))?;
        let body = self.get_text(url).await?;
        body.trim()
            .parse()
            .with_context(|| format!("想定外の料金応答: {body}"))
    }

    async fn balance(&self) -> Result<u128> {
        let mut url = self.endpoint(&format!("account/balance/{}", self.token))?;
        url.query_pairs_mut().append_pair("address", &self.address());
        let body = self.get_text(url).await?;
        let response: BalanceResponse = serde_json::from_str(&body)
            .with_context(|| format!("想定外の残高応答: {body}"))?;
        atomic(&response.balance)
    }

    async fn fund(&self, amount: u128) -> Result<()> {
        let body = self.get_text(self.endpoint("info")?).await?;
        let info: InfoResponse = serde_json::from_str(&body)
            .with_context(|| format!("想定外の info 応答: {body}"))?;
        let deposit: Address = info
            .addresses
            .get(&self.token)
            .ok_or_else(|| anyhow!("{} の入金先アドレスがノードにありません", self.token))?
            .parse()
            .context("ノードが返した入金先アドレスが不正です")?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .connect_http(self.funding_rpc.clone());

        log::info!("transferring {amount} to {deposit}");
        let tx = TransactionRequest::default()
            .with_to(deposit)
            .with_value(U256::from(amount));
        let receipt = provider
            .send_transaction(tx)
            .await
            .context("入金トランザクションが拒否されました")?
            .get_receipt()
            .await
            .context("入金トランザクションが確定しませんでした")?;
        if !receipt.status() {
            bail!("入金トランザクション {} が revert しました", receipt.transaction_hash);
        }

        let tx_id = format!("{:#x}", receipt.transaction_hash);
        let url = self.endpoint(&format!("account/balance/{}", self.token))?;
        log::debug!("POST {url} tx_id={tx_id}");
        let response = self
            .http
            .post(url.clone())
            .json(&serde_json::json!({ "tx_id": tx_id }))
            .send()
            .await
            .with_context(|| format!("リクエストに失敗しました: {url}"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("ノードが入金トランザクション {tx_id} を受け付けませんでした: {status} {body}");
        }

        Ok(())
    }
}

/// ネットワーク名からノードの URL を決める（URL ならそのまま使う）
fn node_url(network: &str) -> Result<Url> {
    let network = network.trim();
    let url = match network.to_ascii_lowercase().as_str() {
        "mainnet" => MAINNET_NODE.to_string(),
        "devnet" => DEVNET_NODE.to_string(),
        _ if network.ends_with('/') => network.to_string(),
        _ => format!("{network}/"),
    };
    Url::parse(&url).with_context(|| format!("不明な Irys ネットワークです: {network:?}"))
}

fn atomic(value: &Value) -> Result<u128> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => bail!("想定外の金額: {other}"),
    };
    text.parse()
        .with_context(|| format!("金額 {text:?} が整数ではありません"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn network_names() {
        assert_eq!(node_url("mainnet").unwrap().as_str(), MAINNET_NODE);
        assert_eq!(node_url("Devnet").unwrap().as_str(), DEVNET_NODE);
        assert_eq!(
            node_url("https://node2.irys.xyz").unwrap().as_str(),
            "https://node2.irys.xyz/"
        );
        assert!(node_url("testnet").is_err());
    }

    #[test]
    fn endpoints_join_under_node() {
        let node = node_url("https://example.com/irys").unwrap();
        assert_eq!(
            node.join("price/ethereum/10").unwrap().as_str(),
            "https://example.com/irys/price/ethereum/10"
        );
    }

    #[test]
    fn amounts_as_string_or_number() {
        assert_eq!(atomic(&json!("340282366920938463463374607431768211455")).unwrap(), u128::MAX);
        assert_eq!(atomic(&json!(12345)).unwrap(), 12345);
        assert!(atomic(&json!(1.5)).is_err());
        assert!(atomic(&json!(null)).is_err());
    }
}
