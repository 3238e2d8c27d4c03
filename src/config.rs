use crate::error::Error;
use crate::metadata::Attribute;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

impl Settings {
    /// `.env` があれば読み込み、環境変数を検証する
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("loaded {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err.into()),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// すべてのキーを検証し、失敗はまとめて返す
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut fields = Fields {
            lookup,
            failures: Vec::new(),
        };

        let storage = StorageSettings::read(&mut fields);
        let private_key = fields.parsed::<PrivateKeySigner>("PRIVATE_KEY");
        let metadata = MetadataSettings::read(&mut fields);
        let paths = PathSettings::read(&mut fields);
        let contract = ContractSettings::read(&mut fields);
        let chain = ChainSettings::read(&mut fields);

        match (storage, private_key, metadata, paths, contract, chain) {
            (Some(storage), Some(signer), Some(metadata), Some(paths), Some(contract), Some(chain))
                if fields.failures.is_empty() =>
            {
                Ok(Settings {
                    storage,
                    signer,
                    metadata,
                    paths,
                    contract,
                    chain,
                })
            }
            _ => Err(Error::Config(fields.failures).into()),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub storage: StorageSettings,
    pub signer: PrivateKeySigner,
    pub metadata: MetadataSettings,
    pub paths: PathSettings,
    pub contract: ContractSettings,
    pub chain: ChainSettings,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("storage", &self.storage)
            .field("signer", &self.signer.address())
            .field("metadata", &self.metadata)
            .field("paths", &self.paths)
            .field("contract", &self.contract)
            .field("chain", &self.chain)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub gateway: Url,
    pub image_mutable: bool,
    pub metadata_mutable: bool,
    pub network: String,
    pub token: String,
    pub provider_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct MetadataSettings {
    pub name: String,
    pub description: String,
    pub external_url: String,
    pub background_color: String,
    pub animation_url: Option<String>,
    pub attributes: Option<Vec<Attribute>>,
}

#[derive(Debug, Clone)]
pub struct PathSettings {
    pub image_dir: PathBuf,
    pub metadata_dir: PathBuf,
    pub accepted_types: AcceptedTypes,
}

#[derive(Debug, Clone)]
pub struct ContractSettings {
    pub address: Address,
    pub kind: ContractKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Erc721,
}

impl FromStr for ContractKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("erc721") {
            Ok(ContractKind::Erc721)
        } else {
            Err(format!("unsupported contract type {s:?}, expected ERC721"))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub id: u64,
    pub name: String,
    pub network: String,
    pub currency: CurrencySettings,
    pub rpc_default: Url,
    pub rpc_public: Url,
    pub explorer: ExplorerSettings,
}

#[derive(Debug, Clone)]
pub struct CurrencySettings {
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Clone)]
pub struct ExplorerSettings {
    pub name: String,
    pub url: Url,
}

/// アップロード対象の拡張子（小文字、先頭のドットなし）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedTypes(Vec<String>);

impl AcceptedTypes {
    pub fn parse(list: &str) -> Self {
        AcceptedTypes(
            list.split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn accepts(&self, path: &Path) -> bool {
        let ext = extension_of(path);
        !ext.is_empty() && self.0.iter().any(|accepted| *accepted == ext)
    }
}

/// ドットなし小文字の拡張子（なければ空文字）
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default()
}

impl StorageSettings {
    fn read<F: Fn(&str) -> Option<String>>(f: &mut Fields<F>) -> Option<Self> {
        let gateway = f.parsed::<Url>("IRYS_GATEWAY");
        let image_mutable = f.flag("IMAGE_MUTABLE");
        let metadata_mutable = f.flag("METADATA_MUTABLE");
        let provider_url = f.optional_parsed::<Url>("IRYS_PROVIDER_URL");
        let network = f.required("IRYS_NETWORK");
        let token = f.required("IRYS_TOKEN");

        // devnet and custom nodes are funded on a chain only the operator knows
        if let (Some(None), Some(network)) = (&provider_url, &network) {
            if !network.trim().eq_ignore_ascii_case("mainnet") {
                f.fail(
                    "IRYS_PROVIDER_URL",
                    format!("required when IRYS_NETWORK is {network:?}"),
                );
            }
        }

        Some(StorageSettings {
            gateway: gateway?,
            image_mutable: image_mutable?,
            metadata_mutable: metadata_mutable?,
            network: network?,
            token: token?,
            provider_url: provider_url?,
        })
    }
}

impl MetadataSettings {
    fn read<F: Fn(&str) -> Option<String>>(f: &mut Fields<F>) -> Option<Self> {
        let name = f.required("NAME");
        let description = f.required("DESCRIPTION");
        let external_url = f.required("EXTERNAL_URL");
        let background_color = f.required("BACKGROUND_COLOR");
        let animation_url = f.optional("ANIMATION_URL");
        let attributes = match f.optional("ATTRIBUTES") {
            None => Some(None),
            Some(json) => match serde_json::from_str::<Vec<Attribute>>(&json) {
                Ok(attributes) => Some(Some(attributes)),
                Err(err) => {
                    f.fail("ATTRIBUTES", format!("not a JSON attribute array: {err}"));
                    None
                }
            },
        };

        Some(MetadataSettings {
            name: name?,
            description: description?,
            external_url: external_url?,
            background_color: background_color?,
            animation_url,
            attributes: attributes?,
        })
    }
}

impl PathSettings {
    fn read<F: Fn(&str) -> Option<String>>(f: &mut Fields<F>) -> Option<Self> {
        let image_dir = f.required("IMAGE_DIR").map(PathBuf::from);
        let metadata_dir = f.required("METADATA_DIR").map(PathBuf::from);
        let accepted_types = match f.required("ACCEPTED_IMAGE_TYPES").map(|s| AcceptedTypes::parse(&s)) {
            Some(types) if types.is_empty() => {
                f.fail("ACCEPTED_IMAGE_TYPES", "no extensions listed".to_string());
                None
            }
            other => other,
        };

        Some(PathSettings {
            image_dir: image_dir?,
            metadata_dir: metadata_dir?,
            accepted_types: accepted_types?,
        })
    }
}

impl ContractSettings {
    fn read<F: Fn(&str) -> Option<String>>(f: &mut Fields<F>) -> Option<Self> {
        let address = f.parsed::<Address>("CONTRACT_ADDRESS");
        let kind = f.parsed::<ContractKind>("CONTRACT_TYPE");

        Some(ContractSettings {
            address: address?,
            kind: kind?,
        })
    }
}

impl ChainSettings {
    fn read<F: Fn(&str) -> Option<String>>(f: &mut Fields<F>) -> Option<Self> {
        let id = f.parsed::<u64>("CHAIN_ID");
        let name = f.required("CHAIN_NAME");
        let network = f.required("CHAIN_NETWORK");
        let decimals = f.parsed::<u8>("CURRENCY_DECIMALS");
        let currency_name = f.required("CURRENCY_NAME");
        let symbol = f.required("CURRENCY_SYMBOL");
        let rpc_default = f.parsed::<Url>("RPC_URL_DEFAULT_HTTP");
        let rpc_public = f.parsed::<Url>("RPC_URL_PUBLIC_HTTP");
        let explorer_name = f.required("BLOCK_EXPLORER_NAME");
        let explorer_url = f.parsed::<Url>("BLOCK_EXPLORER_URL");

        Some(ChainSettings {
            id: id?,
            name: name?,
            network: network?,
            currency: CurrencySettings {
                decimals: decimals?,
                name: currency_name?,
                symbol: symbol?,
            },
            rpc_default: rpc_default?,
            rpc_public: rpc_public?,
            explorer: ExplorerSettings {
                name: explorer_name?,
                url: explorer_url?,
            },
        })
    }
}

/// `lookup` からキーを読み、不正なキーごとに失敗を記録する（最初の失敗で止めない）
struct Fields<F> {
    lookup: F,
    failures: Vec<String>,
}

impl<F: Fn(&str) -> Option<String>> Fields<F> {
    fn fail(&mut self, key: &str, reason: String) {
        self.failures.push(format!("{key}: {reason}"));
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&mut self, key: &str) -> Option<String> {
        let value = self.optional(key);
        if value.is_none() {
            self.fail(key, "missing".to_string());
        }
        value
    }

    fn parsed<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.required(key)?;
        self.parse_value(key, &raw)
    }

    /// 未設定なら `Some(None)`、不正な値なら `None`
    fn optional_parsed<T>(&mut self, key: &str) -> Option<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.optional(key) {
            None => Some(None),
            Some(raw) => self.parse_value(key, &raw).map(Some),
        }
    }

    fn flag(&mut self, key: &str) -> Option<bool> {
        let raw = self.required(key)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            other => {
                self.fail(key, format!("expected true or false, got {other:?}"));
                None
            }
        }
    }

    fn parse_value<T>(&mut self, key: &str, raw: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match raw.trim().parse::<T>() {
            Ok(value) => Some(value),
            Err(err) => {
                self.fail(key, format!("invalid value: {err}"));
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_env() -> std::collections::HashMap<&'static str, String> {
    [
        ("IRYS_GATEWAY", "https://gateway.irys.xyz"),
        ("IMAGE_MUTABLE", "true"),
        ("METADATA_MUTABLE", "false"),
        (
            "PRIVATE_KEY",
            "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
        ),
        ("IRYS_NETWORK", "devnet"),
        ("IRYS_TOKEN", "ethereum"),
        ("IRYS_PROVIDER_URL", "https://rpc.sepolia.org"),
        ("NAME", "Sample"),
        ("DESCRIPTION", "Sample collection"),
        ("EXTERNAL_URL", "https://example.com"),
        ("BACKGROUND_COLOR", "ffffff"),
        ("ATTRIBUTES", r#"[{"trait_type":"Eyes","value":"Blue"},{"trait_type":"Level","value":3}]"#),
        ("IMAGE_DIR", "./images"),
        ("METADATA_DIR", "./metadata"),
        ("ACCEPTED_IMAGE_TYPES", ".png, .JPG"),
        ("CONTRACT_ADDRESS", "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
        ("CONTRACT_TYPE", "ERC721"),
        ("CHAIN_ID", "11155111"),
        ("CHAIN_NAME", "Sepolia"),
        ("CHAIN_NETWORK", "sepolia"),
        ("CURRENCY_DECIMALS", "18"),
        ("CURRENCY_NAME", "Sepolia Ether"),
        ("CURRENCY_SYMBOL", "ETH"),
        ("RPC_URL_DEFAULT_HTTP", "https://rpc.sepolia.org"),
        ("RPC_URL_PUBLIC_HTTP", "https://rpc.sepolia.org"),
        ("BLOCK_EXPLORER_NAME", "Etherscan"),
        ("BLOCK_EXPLORER_URL", "https://sepolia.etherscan.io"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect()
}
