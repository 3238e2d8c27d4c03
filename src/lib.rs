pub mod chain;
pub mod config;
pub mod data_item;
pub mod error;
pub mod gateway;
pub mod irys;
pub mod ledger;
pub mod metadata;
pub mod mint;
pub mod preflight;
pub mod prompt;
pub mod storage;
pub mod upload;

#[cfg(test)]
mod testing;

/// `RUST_LOG` の指定がなければ `info` 以上を stderr に出す
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
