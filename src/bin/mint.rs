use irys_nft_mint::chain::ChainMinter;
use irys_nft_mint::config::Settings;
use irys_nft_mint::mint::{self, MintJob};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Mints one token per ledger entry by calling `mintTo` on CONTRACT_ADDRESS.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Ledger written by the upload command
    ledger: PathBuf,

    /// Recipient of the tokens [default: the signing account]
    #[arg(long)]
    to: Option<Address>,

    /// Where to record minted token ids
    #[arg(long, default_value = "mintLog.json")]
    log: PathBuf,

    /// Replace a mint log that already lists minted tokens
    #[arg(long)]
    overwrite_log: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    irys_nft_mint::init_logger();

    if let Err(err) = run(Args::parse()).await {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::from_env().context("設定の検証に失敗しました")?;
    let job = MintJob {
        ledger: args.ledger,
        log: args.log,
        to: args.to,
        overwrite_log: args.overwrite_log,
    };

    let report = mint::run(&job, || ChainMinter::connect(&settings)).await?;

    println!(
        "✅ Minted {} token(s) to {}, log saved to {}",
        report.minted.len(),
        report.destination,
        job.log.display()
    );

    Ok(())
}
