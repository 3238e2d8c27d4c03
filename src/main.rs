use irys_nft_mint::config::Settings;
use irys_nft_mint::irys::Irys;
use irys_nft_mint::ledger;
use irys_nft_mint::preflight::{Readiness, check_balance};
use irys_nft_mint::prompt::Stdin;
use irys_nft_mint::storage::Storage;
use irys_nft_mint::upload::{UploadPlan, upload_all};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

/// Uploads every image in IMAGE_DIR and a metadata document for it to Irys,
/// then writes the ledger the `mint` command reads.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Upload without comparing the price with the account balance
    #[arg(long)]
    skip_preflight: bool,

    /// Ledger of uploaded metadata URLs
    #[arg(long, default_value = "output.json")]
    ledger: PathBuf,
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
    let storage = Irys::new(&settings)?;
    log::info!("uploading as {}", storage.address());

    if args.skip_preflight {
        log::warn!("skipping the balance check");
    } else {
        let readiness = check_balance(
            &storage,
            &Stdin,
            &settings.paths.image_dir,
            &settings.paths.accepted_types,
            &settings.chain.currency,
        )
        .await
        .context("残高チェックに失敗しました")?;

        match readiness {
            Readiness::Ready => {}
            Readiness::Funded { .. } => {
                println!("Funded. Run again once the node has credited the deposit.");
                return Ok(());
            }
            Readiness::Declined => {
                println!("Not ready, nothing uploaded.");
                return Ok(());
            }
        }
    }

    let plan = UploadPlan::from_settings(&settings);
    let entries = upload_all(&storage, &plan).await?;

    ledger::write(&args.ledger, &entries)
        .with_context(|| format!("台帳の保存に失敗しました: {}", args.ledger.display()))?;

    println!(
        "✅ Uploaded {} image(s), metadata in {}, ledger saved to {}",
        entries.len(),
        plan.metadata_dir.display(),
        args.ledger.display()
    );

    Ok(())
}
