use crate::config::{AcceptedTypes, CurrencySettings};
use crate::prompt::Prompt;
use crate::storage::{Storage, from_atomic};
use crate::upload::list_files;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 残高チェックの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// 不足分を入金済み。ノードに反映されてから再実行する
    Funded { amount: u128 },
    Declined,
}

/// アップロード対象になるファイル（アップロード順）
pub fn eligible_images(dir: &Path, accepted: &AcceptedTypes) -> Result<Vec<PathBuf>> {
    Ok(list_files(dir)?
        .into_iter()
        .filter(|path| accepted.accepts(path))
        .collect())
}

/// 対象画像すべてのアップロード料金と残高を比べ、続行するかオペレーターに確認する
pub async fn check_balance<S: Storage, P: Prompt>(
    storage: &S,
    prompt: &P,
    dir: &Path,
    accepted: &AcceptedTypes,
    currency: &CurrencySettings,
) -> Result<Readiness> {
    let images = eligible_images(dir, accepted)?;
    let mut total_bytes = 0u64;
    for image in &images {
        total_bytes += fs::metadata(image)
            .with_context(|| format!("ファイル情報の取得に失敗しました: {}", image.display()))?
            .len();
    }

    let price = storage
        .price(total_bytes)
        .await
        .with_context(|| format!("{total_bytes} バイト分の料金取得に失敗しました"))?;
    let balance = storage
        .balance()
        .await
        .with_context(|| format!("残高の取得に失敗しました: {}", storage.address()))?;

    let show = |amount: u128| {
        format!(
            "{} {} ({} atomic)",
            from_atomic(amount, currency.decimals),
            currency.symbol,
            amount
        )
    };

    log::info!(
        "{} image(s), {} bytes: price {}, balance {}",
        images.len(),
        total_bytes,
        show(price),
        show(balance)
    );

    if price > balance {
        let deficit = price - balance;
        log::warn!("insufficient balance, short by {}", show(deficit));

        if !prompt.confirm(&format!("Fund {}", show(deficit))).await? {
            return Ok(Readiness::Declined);
        }

        storage
            .fund(deficit)
            .await
            .with_context(|| format!("入金に失敗しました: {}", show(deficit)))?;
        log::info!("funded {}", show(deficit));
        return Ok(Readiness::Funded { amount: deficit });
    }

    if prompt
        .confirm(&format!("Upload {} image(s) for {}", images.len(), show(price)))
        .await?
    {
        Ok(Readiness::Ready)
    } else {
        Ok(Readiness::Declined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeStorage, ScriptedPrompt, write_files};
    use pretty_assertions::assert_eq;

    fn currency() -> CurrencySettings {
        CurrencySettings {
            decimals: 18,
            name: "Ether".into(),
            symbol: "ETH".into(),
        }
    }

    fn accepted() -> AcceptedTypes {
        AcceptedTypes::parse(".png,.jpg")
    }

    #[test]
    fn only_accepted_files_are_eligible() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("b.png", 3), ("a.jpg", 2), ("notes.txt", 100)]);

        let names: Vec<_> = eligible_images(dir.path(), &accepted())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.jpg", "b.png"]);
    }

    #[tokio::test]
    async fn price_counts_only_uploaded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.png", 10), ("b.jpg", 5), ("skip.txt", 1000)]);
        let storage = FakeStorage::with_balance(1_000);
        let prompt = ScriptedPrompt::new(&[true]);

        let readiness = check_balance(&storage, &prompt, dir.path(), &accepted(), &currency())
            .await
            .unwrap();

        assert_eq!(readiness, Readiness::Ready);
        assert_eq!(storage.quoted(), vec![15]);
        assert!(storage.funded().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_images_are_priced() {
        let source = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_files(source.path(), &[("real.png", 7)]);
        write_files(dir.path(), &[("b.png", 3)]);
        std::os::unix::fs::symlink(source.path().join("real.png"), dir.path().join("a.png")).unwrap();
        let storage = FakeStorage::with_balance(1_000);
        let prompt = ScriptedPrompt::new(&[true]);

        check_balance(&storage, &prompt, dir.path(), &accepted(), &currency())
            .await
            .unwrap();

        assert_eq!(storage.quoted(), vec![10]);
    }

    #[tokio::test]
    async fn operator_can_decline_when_funded() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.png", 10)]);
        let storage = FakeStorage::with_balance(1_000);
        let prompt = ScriptedPrompt::new(&[false]);

        let readiness = check_balance(&storage, &prompt, dir.path(), &accepted(), &currency())
            .await
            .unwrap();

        assert_eq!(readiness, Readiness::Declined);
    }

    #[tokio::test]
    async fn deficit_is_funded_exactly() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.png", 40), ("b.png", 60)]);
        // price is 10 per byte
        let storage = FakeStorage::with_balance(250);
        let prompt = ScriptedPrompt::new(&[true]);

        let readiness = check_balance(&storage, &prompt, dir.path(), &accepted(), &currency())
            .await
            .unwrap();

        assert_eq!(readiness, Readiness::Funded { amount: 750 });
        assert_eq!(storage.funded(), vec![750]);
        assert!(prompt.questions()[0].starts_with("Fund 0.00000000000000075 ETH"));
    }

    #[tokio::test]
    async fn declined_funding_moves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.png", 40)]);
        let storage = FakeStorage::with_balance(0);
        let prompt = ScriptedPrompt::new(&[false]);

        let readiness = check_balance(&storage, &prompt, dir.path(), &accepted(), &currency())
            .await
            .unwrap();

        assert_eq!(readiness, Readiness::Declined);
        assert!(storage.funded().is_empty());
    }

    #[tokio::test]
    async fn exact_balance_is_enough() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &[("a.png", 40)]);
        let storage = FakeStorage::with_balance(400);
        let prompt = ScriptedPrompt::new(&[true]);

        let readiness = check_balance(&storage, &prompt, dir.path(), &accepted(), &currency())
            .await
            .unwrap();

        assert_eq!(readiness, Readiness::Ready);
        assert!(prompt.questions()[0].starts_with("Upload 1 image(s)"));
    }
}
