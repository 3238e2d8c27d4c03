use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// オペレーターへの Yes/No 確認
#[allow(async_fn_in_trait)]
pub trait Prompt {
    async fn confirm(&self, question: &str) -> Result<bool>;
}

/// stdout に質問を出し、stdin から1行読む
pub struct Stdin;

impl Prompt for Stdin {
    async fn confirm(&self, question: &str) -> Result<bool> {
        print!("{question}? Y/n: ");
        std::io::stdout().flush()?;

        let mut answer = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut answer)
            .await?;
        if read == 0 {
            // stdin closed
            return Ok(false);
        }

        Ok(is_yes(&answer))
    }
}

/// `y` か空入力なら Yes
pub fn is_yes(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer == "y" || answer.is_empty()
}
