//! ネットワーク越しの相手をメモリ上で置き換えるテスト用実装

use crate::chain::{Minted, Minter};
use crate::error::Error;
use crate::prompt::Prompt;
use crate::storage::{Storage, Tag};
use alloy::primitives::{Address, B256};
use anyhow::{Result, bail};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

/// 1バイトあたりの料金（最小単位）
pub const PRICE_PER_BYTE: u128 = 10;

pub fn write_files(dir: &Path, files: &[(&str, usize)]) {
    for (name, size) in files {
        fs::write(dir.join(name), vec![0xab; *size]).unwrap();
    }
}

/// 呼び出し順に `id0`, `id1`, ... を返す
pub struct FakeStorage {
    balance: u128,
    fail_at: Option<usize>,
    calls: Cell<usize>,
    uploads: RefCell<Vec<(Vec<u8>, Vec<Tag>)>>,
    quoted: RefCell<Vec<u64>>,
    funded: RefCell<Vec<u128>>,
}

impl FakeStorage {
    pub fn with_balance(balance: u128) -> Self {
        FakeStorage {
            balance,
            fail_at: None,
            calls: Cell::new(0),
            uploads: RefCell::new(Vec::new()),
            quoted: RefCell::new(Vec::new()),
            funded: RefCell::new(Vec::new()),
        }
    }

    /// 指定した番号（0 始まり）のアップロードを失敗させる
    pub fn failing_at(call: usize) -> Self {
        FakeStorage {
            fail_at: Some(call),
            ..FakeStorage::with_balance(0)
        }
    }

    pub fn uploads(&self) -> Vec<(Vec<u8>, Vec<Tag>)> {
        self.uploads.borrow().clone()
    }

    pub fn quoted(&self) -> Vec<u64> {
        self.quoted.borrow().clone()
    }

    pub fn funded(&self) -> Vec<u128> {
        self.funded.borrow().clone()
    }
}

impl Storage for FakeStorage {
    fn address(&self) -> String {
        "0x0000000000000000000000000000000000000001".to_string()
    }

    async fn upload(&self, data: Vec<u8>, tags: &[Tag]) -> Result<String> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if self.fail_at == Some(call) {
            bail!("node unavailable");
        }
        self.uploads.borrow_mut().push((data, tags.to_vec()));
        Ok(format!("id{call}"))
    }

    async fn price(&self, bytes: u64) -> Result<u128> {
        self.quoted.borrow_mut().push(bytes);
        Ok(bytes as u128 * PRICE_PER_BYTE)
    }

    async fn balance(&self) -> Result<u128> {
        Ok(self.balance)
    }

    async fn fund(&self, amount: u128) -> Result<()> {
        self.funded.borrow_mut().push(amount);
        Ok(())
    }
}

/// 用意した回答を順に返し、質問を記録する
pub struct ScriptedPrompt {
    answers: RefCell<VecDeque<bool>>,
    questions: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[bool]) -> Self {
        ScriptedPrompt {
            answers: RefCell::new(answers.iter().copied().collect()),
            questions: RefCell::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }
}

impl Prompt for ScriptedPrompt {
    async fn confirm(&self, question: &str) -> Result<bool> {
        self.questions.borrow_mut().push(question.to_string());
        match self.answers.borrow_mut().pop_front() {
            Some(answer) => Ok(answer),
            None => bail!("unexpected question {question:?}"),
        }
    }
}

/// 呼び出し順にトークン ID 1, 2, ... を割り当てる
pub struct FakeMinter {
    fail_at: Option<usize>,
    unreadable_at: Option<usize>,
    calls: RefCell<Vec<(Address, String)>>,
}

impl FakeMinter {
    pub fn new() -> Self {
        FakeMinter {
            fail_at: None,
            unreadable_at: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// 指定した番号（0 始まり）のミントを失敗させる
    pub fn failing_at(call: usize) -> Self {
        FakeMinter {
            fail_at: Some(call),
            ..FakeMinter::new()
        }
    }

    /// 指定した番号のミントは確定するがトークン ID を返さない
    pub fn unreadable_at(call: usize) -> Self {
        FakeMinter {
            unreadable_at: Some(call),
            ..FakeMinter::new()
        }
    }

    pub fn calls(&self) -> Vec<(Address, String)> {
        self.calls.borrow().clone()
    }
}

pub fn tx_hash(call: usize) -> String {
    format!("{:#x}", B256::repeat_byte(call as u8))
}

impl Minter for FakeMinter {
    fn signer(&self) -> Address {
        Address::repeat_byte(0x22)
    }

    async fn mint_to(&self, to: Address, uri: &str) -> Result<Minted> {
        let call = {
            let mut calls = self.calls.borrow_mut();
            calls.push((to, uri.to_string()));
            calls.len() - 1
        };
        if self.fail_at == Some(call) {
            return Err(Error::MintCall {
                uri: uri.to_string(),
                reason: "execution reverted".to_string(),
            }
            .into());
        }
        Ok(Minted {
            tx_hash: B256::repeat_byte(call as u8),
            token_id: (self.unreadable_at != Some(call)).then_some(call as u64 + 1),
        })
    }
}
