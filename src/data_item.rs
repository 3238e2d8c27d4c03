//! Irys ノードが `POST /tx` で受け付ける署名付きデータアイテム
//!
//! 署名は Ethereum 形式のみ。target と anchor は常に空。

use crate::storage::Tag;
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256, Sha384};

const SIGNATURE_TYPE_ETHEREUM: u16 = 3;
const SIGNATURE_LENGTH: usize = 65;
const OWNER_LENGTH: usize = 65;

#[derive(Debug, Clone)]
pub struct DataItem {
    pub id: String,
    pub bytes: Vec<u8>,
}

impl DataItem {
    pub fn sign(signer: &PrivateKeySigner, data: &[u8], tags: &[Tag]) -> Result<Self> {
        let owner = owner(signer);
        let tag_bytes = encode_tags(tags);
        let message = signature_hash(&owner, &tag_bytes, data);

        let signature = signer
            .sign_message_sync(&message)
            .context("データアイテムの署名に失敗しました")?
            .as_bytes();

        let mut bytes = Vec::with_capacity(
            2 + SIGNATURE_LENGTH + OWNER_LENGTH + 2 + 16 + tag_bytes.len() + data.len(),
        );
        bytes.extend_from_slice(&SIGNATURE_TYPE_ETHEREUM.to_le_bytes());
        bytes.extend_from_slice(&signature);
        bytes.extend_from_slice(&owner);
        bytes.push(0); // target
        bytes.push(0); // anchor
        bytes.extend_from_slice(&(tags.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&(tag_bytes.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&tag_bytes);
        bytes.extend_from_slice(data);

        Ok(DataItem {
            id: URL_SAFE_NO_PAD.encode(Sha256::digest(signature)),
            bytes,
        })
    }
}

/// 非圧縮の secp256k1 公開鍵
fn owner(signer: &PrivateKeySigner) -> [u8; OWNER_LENGTH] {
    let point = signer
        .credential()
        .verifying_key()
        .as_affine()
        .to_encoded_point(false);
    let mut owner = [0u8; OWNER_LENGTH];
    owner.copy_from_slice(point.as_bytes());
    owner
}

fn signature_hash(owner: &[u8], tag_bytes: &[u8], data: &[u8]) -> [u8; 48] {
    let signature_type = SIGNATURE_TYPE_ETHEREUM.to_string();
    deep_hash(&[
        b"dataitem",
        b"1",
        signature_type.as_bytes(),
        owner,
        &[],
        &[],
        tag_bytes,
        data,
    ])
}

fn deep_hash(chunks: &[&[u8]]) -> [u8; 48] {
    let mut acc = digest384(&Sha384::digest(format!("list{}", chunks.len())));
    for chunk in chunks {
        let mut hasher = Sha384::new();
        hasher.update(acc);
        hasher.update(deep_hash_blob(chunk));
        acc = digest384(&hasher.finalize());
    }
    acc
}

fn deep_hash_blob(blob: &[u8]) -> [u8; 48] {
    let mut hasher = Sha384::new();
    hasher.update(Sha384::digest(format!("blob{}", blob.len())));
    hasher.update(Sha384::digest(blob));
    digest384(&hasher.finalize())
}

fn digest384(digest: &[u8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    out.copy_from_slice(digest);
    out
}

/// `{name: bytes, value: bytes}` の Avro 配列（タグなしなら空）
fn encode_tags(tags: &[Tag]) -> Vec<u8> {
    let mut out = Vec::new();
    if tags.is_empty() {
        return out;
    }
    write_long(&mut out, tags.len() as i64);
    for tag in tags {
        write_bytes(&mut out, tag.name.as_bytes());
        write_bytes(&mut out, tag.value.as_bytes());
    }
    write_long(&mut out, 0);
    out
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_long(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

fn write_long(out: &mut Vec<u8>, n: i64) {
    let mut z = ((n << 1) ^ (n >> 63)) as u64;
    while z >= 0x80 {
        out.push((z & 0x7f) as u8 | 0x80);
        z >>= 7;
    }
    out.push(z as u8);
}
