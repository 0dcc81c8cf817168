//! Synthetic wallet stores and disk images.

#![allow(dead_code)]

use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use vaultscan::vaultscan_core::{double_sha256, ByteWriter};
use vaultscan::vaultscan_crypto::{compress, derive_key, derive_pubkey};
use vaultscan::vaultscan_scanner::{KEY_MARKERS, POST_KEY_MARKERS};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

pub const PASSPHRASE: &str = "correct horse battery staple";
pub const SALT: [u8; 8] = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x11, 0x22, 0x33];
pub const ITERATIONS: u32 = 40;
pub const MASTER: [u8; 32] = [0x77; 32];

pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; plaintext.len() + 16];
    buf[..plaintext.len()].copy_from_slice(plaintext);
    let len = Aes256CbcEnc::new_from_slices(key, iv)
        .unwrap()
        .encrypt_padded_mut::<Pkcs7>(&mut buf, plaintext.len())
        .unwrap()
        .len();
    buf.truncate(len);
    buf
}

pub fn scalar(n: u8) -> [u8; 32] {
    let mut k = [0u8; 32];
    k[1] = 0x5c;
    k[31] = n;
    k
}

pub fn compressed_pubkey(private_key: &[u8; 32]) -> Vec<u8> {
    compress(&derive_pubkey(private_key).unwrap()).unwrap().to_vec()
}

fn record(tag: &str, key_tail: &[u8], value: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut key = ByteWriter::new();
    key.write_string(tag.as_bytes()).write_bytes(key_tail);
    (key.into_inner(), value.to_vec())
}

pub fn version() -> (Vec<u8>, Vec<u8>) {
    let mut v = ByteWriter::new();
    v.write_u32(60000);
    record("version", &[], v.as_slice())
}

pub fn mkey() -> (Vec<u8>, Vec<u8>) {
    let derived = derive_key(PASSPHRASE.as_bytes(), &SALT, ITERATIONS, 64).unwrap();
    let mut k = ByteWriter::new();
    k.write_u32(1);
    let mut v = ByteWriter::new();
    v.write_string(&encrypt(&derived.cipher_key(), &derived.iv(), &MASTER))
        .write_string(&SALT)
        .write_u32(0)
        .write_u32(ITERATIONS)
        .write_string(&[]);
    record("mkey", k.as_slice(), v.as_slice())
}

pub fn ckey(private_key: &[u8; 32]) -> (Vec<u8>, Vec<u8>) {
    let pubkey = compressed_pubkey(private_key);
    let iv = double_sha256(&pubkey);
    let mut k = ByteWriter::new();
    k.write_string(&pubkey);
    let mut v = ByteWriter::new();
    v.write_string(&encrypt(&MASTER, &iv[..16], private_key));
    record("ckey", k.as_slice(), v.as_slice())
}

pub fn name(address: &str, label: &str) -> (Vec<u8>, Vec<u8>) {
    let mut k = ByteWriter::new();
    k.write_string(address.as_bytes());
    let mut v = ByteWriter::new();
    v.write_string(label.as_bytes());
    record("name", k.as_slice(), v.as_slice())
}

pub fn setting_bool(name: &str, flag: bool) -> (Vec<u8>, Vec<u8>) {
    let mut k = ByteWriter::new();
    k.write_string(name.as_bytes());
    let mut v = ByteWriter::new();
    v.write_bool(flag);
    record("setting", k.as_slice(), v.as_slice())
}

/// An encrypted wallet holding `scalar(1)` and `scalar(2)`, with a damaged
/// record and a foreign record mixed in.
pub fn encrypted_store() -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut damaged = ckey(&scalar(9));
    damaged.1.truncate(5);
    vec![
        version(),
        ckey(&scalar(1)),
        damaged,
        setting_bool("fUseCompression", true),
        record("zz_unknown", &[], &[1, 2, 3]),
        ckey(&scalar(2)),
        mkey(),
    ]
}

/// Disk image with `keys` planted as compressed-form DER containers.
pub fn disk_image(size: usize, keys: &[(usize, [u8; 32])]) -> Vec<u8> {
    let mut image = vec![0u8; size];
    for (offset, key) in keys {
        let mut bytes = KEY_MARKERS[1].prefix.to_vec();
        bytes.extend_from_slice(key);
        bytes.extend_from_slice(&POST_KEY_MARKERS[1]);
        image[*offset..*offset + bytes.len()].copy_from_slice(&bytes);
    }
    image
}
