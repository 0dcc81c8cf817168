//! Wallet export in JSON, CSV and plain-text report form.
//!
//! All three formats list keys sorted by address. Booleans and missing
//! values are rendered `True` / `False` / `None` in CSV and text output so
//! existing tooling that reads those dumps keeps working.

use crate::error::{Result, WalletError};
use crate::record::SettingValue;
use crate::snapshot::{DecryptStatus, KeyEntry, Statistics, WalletSnapshot};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::path::Path;
use std::str::FromStr;
use vaultscan_core::{script_address, NetworkParams};

/// CSV header row
pub const CSV_HEADER: &str = "Address,Private Key,Compressed,Encrypted";

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON document
    Json,
    /// One CSV row per key
    Csv,
    /// Human-readable report
    Text,
}

impl FromStr for ExportFormat {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "txt" | "text" => Ok(ExportFormat::Text),
            other => Err(WalletError::Export(format!(
                "unsupported export format: {}",
                other
            ))),
        }
    }
}

/// Where a snapshot came from and when it is being exported.
#[derive(Debug, Clone)]
pub struct ExportContext {
    /// Wallet file name shown in the report
    pub wallet_file: String,
    /// Network used for WIF and addresses
    pub params: NetworkParams,
    /// Export timestamp
    pub generated_at: DateTime<Utc>,
}

impl ExportContext {
    /// Context stamped with the current time.
    pub fn new(wallet_file: impl Into<String>, params: NetworkParams) -> Self {
        ExportContext {
            wallet_file: wallet_file.into(),
            params,
            generated_at: Utc::now(),
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    fn timestamp(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

#[derive(Serialize)]
struct ExportMasterKey {
    id: u32,
    salt: String,
    iterations: u32,
    method: u32,
}

#[derive(Serialize)]
struct ExportMetadata {
    wallet_file: String,
    network: &'static str,
    encrypted: bool,
    version: Option<u32>,
    generated_at: String,
    master_key: Option<ExportMasterKey>,
}

#[derive(Serialize)]
struct ExportKey {
    address: String,
    private_key: String,
    wif: Option<String>,
    public_key: String,
    compressed: bool,
    encrypted: bool,
    encrypted_private_key: Option<String>,
    decryption_status: DecryptStatus,
    pubkey_matches: Option<bool>,
    taproot_address: Option<String>,
    label: Option<String>,
}

#[derive(Serialize)]
struct ExportInput {
    prev_txid: String,
    prev_index: u32,
    sequence: u32,
}

#[derive(Serialize)]
struct ExportOutput {
    value: i64,
    script_pubkey: String,
}

#[derive(Serialize)]
struct ExportTransaction {
    txid: String,
    version: i32,
    lock_time: u32,
    segwit: bool,
    total_output_value: Option<i64>,
    inputs: Vec<ExportInput>,
    outputs: Vec<ExportOutput>,
}

#[derive(Serialize)]
struct ExportScript {
    address: String,
    script_hash: String,
    script: String,
}

#[derive(Serialize)]
struct ExportDocument {
    metadata: ExportMetadata,
    statistics: Statistics,
    keys: Vec<ExportKey>,
    transactions: Vec<ExportTransaction>,
    scripts: Vec<ExportScript>,
    settings: BTreeMap<String, serde_json::Value>,
}

fn sorted_keys(snapshot: &WalletSnapshot) -> Vec<&KeyEntry> {
    let mut keys: Vec<&KeyEntry> = snapshot.keys.iter().collect();
    keys.sort_by(|a, b| a.address.cmp(&b.address));
    keys
}

fn setting_json(value: &SettingValue) -> serde_json::Value {
    match value {
        SettingValue::Bool(b) => serde_json::Value::from(*b),
        SettingValue::Fee(n) => serde_json::Value::from(*n),
        SettingValue::Int(n) => serde_json::Value::from(*n),
        SettingValue::Address(addr) => serde_json::Value::from(format!("{}:{}", addr.ip, addr.port)),
        SettingValue::Raw(bytes) => serde_json::Value::from(hex::encode(bytes)),
    }
}

fn build_document(snapshot: &WalletSnapshot, ctx: &ExportContext) -> ExportDocument {
    let keys = sorted_keys(snapshot)
        .into_iter()
        .map(|k| ExportKey {
            address: k.address.clone(),
            private_key: k.private_key_display(),
            wif: k.material.as_ref().map(|m| m.wif(&ctx.params)),
            public_key: hex::encode(&k.public_key),
            compressed: k.compressed,
            encrypted: k.is_encrypted(),
            encrypted_private_key: k.encrypted_private_key.as_ref().map(hex::encode),
            decryption_status: k.status.clone(),
            pubkey_matches: k.material.as_ref().map(|m| m.matches_record),
            taproot_address: k.material.as_ref().and_then(|m| m.taproot_address.clone()),
            label: snapshot.names.get(&k.address).cloned(),
        })
        .collect();

    let transactions = snapshot
        .transactions
        .iter()
        .map(|tx| ExportTransaction {
            txid: tx.txid_hex(),
            version: tx.version,
            lock_time: tx.lock_time,
            segwit: tx.is_segwit(),
            total_output_value: tx.total_output_value(),
            inputs: tx
                .inputs
                .iter()
                .map(|input| {
                    let mut prev = input.prev_hash;
                    prev.reverse();
                    ExportInput {
                        prev_txid: hex::encode(prev),
                        prev_index: input.prev_index,
                        sequence: input.sequence,
                    }
                })
                .collect(),
            outputs: tx
                .outputs
                .iter()
                .map(|output| ExportOutput {
                    value: output.value,
                    script_pubkey: hex::encode(&output.script_pubkey),
                })
                .collect(),
        })
        .collect();

    ExportDocument {
        metadata: ExportMetadata {
            wallet_file: ctx.wallet_file.clone(),
            network: ctx.params.name,
            encrypted: snapshot.is_encrypted(),
            version: snapshot.version,
            generated_at: ctx.timestamp(),
            master_key: snapshot.master_key.as_ref().map(|m| ExportMasterKey {
                id: m.id,
                salt: hex::encode(&m.salt),
                iterations: m.iterations,
                method: m.derivation_method,
            }),
        },
        statistics: snapshot.statistics(),
        keys,
        transactions,
        scripts: snapshot
            .scripts
            .iter()
            .map(|s| ExportScript {
                address: script_address(&s.script, &ctx.params),
                script_hash: hex::encode(s.hash),
                script: hex::encode(&s.script),
            })
            .collect(),
        settings: snapshot
            .settings
            .iter()
            .map(|(name, value)| (name.clone(), setting_json(value)))
            .collect(),
    }
}

fn title_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render the JSON document.
pub fn to_json(snapshot: &WalletSnapshot, ctx: &ExportContext) -> Result<String> {
    Ok(serde_json::to_string_pretty(&build_document(snapshot, ctx))?)
}

fn fmt_failed(e: fmt::Error) -> WalletError {
    WalletError::Export(e.to_string())
}

/// Render CSV rows.
pub fn to_csv(snapshot: &WalletSnapshot) -> Result<String> {
    let mut out = String::new();
    write_csv(&mut out, snapshot).map_err(fmt_failed)?;
    Ok(out)
}

fn write_csv<W: Write>(out: &mut W, snapshot: &WalletSnapshot) -> fmt::Result {
    writeln!(out, "{}", CSV_HEADER)?;
    for key in sorted_keys(snapshot) {
        writeln!(
            out,
            "{},{},{},{}",
            csv_field(&key.address),
            csv_field(&key.private_key_display()),
            title_bool(key.compressed),
            title_bool(key.is_encrypted()),
        )?;
    }
    Ok(())
}

/// Render the text report.
pub fn to_text(snapshot: &WalletSnapshot, ctx: &ExportContext) -> Result<String> {
    let mut out = String::new();
    write_text(&mut out, snapshot, ctx).map_err(fmt_failed)?;
    Ok(out)
}

fn write_text<W: Write>(
    out: &mut W,
    snapshot: &WalletSnapshot,
    ctx: &ExportContext,
) -> fmt::Result {
    let stats = snapshot.statistics();
    writeln!(out, "Bitcoin Wallet Dump")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out)?;

    writeln!(out, "Wallet Information:")?;
    writeln!(out, "  File: {}", ctx.wallet_file)?;
    writeln!(
        out,
        "  Version: {}",
        snapshot
            .version
            .map_or_else(|| "None".to_string(), |v| v.to_string())
    )?;
    writeln!(out, "  Encrypted: {}", title_bool(snapshot.is_encrypted()))?;
    writeln!(out, "  Network: {}", ctx.params.name)?;
    writeln!(out, "  Generated: {}", ctx.timestamp())?;
    writeln!(out)?;

    writeln!(out, "Statistics:")?;
    writeln!(out, "  Total Keys: {}", stats.total_keys)?;
    writeln!(out, "  Encrypted Keys: {}", stats.encrypted_keys)?;
    writeln!(out, "  Unencrypted Keys: {}", stats.unencrypted_keys)?;
    writeln!(out, "  Successfully Decrypted: {}", stats.successfully_decrypted)?;
    writeln!(out, "  Total Addresses: {}", stats.total_addresses)?;
    writeln!(out, "  Total Transactions: {}", stats.total_transactions)?;
    writeln!(out, "  Skipped Records: {}", stats.skipped_records)?;
    writeln!(out)?;

    writeln!(out, "Private Keys:")?;
    writeln!(out, "{}", "-".repeat(30))?;
    for key in sorted_keys(snapshot) {
        writeln!(out, "Address: {}", key.address)?;
        writeln!(out, "Private Key: {}", key.private_key_display())?;
        if let Some(material) = &key.material {
            writeln!(out, "WIF: {}", material.wif(&ctx.params))?;
        }
        writeln!(out, "Compressed: {}", title_bool(key.compressed))?;
        writeln!(out, "Encrypted: {}", title_bool(key.is_encrypted()))?;
        if key.is_encrypted() {
            writeln!(out, "Status: {}", key.status)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Render `snapshot` in `format`.
pub fn export(snapshot: &WalletSnapshot, format: ExportFormat, ctx: &ExportContext) -> Result<String> {
    match format {
        ExportFormat::Json => to_json(snapshot, ctx),
        ExportFormat::Csv => to_csv(snapshot),
        ExportFormat::Text => to_text(snapshot, ctx),
    }
}

/// Render and write to `path`.
pub fn write_export(
    snapshot: &WalletSnapshot,
    format: ExportFormat,
    ctx: &ExportContext,
    path: &Path,
) -> Result<()> {
    let content = export(snapshot, format, ctx)?;
    std::fs::write(path, content)
        .map_err(|e| WalletError::Export(format!("Failed to write '{}': {}", path.display(), e)))
}
