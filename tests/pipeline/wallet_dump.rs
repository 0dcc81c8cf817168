use crate::fixtures::*;
use std::path::Path;
use tempfile::TempDir;
use vaultscan::vaultscan_wallet::{DecryptStatus, SettingValue};
use vaultscan::{
    export, john_line, ExportContext, ExportFormat, NetworkParams, Toolkit, VaultscanConfig,
};

fn toolkit() -> Toolkit {
    Toolkit::from_config(&VaultscanConfig::default()).unwrap()
}

#[test]
fn test_unlocked_dump() {
    let snapshot = toolkit()
        .decoder
        .decode_snapshot(encrypted_store(), Some(PASSPHRASE));

    assert_eq!(snapshot.version, Some(60000));
    assert_eq!(snapshot.skipped_records, 1);
    assert_eq!(snapshot.ignored_records, 1);
    assert_eq!(
        snapshot.settings.get("fUseCompression"),
        Some(&SettingValue::Bool(true))
    );
    assert_eq!(snapshot.keys.len(), 2);
    assert!(snapshot
        .keys
        .iter()
        .all(|k| k.status == DecryptStatus::Decrypted));

    let stats = snapshot.statistics();
    assert_eq!(stats.successfully_decrypted, 2);
    assert_eq!(stats.mismatched_keys, 0);
}

#[test]
fn test_json_export_has_wif_for_unlocked_keys() {
    let kit = toolkit();
    let snapshot = kit.decoder.decode_snapshot(encrypted_store(), Some(PASSPHRASE));
    let ctx = ExportContext::new("wallet.dat", kit.params);
    let json = export(&snapshot, ExportFormat::Json, &ctx).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&json).unwrap();

    let keys = doc["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 2);
    for key in keys {
        assert_eq!(key["decryption_status"]["state"], "decrypted");
        assert!(key["wif"].as_str().unwrap().starts_with(['K', 'L']));
    }
    assert_eq!(doc["settings"]["fUseCompression"], true);
    assert_eq!(doc["metadata"]["master_key"]["iterations"], ITERATIONS);
}

#[test]
fn test_locked_dump_exports_john_hash() {
    let snapshot = toolkit().decoder.decode_snapshot(encrypted_store(), None);
    let line = john_line("wallet.dat", &snapshot).unwrap();
    let fields: Vec<&str> = line.split('$').collect();
    assert_eq!(fields[0], "wallet.dat:");
    assert_eq!(fields[1], "bitcoin");
    assert_eq!(fields[2], "48");
    assert_eq!(fields[4], "8");
    assert_eq!(fields[5], hex::encode(SALT));
    assert_eq!(fields[6], ITERATIONS.to_string());
    assert_eq!(fields[7], "48");
    assert_eq!(fields[9], "0");

    let text = export(
        &snapshot,
        ExportFormat::Text,
        &ExportContext::new("wallet.dat", NetworkParams::BITCOIN),
    )
    .unwrap();
    assert!(text.contains("Encrypted Keys: 2"));
    assert!(text.contains("Private Key: ENCRYPTED"));
}

#[test]
fn test_testnet_config_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vaultscan.toml");
    std::fs::write(
        &path,
        "network = \"testnet\"\n\n[scanner]\ncoarse_block_size = 8192\nrefine_block_size = 1024\n",
    )
    .unwrap();

    let config = VaultscanConfig::from_file(Path::new(&path)).unwrap();
    let kit = Toolkit::from_config(&config).unwrap();
    assert_eq!(kit.scanner.config().coarse_block_size, 8192);

    let snapshot = kit.decoder.decode_snapshot(encrypted_store(), Some(PASSPHRASE));
    assert!(snapshot
        .keys
        .iter()
        .all(|k| k.address.starts_with('m') || k.address.starts_with('n')));
}

#[test]
fn test_invalid_scanner_config_is_rejected() {
    let config = VaultscanConfig::from_toml_str(
        "[scanner]\ncoarse_block_size = 1024\nrefine_block_size = 4096\n",
    )
    .unwrap();
    assert!(matches!(
        Toolkit::from_config(&config),
        Err(vaultscan::Error::Scan(_))
    ));
}

#[test]
fn test_oversized_config_sizes_are_rejected() {
    let config = VaultscanConfig::from_toml_str("[kdf]\nkey_length = 1000000\n").unwrap();
    assert!(matches!(
        Toolkit::from_config(&config),
        Err(vaultscan::Error::Crypto(_))
    ));

    let config = VaultscanConfig::from_toml_str(
        "[scanner]\ncoarse_block_size = 134217728\nrefine_block_size = 4096\n",
    )
    .unwrap();
    assert!(matches!(
        Toolkit::from_config(&config),
        Err(vaultscan::Error::Scan(_))
    ));
}

#[test]
fn test_address_book_labels_survive_export() {
    let kit = toolkit();
    let mut store = encrypted_store();
    let first = kit.decoder.decode_snapshot(store.clone(), None);
    let address = first.keys[0].address.clone();
    store.push(name(&address, "savings"));

    let snapshot = kit.decoder.decode_snapshot(store, None);
    let json = export(
        &snapshot,
        ExportFormat::Json,
        &ExportContext::new("wallet.dat", kit.params),
    )
    .unwrap();
    let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
    let labelled: Vec<&serde_json::Value> = doc["keys"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|k| k["label"] == "savings")
        .collect();
    assert_eq!(labelled.len(), 1);
    assert_eq!(labelled[0]["address"], address.as_str());
}
