use crate::fixtures::*;
use std::io::Cursor;
use std::sync::atomic::Ordering;
use vaultscan::{recover_keys, DiskScanner, ScanConfig, Toolkit, VaultscanConfig};

#[test]
fn test_disk_keys_match_wallet_addresses() {
    let kit = Toolkit::from_config(&VaultscanConfig::default()).unwrap();
    let snapshot = kit.decoder.decode_snapshot(encrypted_store(), Some(PASSPHRASE));

    let image = disk_image(200_000, &[(5_000, scalar(1)), (150_000, scalar(2))]);
    let report = kit.scanner.scan(&mut Cursor::new(image)).unwrap();
    let (recovered, stats) = recover_keys(&report.matches, &kit.params);
    assert_eq!(stats.recovered, 2);

    for (disk, wallet) in recovered.iter().zip(&snapshot.keys) {
        assert!(disk.compressed);
        assert_eq!(disk.public_key, wallet.public_key);
        assert_eq!(disk.primary_address(), wallet.address);
        let material = wallet.material.as_ref().unwrap();
        assert_eq!(disk.wif_compressed, material.wif(&kit.params));
    }
}

#[test]
fn test_cancelled_scan_returns_partial_report() {
    let scanner = DiskScanner::new(ScanConfig::for_testing()).unwrap();
    let flag = scanner.cancel_flag();
    flag.store(true, Ordering::SeqCst);
    let report = scanner
        .scan(&mut Cursor::new(disk_image(50_000, &[(100, scalar(3))])))
        .unwrap();
    assert!(report.cancelled);
    assert!(report.matches.is_empty());
}

#[test]
fn test_rescan_is_stable() {
    let scanner = DiskScanner::new(ScanConfig::for_testing()).unwrap();
    let image = disk_image(60_000, &[(700, scalar(4)), (33_000, scalar(5))]);
    let first = scanner.scan(&mut Cursor::new(image.clone())).unwrap();
    let second = scanner.scan(&mut Cursor::new(image)).unwrap();
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.matches.len(), 2);
}
