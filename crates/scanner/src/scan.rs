//! Three-pass marker scan over a seekable byte source.
//!
//! ```text
//!   source ──► coarse pass (64 KiB blocks) ──► padded intervals
//!                                                 │
//!              refine pass (4 KiB blocks)  ◄──────┘
//!                     │
//!                     ▼
//!              exact pass (byte offsets) ──► ScanMatch { Candidate | Rejected }
//! ```
//!
//! Coarse blocks are inspected independently. A marker split across a
//! coarse block boundary is not seen and the key behind it is missed.
//! Refine blocks overlap by one marker length, so they lose nothing the
//! coarse pass found.
//!
//! Read failures are logged and the block is skipped. Cancellation is
//! checked between blocks; a cancelled scan returns what it found so far.

use crate::error::{Result, ScanError};
use crate::markers::{self, KeyMarker, KEY_LEN, MAX_PREFIX_LEN, MAX_WINDOW_LEN};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vaultscan_core::ScannerSettings;

/// Smallest accepted block size
pub const MIN_BLOCK_SIZE: usize = 512;

/// Largest accepted block size (64 MiB)
pub const MAX_BLOCK_SIZE: usize = 64 * 1024 * 1024;

/// Scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Coarse pass block size (default: 64 KiB)
    pub coarse_block_size: usize,
    /// Refine and exact pass block size (default: 4 KiB)
    pub refine_block_size: usize,
    /// First offset to scan
    pub start_offset: u64,
    /// Bytes to scan; `None` scans to the end of the source
    pub scan_len: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            coarse_block_size: 64 * 1024,
            refine_block_size: 4 * 1024,
            start_offset: 0,
            scan_len: None,
        }
    }
}

impl ScanConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration from the `[scanner]` section of `vaultscan.toml`.
    pub fn from_settings(settings: &ScannerSettings) -> Self {
        ScanConfig {
            coarse_block_size: settings.coarse_block_size,
            refine_block_size: settings.refine_block_size,
            start_offset: settings.start_offset,
            scan_len: settings.scan_len,
        }
    }

    /// Set coarse block size (builder pattern).
    pub fn with_coarse_block_size(mut self, size: usize) -> Self {
        self.coarse_block_size = size;
        self
    }

    /// Set refine block size (builder pattern).
    pub fn with_refine_block_size(mut self, size: usize) -> Self {
        self.refine_block_size = size;
        self
    }

    /// Set start offset (builder pattern).
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }

    /// Limit the number of bytes scanned (builder pattern).
    pub fn with_scan_len(mut self, len: u64) -> Self {
        self.scan_len = Some(len);
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> std::result::Result<(), ScanConfigError> {
        for size in [self.coarse_block_size, self.refine_block_size] {
            if size < MIN_BLOCK_SIZE {
                return Err(ScanConfigError::BlockSizeTooSmall {
                    size,
                    min: MIN_BLOCK_SIZE,
                });
            }
            if size > MAX_BLOCK_SIZE {
                return Err(ScanConfigError::BlockSizeTooLarge {
                    size,
                    max: MAX_BLOCK_SIZE,
                });
            }
        }
        if self.refine_block_size > self.coarse_block_size {
            return Err(ScanConfigError::RefineExceedsCoarse);
        }
        if self.scan_len == Some(0) {
            return Err(ScanConfigError::EmptyScanLength);
        }
        Ok(())
    }

    /// Small blocks for tests.
    pub fn for_testing() -> Self {
        ScanConfig {
            coarse_block_size: 4096,
            refine_block_size: 512,
            start_offset: 0,
            scan_len: None,
        }
    }
}

/// Scan configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanConfigError {
    /// A block size is below [`MIN_BLOCK_SIZE`].
    #[error("Block size {size} is below the minimum of {min} bytes")]
    BlockSizeTooSmall {
        /// Offending size
        size: usize,
        /// Minimum size
        min: usize,
    },

    /// A block size is above [`MAX_BLOCK_SIZE`].
    #[error("Block size {size} exceeds the maximum of {max} bytes")]
    BlockSizeTooLarge {
        /// Offending size
        size: usize,
        /// Maximum size
        max: usize,
    },

    /// Refine block size exceeds coarse block size.
    #[error("Refine block size cannot exceed coarse block size")]
    RefineExceedsCoarse,

    /// Scan length of zero.
    #[error("Scan length must be non-zero")]
    EmptyScanLength,
}

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    /// First byte
    pub start: u64,
    /// One past the last byte
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// True if the range holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Match classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Followed by a known post-key marker
    Candidate,
    /// Prefix matched but the trailing bytes did not
    Rejected,
}

/// A marker hit and the window captured behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanMatch {
    /// Absolute offset of the marker
    pub offset: u64,
    /// Marker, key and post-key bytes
    pub window: Vec<u8>,
    /// Marker that matched
    pub marker: KeyMarker,
    /// Classification
    pub kind: MatchKind,
}

impl ScanMatch {
    /// Captured key bytes.
    pub fn key_bytes(&self) -> &[u8] {
        let start = self.marker.prefix.len();
        self.window.get(start..start + KEY_LEN).unwrap_or(&[])
    }

    /// Captured key as a fixed array.
    pub fn key(&self) -> Option<[u8; KEY_LEN]> {
        self.key_bytes().try_into().ok()
    }

    /// Absolute offset of the key bytes.
    pub fn key_offset(&self) -> u64 {
        self.offset + self.marker.prefix.len() as u64
    }

    /// True for candidates.
    pub fn is_candidate(&self) -> bool {
        self.kind == MatchKind::Candidate
    }
}

/// Per-scan counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Bytes covered by the coarse pass
    pub bytes_scanned: u64,
    /// Intervals after the coarse pass
    pub coarse_intervals: usize,
    /// Intervals after the refine pass
    pub refined_intervals: usize,
    /// Unique candidates returned
    pub candidates: usize,
    /// Windows without a post-key marker
    pub rejected: usize,
    /// Candidates dropped because their key was already seen
    pub duplicates: usize,
    /// Blocks that could not be read
    pub read_errors: usize,
}

/// Scan output.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Unique candidates sorted by offset
    pub matches: Vec<ScanMatch>,
    /// Counters
    pub stats: ScanStats,
    /// True if the scan stopped on the cancel flag
    pub cancelled: bool,
}

/// Marker scanner over `Read + Seek` sources.
#[derive(Debug, Clone)]
pub struct DiskScanner {
    config: ScanConfig,
    cancel: Arc<AtomicBool>,
}

impl DiskScanner {
    /// Create a scanner with a validated configuration.
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(DiskScanner {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Share an existing cancel flag.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Flag that stops the scan at the next block when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Active configuration.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Open `path` (file or block device) and scan it.
    pub fn scan_path(&self, path: &Path) -> Result<ScanReport> {
        let mut file = File::open(path)?;
        self.scan(&mut file)
    }

    /// Run all three passes over `source`.
    pub fn scan<R: Read + Seek>(&self, source: &mut R) -> Result<ScanReport> {
        let bounds = self.bounds(source)?;
        info!(
            start = bounds.start,
            end = bounds.end,
            coarse = self.config.coarse_block_size,
            refine = self.config.refine_block_size,
            "Starting marker scan"
        );

        let mut run = ScanRun {
            source,
            bounds,
            buf: Vec::with_capacity(self.config.coarse_block_size),
            stats: ScanStats {
                bytes_scanned: bounds.len(),
                ..ScanStats::default()
            },
            cancel: &self.cancel,
            cancelled: false,
        };

        let coarse = run.marker_pass(&[bounds], self.config.coarse_block_size, 0);
        run.stats.coarse_intervals = coarse.len();
        debug!(intervals = coarse.len(), "Coarse pass complete");

        let refined = run.marker_pass(&coarse, self.config.refine_block_size, MAX_PREFIX_LEN - 1);
        run.stats.refined_intervals = refined.len();
        debug!(intervals = refined.len(), "Refine pass complete");

        let found = run.exact_pass(&refined, self.config.refine_block_size);

        let ScanRun {
            mut stats,
            cancelled,
            ..
        } = run;
        let matches = dedupe(found, &mut stats);

        info!(
            candidates = stats.candidates,
            rejected = stats.rejected,
            duplicates = stats.duplicates,
            read_errors = stats.read_errors,
            cancelled,
            "Marker scan finished"
        );
        Ok(ScanReport {
            matches,
            stats,
            cancelled,
        })
    }

    fn bounds<R: Seek>(&self, source: &mut R) -> Result<ByteRange> {
        let total = source.seek(SeekFrom::End(0))?;
        let start = self.config.start_offset.min(total);
        let end = match self.config.scan_len {
            Some(len) => start.saturating_add(len).min(total),
            None => total,
        };
        Ok(ByteRange { start, end })
    }
}

struct ScanRun<'a, R> {
    source: &'a mut R,
    bounds: ByteRange,
    buf: Vec<u8>,
    stats: ScanStats,
    cancel: &'a AtomicBool,
    cancelled: bool,
}

impl<R: Read + Seek> ScanRun<'_, R> {
    fn check_cancel(&mut self) -> bool {
        if !self.cancelled && self.cancel.load(Ordering::Relaxed) {
            info!("Scan cancelled");
            self.cancelled = true;
        }
        self.cancelled
    }

    /// Fill the reusable buffer with up to `len` bytes at `offset`.
    fn read_block(&mut self, offset: u64, len: usize) -> Result<()> {
        self.buf.clear();
        let outcome = match self.source.seek(SeekFrom::Start(offset)) {
            Ok(_) => (&mut *self.source)
                .take(len as u64)
                .read_to_end(&mut self.buf)
                .map(|_| ()),
            Err(e) => Err(e),
        };
        outcome.map_err(|e| ScanError::DeviceReadError {
            offset,
            message: e.to_string(),
        })
    }

    fn read_or_log(&mut self, offset: u64, len: usize) -> bool {
        match self.read_block(offset, len) {
            Ok(()) => true,
            Err(e) => {
                warn!(offset, error = %e, "Skipping unreadable block");
                self.stats.read_errors += 1;
                false
            }
        }
    }

    /// Blocks of `block_size` (plus `overlap` trailing bytes) that contain a
    /// marker, padded by the marker length and merged.
    fn marker_pass(&mut self, ranges: &[ByteRange], block_size: usize, overlap: usize) -> Vec<ByteRange> {
        let pad = MAX_PREFIX_LEN as u64;
        let mut intervals = Vec::new();
        for range in ranges {
            let mut pos = range.start;
            while pos < range.end {
                if self.check_cancel() {
                    return intervals;
                }
                let len = (range.end - pos).min(block_size as u64);
                let read_len = (len + overlap as u64).min(range.end - pos);
                if self.read_or_log(pos, read_len as usize) && markers::contains_marker(&self.buf) {
                    push_merged(
                        &mut intervals,
                        ByteRange {
                            start: pos.saturating_sub(pad).max(self.bounds.start),
                            end: (pos + len + pad).min(self.bounds.end),
                        },
                    );
                }
                pos += len;
            }
        }
        intervals
    }

    /// Every marker starting inside `ranges`, with its captured window.
    fn exact_pass(&mut self, ranges: &[ByteRange], block_size: usize) -> Vec<ScanMatch> {
        let mut found = Vec::new();
        for range in ranges {
            let mut pos = range.start;
            while pos < range.end {
                if self.check_cancel() {
                    return found;
                }
                let len = (range.end - pos).min(block_size as u64);
                let read_len = (len + MAX_WINDOW_LEN as u64 - 1).min(self.bounds.end - pos);
                if self.read_or_log(pos, read_len as usize) {
                    let limit = (len as usize).min(self.buf.len());
                    for i in 0..limit {
                        if let Some(marker) = markers::marker_at(&self.buf, i) {
                            match capture(&self.buf[i..], marker) {
                                Some((window, kind)) => found.push(ScanMatch {
                                    offset: pos + i as u64,
                                    window,
                                    marker: *marker,
                                    kind,
                                }),
                                None => debug!(
                                    offset = pos + i as u64,
                                    "Marker too close to end of source"
                                ),
                            }
                        }
                    }
                }
                pos += len;
            }
        }
        found
    }
}

fn capture(tail: &[u8], marker: &KeyMarker) -> Option<(Vec<u8>, MatchKind)> {
    let window = tail.get(..marker.window_len())?;
    let trailing = &window[marker.prefix.len() + KEY_LEN..];
    let kind = if markers::is_post_key_marker(trailing) {
        MatchKind::Candidate
    } else {
        MatchKind::Rejected
    };
    Some((window.to_vec(), kind))
}

fn push_merged(intervals: &mut Vec<ByteRange>, next: ByteRange) {
    if let Some(last) = intervals.last_mut() {
        if next.start <= last.end {
            last.end = last.end.max(next.end);
            return;
        }
    }
    intervals.push(next);
}

/// Drop rejected windows and repeated keys; first offset wins.
fn dedupe(mut found: Vec<ScanMatch>, stats: &mut ScanStats) -> Vec<ScanMatch> {
    found.sort_by_key(|m| m.offset);
    let mut seen: FxHashSet<[u8; KEY_LEN]> = FxHashSet::default();
    let mut matches = Vec::new();
    for m in found {
        match (m.kind, m.key()) {
            (MatchKind::Candidate, Some(key)) => {
                if seen.insert(key) {
                    matches.push(m);
                } else {
                    stats.duplicates += 1;
                }
            }
            _ => {
                debug!(offset = m.offset, "Rejected marker window");
                stats.rejected += 1;
            }
        }
    }
    stats.candidates = matches.len();
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::{KEY_MARKERS, POST_KEY_MARKERS};
    use std::io::{self, Cursor};

    const FILL: u8 = 0xaa;

    fn key(n: u8) -> [u8; KEY_LEN] {
        let mut k = [0x11u8; KEY_LEN];
        k[31] = n;
        k
    }

    fn container(marker: usize, key: [u8; KEY_LEN], post_ok: bool) -> Vec<u8> {
        let mut bytes = KEY_MARKERS[marker].prefix.to_vec();
        bytes.extend_from_slice(&key);
        if post_ok {
            bytes.extend_from_slice(&POST_KEY_MARKERS[marker]);
        } else {
            bytes.extend_from_slice(&[0u8; 6]);
        }
        bytes.extend_from_slice(&[0x55; 16]);
        bytes
    }

    fn image(size: usize, placements: &[(usize, Vec<u8>)]) -> Vec<u8> {
        let mut data = vec![FILL; size];
        for (offset, bytes) in placements {
            data[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }
        data
    }

    fn scan(config: ScanConfig, data: Vec<u8>) -> ScanReport {
        DiskScanner::new(config)
            .unwrap()
            .scan(&mut Cursor::new(data))
            .unwrap()
    }

    #[test]
    fn test_default_config_valid() {
        assert!(ScanConfig::default().validate().is_ok());
        assert!(ScanConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            ScanConfig::new().with_refine_block_size(16).validate(),
            Err(ScanConfigError::BlockSizeTooSmall { size: 16, .. })
        ));
        assert_eq!(
            ScanConfig::new()
                .with_coarse_block_size(1024)
                .with_refine_block_size(2048)
                .validate(),
            Err(ScanConfigError::RefineExceedsCoarse)
        );
        assert_eq!(
            ScanConfig::new().with_scan_len(0).validate(),
            Err(ScanConfigError::EmptyScanLength)
        );
        assert!(DiskScanner::new(ScanConfig::new().with_coarse_block_size(1)).is_err());
    }

    #[test]
    fn test_oversized_blocks_rejected() {
        let huge = ScanConfig {
            coarse_block_size: usize::MAX,
            refine_block_size: usize::MAX,
            ..ScanConfig::default()
        };
        assert_eq!(
            huge.validate(),
            Err(ScanConfigError::BlockSizeTooLarge {
                size: usize::MAX,
                max: MAX_BLOCK_SIZE,
            })
        );
        assert!(matches!(
            DiskScanner::new(huge),
            Err(ScanError::Config(ScanConfigError::BlockSizeTooLarge { .. }))
        ));
        assert!(ScanConfig::new()
            .with_coarse_block_size(MAX_BLOCK_SIZE)
            .validate()
            .is_ok());
        assert!(ScanConfig::new()
            .with_coarse_block_size(MAX_BLOCK_SIZE + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_from_settings() {
        let settings = ScannerSettings {
            start_offset: 100,
            scan_len: Some(5000),
            ..ScannerSettings::default()
        };
        let config = ScanConfig::from_settings(&settings);
        assert_eq!(config.coarse_block_size, 64 * 1024);
        assert_eq!(config.start_offset, 100);
        assert_eq!(config.scan_len, Some(5000));
    }

    #[test]
    fn test_finds_both_container_forms() {
        let data = image(
            20_000,
            &[(1000, container(0, key(1), true)), (9000, container(1, key(2), true))],
        );
        let report = scan(ScanConfig::for_testing(), data);

        assert_eq!(report.matches.len(), 2);
        assert_eq!(report.matches[0].offset, 1000);
        assert_eq!(report.matches[0].key(), Some(key(1)));
        assert!(!report.matches[0].marker.compressed);
        assert_eq!(report.matches[0].key_offset(), 1009);
        assert_eq!(report.matches[1].offset, 9000);
        assert!(report.matches[1].marker.compressed);
        assert_eq!(report.stats.candidates, 2);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_rejects_missing_post_marker() {
        let data = image(8192, &[(300, container(0, key(3), false))]);
        let report = scan(ScanConfig::for_testing(), data);
        assert!(report.matches.is_empty());
        assert_eq!(report.stats.rejected, 1);
    }

    #[test]
    fn test_duplicate_keys_keep_first_offset() {
        let data = image(
            16_384,
            &[(200, container(1, key(4), true)), (10_000, container(1, key(4), true))],
        );
        let report = scan(ScanConfig::for_testing(), data);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].offset, 200);
        assert_eq!(report.stats.duplicates, 1);
    }

    #[test]
    fn test_marker_split_by_coarse_boundary_is_missed() {
        let data = image(16_384, &[(4096 - 4, container(0, key(5), true))]);
        let report = scan(ScanConfig::for_testing(), data);
        assert!(report.matches.is_empty());
        assert_eq!(report.stats.coarse_intervals, 0);
    }

    #[test]
    fn test_marker_split_by_refine_boundary_is_found() {
        let data = image(8192, &[(1024 - 4, container(0, key(6), true))]);
        let report = scan(ScanConfig::for_testing(), data);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].offset, 1020);
    }

    #[test]
    fn test_window_at_end_of_source_is_skipped() {
        let prefix = KEY_MARKERS[1].prefix;
        let mut data = vec![FILL; 2048];
        let at = data.len() - prefix.len() - 10;
        data[at..at + prefix.len()].copy_from_slice(prefix);
        let report = scan(ScanConfig::for_testing(), data);
        assert!(report.matches.is_empty());
        assert_eq!(report.stats.rejected, 0);
    }

    #[test]
    fn test_offset_and_length_limits() {
        let data = image(
            30_000,
            &[(500, container(0, key(7), true)), (20_000, container(0, key(8), true))],
        );
        let report = scan(
            ScanConfig::for_testing()
                .with_start_offset(1000)
                .with_scan_len(25_000),
            data.clone(),
        );
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].offset, 20_000);
        assert_eq!(report.stats.bytes_scanned, 25_000);

        let report = scan(ScanConfig::for_testing().with_scan_len(10_000), data);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].offset, 500);
    }

    #[test]
    fn test_cancel_before_start() {
        let data = image(8192, &[(100, container(0, key(9), true))]);
        let scanner = DiskScanner::new(ScanConfig::for_testing()).unwrap();
        scanner.cancel_flag().store(true, Ordering::Relaxed);
        let report = scanner.scan(&mut Cursor::new(data)).unwrap();
        assert!(report.cancelled);
        assert!(report.matches.is_empty());
    }

    struct BadSectors {
        inner: Cursor<Vec<u8>>,
        bad_start: u64,
        bad_end: u64,
    }

    impl Read for BadSectors {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let pos = self.inner.position();
            if pos >= self.bad_start && pos < self.bad_end {
                return Err(io::Error::new(io::ErrorKind::Other, "bad sector"));
            }
            self.inner.read(buf)
        }
    }

    impl Seek for BadSectors {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_read_errors_are_skipped() {
        let data = image(
            16_384,
            &[(300, container(0, key(10), true)), (12_000, container(1, key(11), true))],
        );
        let mut source = BadSectors {
            inner: Cursor::new(data),
            bad_start: 0,
            bad_end: 4096,
        };
        let report = DiskScanner::new(ScanConfig::for_testing())
            .unwrap()
            .scan(&mut source)
            .unwrap();
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].offset, 12_000);
        assert_eq!(report.stats.read_errors, 1);
    }

    #[test]
    fn test_push_merged() {
        let mut intervals = Vec::new();
        push_merged(&mut intervals, ByteRange { start: 0, end: 10 });
        push_merged(&mut intervals, ByteRange { start: 10, end: 20 });
        push_merged(&mut intervals, ByteRange { start: 30, end: 40 });
        assert_eq!(
            intervals,
            vec![ByteRange { start: 0, end: 20 }, ByteRange { start: 30, end: 40 }]
        );
    }
}
