//! CIFAR-10 binary distribution reader.
//!
//! # Record layout
//! ```text
//! byte  0:        label (0..=9)
//! bytes 1..1025:  red channel, 32×32 row-major, uint8
//! bytes 1025..2049: green channel
//! bytes 2049..3073: blue channel
//! ```
//! Training records live in `data_batch_1.bin` … `data_batch_5.bin`, test
//! records in `test_batch.bin`. Each file is a bare concatenation of
//! records with no header.
use std::path::PathBuf;

use tracing::debug;

use crate::data::dataset::Dataset;
use crate::data::source::DataSource;
use crate::error::{Result, UnlearnError};

pub const CIFAR10_CLASSES: usize = 10;
const CHANNEL_PIXELS: usize = 32 * 32;
const PIXELS: usize = 3 * CHANNEL_PIXELS;
const RECORD_LEN: usize = 1 + PIXELS;

const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILE: &str = "test_batch.bin";

/// Per-channel mean and standard deviation of the CIFAR-10 training set.
const MEAN: [f32; 3] = [0.4914, 0.4822, 0.4465];
const STD: [f32; 3] = [0.2470, 0.2435, 0.2616];

#[derive(Debug, Clone)]
pub struct Cifar10Source {
    pub dir: PathBuf,
    /// Keep at most this many training records (in file order).
    pub train_limit: Option<usize>,
    /// Keep at most this many test records.
    pub test_limit: Option<usize>,
}

impl Cifar10Source {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Cifar10Source { dir: dir.into(), train_limit: None, test_limit: None }
    }

    fn read_split(&self, files: &[&str], limit: Option<usize>) -> Result<Dataset> {
        let mut features = Vec::new();
        let mut targets = Vec::new();
        for name in files {
            if limit.is_some_and(|l| targets.len() >= l) {
                break;
            }
            let path = self.dir.join(name);
            let bytes = std::fs::read(&path).map_err(|e| UnlearnError::io(&path, e))?;
            let remaining = limit.map(|l| l - targets.len());
            let before = targets.len();
            parse_records(&bytes, remaining, &mut features, &mut targets)
                .map_err(|msg| UnlearnError::Data(format!("{}: {}", path.display(), msg)))?;
            debug!(file = %path.display(), records = targets.len() - before, "read CIFAR-10 batch");
        }
        Dataset::new(features, PIXELS, targets, CIFAR10_CLASSES)
    }
}

impl DataSource for Cifar10Source {
    fn name(&self) -> &str {
        "CIFAR10"
    }

    fn num_classes(&self) -> usize {
        CIFAR10_CLASSES
    }

    fn load(&self) -> Result<(Dataset, Dataset)> {
        let train = self.read_split(&TRAIN_FILES, self.train_limit)?;
        let test = self.read_split(&[TEST_FILE], self.test_limit)?;
        Ok((train, test))
    }
}

/// Decodes records from one batch file, normalising pixels to
/// `(x / 255 - mean) / std` per channel.
pub fn parse_records(
    bytes: &[u8],
    limit: Option<usize>,
    features: &mut Vec<f32>,
    targets: &mut Vec<usize>,
) -> std::result::Result<(), String> {
    if bytes.len() % RECORD_LEN != 0 {
        return Err(format!(
            "length {} is not a multiple of the {}-byte record size",
            bytes.len(), RECORD_LEN
        ));
    }
    let take = limit.unwrap_or(usize::MAX);
    for (i, record) in bytes.chunks_exact(RECORD_LEN).take(take).enumerate() {
        let label = record[0] as usize;
        if label >= CIFAR10_CLASSES {
            return Err(format!("record {} has label {}, expected 0..=9", i, label));
        }
        targets.push(label);
        for (c, channel) in record[1..].chunks_exact(CHANNEL_PIXELS).enumerate() {
            features.extend(channel.iter().map(|&p| (p as f32 / 255.0 - MEAN[c]) / STD[c]));
        }
    }
    Ok(())
}
