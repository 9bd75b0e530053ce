//! KOReader-compatible partial MD5 document fingerprint.
//!
//! Rather than hashing the whole file, 1 KiB samples are taken at offsets
//! growing by a factor of four (0, 1 KiB, 4 KiB, 16 KiB, ... 1 GiB). The
//! result matches the document ID e-reader sync clients compute locally.

use md5::{Digest, Md5};
use std::io::{self, Read, Seek, SeekFrom};

const SAMPLE_SIZE: u64 = 1024;
const SAMPLES: u32 = 10;

fn offsets() -> impl Iterator<Item = u64> {
    std::iter::once(0).chain((0..=SAMPLES).map(|i| SAMPLE_SIZE << (2 * i)))
}

/// Lowercase hex MD5 over the sampled regions of `reader`.
///
/// Sampling stops at the first offset at or beyond the end of the data; the
/// sample straddling the end is hashed as far as it goes.
pub fn partial_md5<R: Read + Seek>(reader: &mut R) -> io::Result<String> {
    let mut hasher = Md5::new();
    let mut sample = Vec::with_capacity(SAMPLE_SIZE as usize);
    for offset in offsets() {
        reader.seek(SeekFrom::Start(offset))?;
        sample.clear();
        reader.by_ref().take(SAMPLE_SIZE).read_to_end(&mut sample)?;
        if sample.is_empty() {
            break;
        }
        hasher.update(&sample);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
