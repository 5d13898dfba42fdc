// src/archive/mod.rs

//! Archive decoding for repository artifacts
//!
//! Repository payloads are zstd-compressed ustar archives. This module
//! provides the streaming decompressor; the container codec lives in
//! [`tar`].

pub mod tar;

use crate::error::{Error, Result};
use std::io::{BufReader, Read};

/// Decompress a complete zstd frame held in memory.
///
/// Decodes into chunks of the codec's recommended output size, growing the
/// result until the input is exhausted. On failure the partial output is
/// discarded and the codec's diagnostic is returned.
pub fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = zstd::stream::read::Decoder::new(data)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    let chunk_size =
        zstd::stream::read::Decoder::<BufReader<&[u8]>>::recommended_output_size();

    let mut decompressed = Vec::new();
    loop {
        let old_len = decompressed.len();
        decompressed.resize(old_len + chunk_size, 0);
        let n = decoder
            .read(&mut decompressed[old_len..])
            .map_err(|e| Error::Decompression(e.to_string()))?;
        decompressed.truncate(old_len + n);
        if n == 0 {
            break;
        }
    }

    Ok(decompressed)
}
