//! PNG encoding for heatmap frames.
//!
//! Two encoding modes:
//! - **Indexed PNG (color type 3)** when the frame has at most 256 distinct
//!   colors, which is the common case since every opaque pixel comes from a
//!   256-entry lookup table.
//! - **RGBA PNG (color type 6)** otherwise.
//!
//! Heatmap frames store row 0 at the bottom of the data extent; PNG stores
//! row 0 at the top, so [`encode_image`] writes the rows in reverse.

use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

use crate::heatmap::HeatmapImage;

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096;

type Rgba = [u8; 4];

#[derive(Debug, Error)]
pub enum PngError {
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: usize, height: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PngResult<T> = std::result::Result<T, PngError>;

/// Encode a heatmap frame with the maximum data y at the top.
pub fn encode_image(image: &HeatmapImage) -> PngResult<Vec<u8>> {
    check_dimensions(&image.pixels, image.width, image.height)?;
    let stride = image.width * 4;
    let flipped: Vec<u8> = image
        .pixels
        .chunks_exact(stride)
        .rev()
        .flatten()
        .copied()
        .collect();
    encode_rgba_auto(&flipped, image.width, image.height)
}

/// Encode and write a heatmap frame to `path`.
pub fn write_png(image: &HeatmapImage, path: impl AsRef<Path>) -> PngResult<usize> {
    let bytes = encode_image(image)?;
    std::fs::write(path, &bytes)?;
    Ok(bytes.len())
}

/// Encode top-down RGBA pixels, choosing indexed output when the colors fit.
pub fn encode_rgba_auto(pixels: &[u8], width: usize, height: usize) -> PngResult<Vec<u8>> {
    check_dimensions(pixels, width, height)?;

    let palette = if width * height >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels)
    } else {
        extract_palette_sequential(pixels)
    };

    match palette {
        Some((palette, indices)) => encode_indexed(width, height, &palette, &indices),
        None => encode_rgba(pixels, width, height),
    }
}

fn check_dimensions(pixels: &[u8], width: usize, height: usize) -> PngResult<()> {
    if width == 0 || height == 0 {
        return Err(PngError::EmptyImage { width, height });
    }
    let expected = width * height * 4;
    if pixels.len() != expected {
        return Err(PngError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

#[inline(always)]
fn pack(px: &[u8]) -> u32 {
    u32::from_le_bytes([px[0], px[1], px[2], px[3]])
}

fn extract_palette_sequential(pixels: &[u8]) -> Option<(Vec<Rgba>, Vec<u8>)> {
    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<Rgba> = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let key = pack(px);
        let index = match lookup.get(&key) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push([px[0], px[1], px[2], px[3]]);
                lookup.insert(key, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Collect distinct colors per chunk in parallel, merge, then map pixels to
/// palette indices in a second parallel pass.
fn extract_palette_parallel(pixels: &[u8]) -> Option<(Vec<Rgba>, Vec<u8>)> {
    let chunk_pixels = (pixels.len() / 4 / rayon::current_num_threads()).max(256);

    let distinct: Vec<u32> = pixels
        .par_chunks(chunk_pixels * 4)
        .flat_map_iter(|chunk| {
            let mut local: HashMap<u32, ()> = HashMap::with_capacity(MAX_PALETTE_SIZE);
            for px in chunk.chunks_exact(4) {
                local.insert(pack(px), ());
                if local.len() > MAX_PALETTE_SIZE {
                    break;
                }
            }
            local.into_keys()
        })
        .collect();

    let mut lookup: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<Rgba> = Vec::with_capacity(MAX_PALETTE_SIZE);
    for key in distinct {
        if lookup.contains_key(&key) {
            continue;
        }
        if palette.len() >= MAX_PALETTE_SIZE {
            return None;
        }
        lookup.insert(key, palette.len() as u8);
        palette.push(key.to_le_bytes());
    }

    let indices = pixels
        .par_chunks_exact(4)
        .map(|px| lookup.get(&pack(px)).copied().unwrap_or(0))
        .collect();

    Some((palette, indices))
}

fn ihdr(width: usize, height: usize, color_type: u8) -> [u8; 13] {
    let mut data = [0u8; 13];
    data[0..4].copy_from_slice(&(width as u32).to_be_bytes());
    data[4..8].copy_from_slice(&(height as u32).to_be_bytes());
    data[8] = 8; // bit depth
    data[9] = color_type;
    // compression, filter and interlace methods stay 0
    data
}

/// Indexed PNG with a tRNS chunk when any palette entry is translucent.
fn encode_indexed(
    width: usize,
    height: usize,
    palette: &[Rgba],
    indices: &[u8],
) -> PngResult<Vec<u8>> {
    let mut png = Vec::from(SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));

    let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    write_chunk(&mut png, b"IDAT", &deflate_scanlines(indices, width)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Full-color RGBA PNG.
pub fn encode_rgba(pixels: &[u8], width: usize, height: usize) -> PngResult<Vec<u8>> {
    check_dimensions(pixels, width, height)?;
    let mut png = Vec::from(SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr(width, height, 6));
    write_chunk(&mut png, b"IDAT", &deflate_scanlines(pixels, width * 4)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Prefix each scanline with filter type 0 and zlib-compress.
fn deflate_scanlines(data: &[u8], row_bytes: usize) -> PngResult<Vec<u8>> {
    let rows = data.len() / row_bytes;
    let mut raw = Vec::with_capacity(rows * (row_bytes + 1));
    for row in data.chunks_exact(row_bytes) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let start = png.len();
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);
    let crc = crc32fast::hash(&png[start..]);
    png.extend_from_slice(&crc.to_be_bytes());
}
