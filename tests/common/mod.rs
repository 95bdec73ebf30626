//! Tiny on-disk image fixtures.
//!
//! Codecs open every image to read its dimensions, so integration tests need
//! real files. A 24-bit uncompressed BMP is the smallest thing both
//! `imagesize` and `image` accept.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    const HEADER_LEN: u32 = 14 + 40;
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixels_len = row_stride * height;
    let file_len = HEADER_LEN + pixels_len;

    let mut bytes = Vec::with_capacity(file_len as usize);
    // File header
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_len.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&HEADER_LEN.to_le_bytes());
    // BITMAPINFOHEADER
    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixels_len.to_le_bytes());
    for field in [2835u32, 2835, 0, 0] {
        bytes.extend_from_slice(&field.to_le_bytes());
    }

    bytes.resize(file_len as usize, 0);
    bytes
}

/// Writes a black BMP of the given size, creating parent directories.
pub fn write_bmp(path: &Path, width: u32, height: u32) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
    path.to_path_buf()
}

/// Path of `path` as an image key.
pub fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
