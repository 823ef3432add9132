//! Shared fixtures for the end-to-end pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use darkroom_core::storage::{ObjectStore, StorageError, StorageResult};
use darkroom_core::Config;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

pub const SLUG: &str = "9b2f4c1e-7d3a-4e8b-a5c6-0f1e2d3c4b5a";

/// Config with every ladder kept but scaled down to small test images.
pub fn small_config() -> Config {
    let mut config = Config::default();
    config.derivatives.tile_widths = vec![16, 32, 48];
    config.derivatives.thumbnail_widths = vec![8];
    config.derivatives.blur_long_side = 4;
    config.pipeline.workers = 2;
    config.pipeline.queue_capacity = 4;
    config
}

/// A JPEG with a red 12x12 block in the top-left corner on grey.
pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if x < 12 && y < 12 {
            Rgb([255, 0, 0])
        } else {
            Rgb([128, 128, 128])
        }
    });
    let mut buffer = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, 95))
        .expect("encode fixture jpeg");
    buffer
}

/// A JPEG with an EXIF orientation and DateTimeOriginal.
pub fn jpeg_with_exif(width: u32, height: u32, orientation: u16, original: &str) -> Vec<u8> {
    assert_eq!(original.len(), 19);
    let jpeg = jpeg(width, height);

    // Big-endian TIFF: IFD0 {Orientation, ExifIFD pointer}, Exif IFD {DateTimeOriginal}
    let ifd0_len = 2 + 12 * 2 + 4;
    let exif_ifd_offset = 8 + ifd0_len;
    let data_offset = exif_ifd_offset + 2 + 12 + 4;

    let mut tiff = b"MM\x00\x2A".to_vec();
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&2u16.to_be_bytes());
    entry(&mut tiff, 0x0112, 3, 1, u32::from(orientation) << 16);
    entry(&mut tiff, 0x8769, 4, 1, exif_ifd_offset as u32);
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    entry(&mut tiff, 0x9003, 2, 20, data_offset as u32);
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(original.as_bytes());
    tiff.push(0);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);

    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
    out.extend_from_slice(&tag.to_be_bytes());
    out.extend_from_slice(&kind.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&value.to_be_bytes());
}

/// Wraps a store and rejects writes to keys containing `fail_on`.
pub struct FailingPutStore<S> {
    pub inner: S,
    pub fail_on: String,
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for FailingPutStore<S> {
    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.inner.get_object(key).await
    }

    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        if key.contains(&self.fail_on) {
            return Err(StorageError::Backend(format!("injected write failure for {key}")));
        }
        self.inner.put_object(key, data, content_type).await
    }

    async fn move_object(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        self.inner.move_object(from_key, to_key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }
}
