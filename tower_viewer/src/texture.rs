use std::{borrow::Cow, path::Path};

use anyhow::{Result, ensure};
use tower_core::{AssetMissingWarning, FloorId, FloorSpec, assets};

/// Decoded RGBA8 pixels for one floor background (or a stand-in).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Resolve and decode the background for `floor`.
///
/// Both a missing file and an undecodable one come back as a warning so the
/// caller can fall back to [`placeholder_floor`] and keep going.
pub fn load_floor_image(
    asset_root: &Path,
    floor: &FloorSpec,
) -> Result<FloorImage, AssetMissingWarning> {
    let path = assets::resolve_background(asset_root, floor)?;
    let decoded = image::open(&path).map_err(|err| AssetMissingWarning {
        floor: floor.id,
        path: path.clone(),
        reason: err.to_string(),
    })?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::debug!(
        "[texture] floor {} background {}x{} from {}",
        floor.id,
        width,
        height,
        path.display()
    );
    Ok(FloorImage {
        width,
        height,
        data: rgba.into_raw(),
    })
}

/// Banded stand-in for a floor whose background could not be loaded. The
/// tint is derived from the identifier so neighbouring floors stay apart.
pub fn placeholder_floor(id: FloorId) -> FloorImage {
    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 64;
    let seed = id
        .to_le_bytes()
        .iter()
        .fold(0x5Au8, |acc, &b| acc.wrapping_mul(31).wrapping_add(b));
    let base = [
        0x30u8.wrapping_add(seed % 0x40),
        0x38u8.wrapping_add(seed.rotate_left(3) % 0x40),
        0x48u8.wrapping_add(seed.rotate_left(5) % 0x40),
    ];

    let mut data = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    for (idx, pixel) in data.chunks_mut(4).enumerate() {
        let x = idx as u32 % WIDTH;
        let y = idx as u32 / WIDTH;
        let stripe = (x + y) / 8 % 2 == 0;
        let edge = y == 0 || y == HEIGHT - 1;
        for (channel, value) in pixel.iter_mut().take(3).zip(base) {
            *channel = if edge {
                0x10
            } else if stripe {
                value
            } else {
                value.saturating_add(0x18)
            };
        }
        pixel[3] = 0xFF;
    }

    FloorImage {
        width: WIDTH,
        height: HEIGHT,
        data,
    }
}

/// Outline drawn over the car's floor: opaque border, translucent fill.
pub fn car_frame_image() -> FloorImage {
    const SIZE: u32 = 16;
    let mut data = vec![0u8; (SIZE * SIZE * 4) as usize];
    for (idx, pixel) in data.chunks_mut(4).enumerate() {
        let x = idx as u32 % SIZE;
        let y = idx as u32 / SIZE;
        let border = x == 0 || y == 0 || x == SIZE - 1 || y == SIZE - 1;
        let rgba = if border {
            [0xF2, 0xC4, 0x4E, 0xFF]
        } else {
            [0xF2, 0xC4, 0x4E, 0x30]
        };
        pixel.copy_from_slice(&rgba);
    }
    FloorImage {
        width: SIZE,
        height: SIZE,
        data,
    }
}

pub struct TextureUpload<'a> {
    data: Cow<'a, [u8]>,
    bytes_per_row: u32,
}

impl TextureUpload<'_> {
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }
}

/// Lay `image` out for `Queue::write_texture`, padding rows to the copy
/// alignment when needed.
pub fn prepare_rgba_upload(image: &FloorImage) -> Result<TextureUpload<'_>> {
    ensure!(
        image.width > 0 && image.height > 0,
        "floor image has no dimensions"
    );
    let row_bytes = 4usize * image.width as usize;
    let rows = image.height as usize;
    ensure!(
        image.data.len() == row_bytes * rows,
        "floor image buffer ({}) does not match {}x{} RGBA ({})",
        image.data.len(),
        image.width,
        image.height,
        row_bytes * rows
    );

    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    if row_bytes % alignment == 0 {
        return Ok(TextureUpload {
            data: Cow::Borrowed(&image.data),
            bytes_per_row: row_bytes as u32,
        });
    }

    let padded_row_bytes = row_bytes.div_ceil(alignment) * alignment;
    let mut buffer = vec![0u8; padded_row_bytes * rows];
    for (src, dst) in image
        .data
        .chunks_exact(row_bytes)
        .zip(buffer.chunks_exact_mut(padded_row_bytes))
    {
        dst[..row_bytes].copy_from_slice(src);
    }

    Ok(TextureUpload {
        data: Cow::Owned(buffer),
        bytes_per_row: padded_row_bytes as u32,
    })
}
