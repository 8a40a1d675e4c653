// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! QR codes for deposit addresses.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{imageops, GrayImage, ImageFormat, Luma};
use qrcode::QrCode;
use thiserror::Error;

/// Pixels per module.
const MODULE_SIZE: u32 = 6;

/// Light border around the code, in modules.
const BORDER_MODULES: u32 = 2;

#[derive(Debug, Error)]
pub enum QrCodeError {
    #[error("Data cannot be encoded as a QR code: {0}")]
    Encode(String),
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Render `data` as a black-on-white PNG QR code, base64 encoded.
pub fn qr_code_png_base64(data: &str) -> Result<String, QrCodeError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| QrCodeError::Encode(e.to_string()))?;
    let modules = code
        .render::<Luma<u8>>()
        .dark_color(Luma([0]))
        .light_color(Luma([255]))
        .quiet_zone(false)
        .module_dimensions(MODULE_SIZE, MODULE_SIZE)
        .build();

    let border = BORDER_MODULES * MODULE_SIZE;
    let mut canvas = GrayImage::from_pixel(
        modules.width() + 2 * border,
        modules.height() + 2 * border,
        Luma([255]),
    );
    imageops::overlay(&mut canvas, &modules, i64::from(border), i64::from(border));

    let mut png = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(STANDARD.encode(png))
}
