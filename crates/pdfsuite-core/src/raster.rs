//! Raster image assets (JPEG and PNG) and their PDF image XObject encoding

use crate::error::PdfSuiteError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use flate2::{write::ZlibEncoder, Compression};
use image::{ImageDecoder, ImageFormat};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::io::{Cursor, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Jpeg,
    Png,
}

/// A decoded-enough image: format, pixel dimensions and the original bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    format: RasterFormat,
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

/// Image data laid out the way a PDF image XObject wants it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
    /// `DCTDecode` for JPEG passthrough, `FlateDecode` for decoded pixels.
    pub filter: &'static str,
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit alpha channel, present only when some pixel is translucent.
    pub soft_mask: Option<Vec<u8>>,
}

impl RasterImage {
    /// Sniff and validate an image. Only JPEG and PNG are accepted.
    pub fn decode(bytes: &[u8]) -> Result<Self, PdfSuiteError> {
        let format = image::guess_format(bytes)
            .map_err(|e| PdfSuiteError::UnsupportedAsset(e.to_string()))?;

        match format {
            ImageFormat::Jpeg => {
                let decoder = image::codecs::jpeg::JpegDecoder::new(Cursor::new(bytes))
                    .map_err(|e| PdfSuiteError::UnsupportedAsset(e.to_string()))?;
                let (width, height) = decoder.dimensions();
                Self::checked(RasterFormat::Jpeg, width, height, bytes)
            }
            ImageFormat::Png => {
                let decoder = png::Decoder::new(Cursor::new(bytes));
                let reader = decoder
                    .read_info()
                    .map_err(|e| PdfSuiteError::UnsupportedAsset(e.to_string()))?;
                let info = reader.info();
                Self::checked(RasterFormat::Png, info.width, info.height, bytes)
            }
            other => Err(PdfSuiteError::UnsupportedAsset(format!(
                "{:?} images are not supported, use JPEG or PNG",
                other
            ))),
        }
    }

    /// Accept a `data:image/...;base64,` URL such as a signature pad export.
    pub fn from_data_url(url: &str) -> Result<Self, PdfSuiteError> {
        let (header, payload) = url
            .split_once(',')
            .ok_or_else(|| PdfSuiteError::UnsupportedAsset("Malformed data URL".to_string()))?;
        if !header.starts_with("data:image/") || !header.ends_with(";base64") {
            return Err(PdfSuiteError::UnsupportedAsset(format!(
                "Expected a base64 image data URL, got '{}'",
                header
            )));
        }
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| PdfSuiteError::UnsupportedAsset(e.to_string()))?;
        Self::decode(&bytes)
    }

    fn checked(
        format: RasterFormat,
        width: u32,
        height: u32,
        bytes: &[u8],
    ) -> Result<Self, PdfSuiteError> {
        if width == 0 || height == 0 {
            return Err(PdfSuiteError::UnsupportedAsset(
                "Image has zero dimensions".to_string(),
            ));
        }
        Ok(Self {
            format,
            width,
            height,
            bytes: bytes.to_vec(),
        })
    }

    pub fn format(&self) -> RasterFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Height that keeps the intrinsic aspect ratio at the given width.
    pub fn height_for_width(&self, width: f64) -> f64 {
        width * (f64::from(self.height) / f64::from(self.width))
    }

    /// Produce the XObject payload.
    pub fn encode(&self) -> Result<EncodedImage, PdfSuiteError> {
        match self.format {
            RasterFormat::Jpeg => self.encode_jpeg(),
            RasterFormat::Png => self.encode_png(),
        }
    }

    fn encode_jpeg(&self) -> Result<EncodedImage, PdfSuiteError> {
        let decoder = image::codecs::jpeg::JpegDecoder::new(Cursor::new(&self.bytes))
            .map_err(|e| PdfSuiteError::UnsupportedAsset(e.to_string()))?;
        let color_space = match decoder.original_color_type() {
            image::ExtendedColorType::L8 => "DeviceGray",
            image::ExtendedColorType::Cmyk8 => "DeviceCMYK",
            _ => "DeviceRGB",
        };
        Ok(EncodedImage {
            width: self.width,
            height: self.height,
            color_space,
            filter: "DCTDecode",
            data: self.bytes.clone(),
            soft_mask: None,
        })
    }

    fn encode_png(&self) -> Result<EncodedImage, PdfSuiteError> {
        let mut decoder = png::Decoder::new(Cursor::new(&self.bytes));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|e| PdfSuiteError::UnsupportedAsset(e.to_string()))?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let frame = reader
            .next_frame(&mut buf)
            .map_err(|e| PdfSuiteError::UnsupportedAsset(e.to_string()))?;
        let pixels = &buf[..frame.buffer_size()];

        let (channels, has_alpha, color_space) = match frame.color_type {
            png::ColorType::Grayscale => (1, false, "DeviceGray"),
            png::ColorType::GrayscaleAlpha => (2, true, "DeviceGray"),
            png::ColorType::Rgb => (3, false, "DeviceRGB"),
            png::ColorType::Rgba => (4, true, "DeviceRGB"),
            png::ColorType::Indexed => {
                return Err(PdfSuiteError::UnsupportedAsset(
                    "Indexed PNG was not expanded".to_string(),
                ))
            }
        };
        let color_channels = if has_alpha { channels - 1 } else { channels };

        let mut color = Vec::with_capacity(pixels.len());
        let mut alpha = Vec::new();
        for px in pixels.chunks_exact(channels) {
            color.extend_from_slice(&px[..color_channels]);
            if has_alpha {
                alpha.push(px[color_channels]);
            }
        }

        let soft_mask = if has_alpha && alpha.iter().any(|&a| a != u8::MAX) {
            Some(deflate(&alpha)?)
        } else {
            None
        };

        Ok(EncodedImage {
            width: frame.width,
            height: frame.height,
            color_space,
            filter: "FlateDecode",
            data: deflate(&color)?,
            soft_mask,
        })
    }
}

/// Serialized as the base64 of the original file bytes.
impl Serialize for RasterImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(&self.bytes))
    }
}

impl<'de> Deserialize<'de> for RasterImage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(encoded).map_err(serde::de::Error::custom)?;
        RasterImage::decode(&bytes).map_err(serde::de::Error::custom)
    }
}

pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfSuiteError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PdfSuiteError::OperationError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| PdfSuiteError::OperationError(e.to_string()))
}
