#![doc = include_str!("../README.md")]

use ironvnc_pdu::handshake::PixelFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RawDecodeError {
    #[error("unsupported pixel format: {bits_per_pixel} bits per pixel")]
    UnsupportedPixelFormat { bits_per_pixel: u8 },

    #[error("invalid pixel payload size: received {received} bytes, expected {expected}")]
    InvalidPayloadSize { received: usize, expected: usize },
}

/// Converts raw-encoded pixels into RGBA bytes.
///
/// Each 32-bit pixel is read with the format's endianness, its channels are
/// extracted with the format's shifts, and the top byte is carried over as
/// alpha. Pixel order is preserved (row-major, top-left origin). Only 32-bit
/// formats are supported.
pub fn decode_raw(
    raw: &[u8],
    format: &PixelFormat,
    width: u16,
    height: u16,
) -> Result<Vec<u8>, RawDecodeError> {
    if format.bytes_per_pixel() != 4 {
        return Err(RawDecodeError::UnsupportedPixelFormat {
            bits_per_pixel: format.bits_per_pixel,
        });
    }

    let expected = usize::from(width) * usize::from(height) * 4;

    if raw.len() != expected {
        return Err(RawDecodeError::InvalidPayloadSize {
            received: raw.len(),
            expected,
        });
    }

    let mut rgba = Vec::with_capacity(expected);

    for chunk in raw.chunks_exact(4) {
        let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let pixel = if format.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        };

        rgba.push(((pixel >> format.red_shift) & 0xff) as u8);
        rgba.push(((pixel >> format.green_shift) & 0xff) as u8);
        rgba.push(((pixel >> format.blue_shift) & 0xff) as u8);
        rgba.push((pixel >> 24) as u8);
    }

    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn rgb32_format(big_endian: bool) -> PixelFormat {
        PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            big_endian,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    #[rstest]
    #[case(false, [0x44, 0x33, 0x22, 0x11])]
    #[case(true, [0x11, 0x22, 0x33, 0x44])]
    fn channel_extraction_honors_endianness(#[case] big_endian: bool, #[case] raw: [u8; 4]) {
        // Pixel value 0x11223344: alpha 0x11, red 0x22, green 0x33, blue 0x44.
        let rgba = decode_raw(&raw, &rgb32_format(big_endian), 1, 1).unwrap();

        assert_eq!(rgba, [0x22, 0x33, 0x44, 0x11]);
    }

    #[test]
    fn pixel_order_is_preserved() {
        // Two pixels, little endian: red-only then green-only.
        let raw = [
            0x00, 0x00, 0xff, 0x00, // red = 0xff
            0x00, 0xff, 0x00, 0x00, // green = 0xff
        ];

        let rgba = decode_raw(&raw, &rgb32_format(false), 2, 1).unwrap();

        assert_eq!(rgba, [0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0x00, 0x00]);
    }

    #[test]
    fn output_length_is_area_times_four() {
        let raw = vec![0u8; 120 * 50 * 4];

        let rgba = decode_raw(&raw, &rgb32_format(false), 120, 50).unwrap();

        assert_eq!(rgba.len(), 120 * 50 * 4);
    }

    #[test]
    fn non_32_bit_formats_are_unsupported() {
        let mut format = rgb32_format(false);
        format.bits_per_pixel = 16;

        let result = decode_raw(&[0u8; 2], &format, 1, 1);

        assert!(matches!(result, Err(RawDecodeError::UnsupportedPixelFormat { bits_per_pixel: 16 })));
    }

    #[test]
    fn payload_size_must_match_geometry() {
        let result = decode_raw(&[0u8; 7], &rgb32_format(false), 1, 2);

        assert!(matches!(
            result,
            Err(RawDecodeError::InvalidPayloadSize {
                received: 7,
                expected: 8,
            })
        ));
    }
}
