// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pure pixel-format arithmetic.
//!
//! Unknown and block-compressed formats report a size of 0, which callers
//! treat as "unknown" rather than as an error.

use super::enums::TextureFormat;

/// Returns the size in bytes of one pixel of `format`.
///
/// ## Returns
/// One of 1, 2, 4, 8, 12 or 16 for every recognized uncompressed format, 0 otherwise.
pub fn format_size(format: TextureFormat) -> u32 {
    match format {
        TextureFormat::R8Unorm | TextureFormat::R8Uint => 1,

        TextureFormat::Rg8Unorm
        | TextureFormat::R16Float
        | TextureFormat::R16Uint
        | TextureFormat::Depth16Unorm => 2,

        TextureFormat::Rgba8Unorm
        | TextureFormat::Rgba8UnormSrgb
        | TextureFormat::Bgra8Unorm
        | TextureFormat::Bgra8UnormSrgb
        | TextureFormat::Rgb10a2Unorm
        | TextureFormat::Rg11b10Ufloat
        | TextureFormat::Rg16Float
        | TextureFormat::R32Float
        | TextureFormat::R32Uint
        | TextureFormat::Depth24Plus
        | TextureFormat::Depth24PlusStencil8
        | TextureFormat::Depth32Float => 4,

        // 32-bit depth plus stencil occupies two dwords once padded.
        TextureFormat::Rgba16Float | TextureFormat::Rg32Float | TextureFormat::Depth32FloatStencil8 => 8,

        TextureFormat::Rgb32Float => 12,

        TextureFormat::Rgba32Float | TextureFormat::Rgba32Uint => 16,

        TextureFormat::Bc1RgbaUnorm
        | TextureFormat::Bc3RgbaUnorm
        | TextureFormat::Bc7RgbaUnorm
        | TextureFormat::Unknown => 0,
    }
}

/// Bytes covered by one row of `width` pixels.
pub fn row_pitch(format: TextureFormat, width: u32) -> u32 {
    format_size(format).saturating_mul(width)
}

/// Bytes covered by one `width` x `height` slice.
pub fn depth_pitch(format: TextureFormat, width: u32, height: u32) -> u32 {
    row_pitch(format, width).saturating_mul(height)
}

/// Length of a full mip chain for a `width` x `height` image.
///
/// Equals `1 + floor(log2(max(width, height)))`, and 0 for an empty image.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height);
    if width == 0 || height == 0 {
        return 0;
    }
    u32::BITS - largest.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_uncompressed_format_has_a_known_size() {
        for format in TextureFormat::UNCOMPRESSED {
            let size = format_size(format);
            assert!(
                [1, 2, 4, 8, 12, 16].contains(&size),
                "{format:?} reported {size} bytes"
            );
        }
    }

    #[test]
    fn unknown_and_compressed_formats_report_zero() {
        assert_eq!(format_size(TextureFormat::Unknown), 0);
        assert_eq!(format_size(TextureFormat::Bc1RgbaUnorm), 0);
        assert_eq!(row_pitch(TextureFormat::Unknown, 128), 0);
    }

    #[test]
    fn pitches_scale_with_dimensions() {
        assert_eq!(row_pitch(TextureFormat::Rgba8Unorm, 256), 1024);
        assert_eq!(depth_pitch(TextureFormat::Rgba8Unorm, 256, 4), 4096);
        assert_eq!(depth_pitch(TextureFormat::Rgb32Float, 2, 2), 48);
    }

    #[test]
    fn mip_chain_length() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(300, 200), 9);
        assert_eq!(mip_level_count(512, 1), 10);
        assert_eq!(mip_level_count(0, 64), 0);
    }

    #[test]
    fn mip_chain_matches_log2_formula() {
        for (w, h) in [(3u32, 5u32), (1024, 768), (7, 7), (65535, 2)] {
            let expected = 1 + (w.max(h) as f64).log2().floor() as u32;
            assert_eq!(mip_level_count(w, h), expected, "{w}x{h}");
        }
    }
}
