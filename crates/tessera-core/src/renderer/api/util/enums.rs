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

//! Generic rendering enums.

use serde::{Deserialize, Serialize};

/// A backend-agnostic representation of a graphics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GraphicsBackendType {
    /// Vulkan API.
    Vulkan,
    /// Apple's Metal API.
    Metal,
    /// Microsoft's DirectX 12 API.
    Dx12,
    /// Microsoft's DirectX 11 API.
    Dx11,
    /// OpenGL API.
    OpenGL,
    /// WebGPU API (for web builds).
    WebGpu,
    /// A CPU-side backend with no native context.
    Headless,
    /// An unknown or unsupported backend.
    #[default]
    Unknown,
}

/// The physical type of a graphics device (GPU).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RendererDeviceType {
    /// A GPU integrated into the CPU.
    IntegratedGpu,
    /// A discrete, dedicated GPU.
    DiscreteGpu,
    /// A virtualized or software-based GPU.
    VirtualGpu,
    /// A software renderer running on the CPU.
    Cpu,
    /// An unknown or unsupported device type.
    #[default]
    Unknown,
}

/// The number of samples per pixel for Multisample Anti-Aliasing (MSAA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleCount {
    /// 1 sample per pixel (MSAA disabled).
    #[default]
    X1,
    /// 2 samples per pixel.
    X2,
    /// 4 samples per pixel.
    X4,
    /// 8 samples per pixel.
    X8,
}

impl SampleCount {
    /// The sample count as a plain integer.
    pub fn count(self) -> u32 {
        match self {
            SampleCount::X1 => 1,
            SampleCount::X2 => 2,
            SampleCount::X4 => 4,
            SampleCount::X8 => 8,
        }
    }
}

/// The programmable pipeline stage a shader is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex shader stage.
    Vertex,
    /// The fragment (or pixel) shader stage.
    Fragment,
    /// The geometry shader stage.
    Geometry,
    /// The tessellation control (hull) stage.
    Hull,
    /// The tessellation evaluation (domain) stage.
    Domain,
    /// The compute shader stage.
    Compute,
}

impl ShaderStage {
    /// The entry point name shaders are expected to export for this stage.
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
            ShaderStage::Geometry => "gs_main",
            ShaderStage::Hull => "hs_main",
            ShaderStage::Domain => "ds_main",
            ShaderStage::Compute => "main",
        }
    }

    /// Short tag used when naming cached programs.
    pub fn tag(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs",
            ShaderStage::Fragment => "ps",
            ShaderStage::Geometry => "gs",
            ShaderStage::Hull => "hs",
            ShaderStage::Domain => "ds",
            ShaderStage::Compute => "cs",
        }
    }
}

/// Defines the memory format of pixels in a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    // 8-bit formats
    /// One 8-bit unsigned normalized component.
    R8Unorm,
    /// One 8-bit unsigned integer component.
    R8Uint,
    /// Two 8-bit unsigned normalized components.
    Rg8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA).
    Rgba8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA) in the sRGB color space.
    Rgba8UnormSrgb,
    /// Four 8-bit unsigned normalized components (BGRA).
    Bgra8Unorm,
    /// Four 8-bit unsigned normalized components (BGRA) in the sRGB color space.
    Bgra8UnormSrgb,
    // Packed formats
    /// Packed 10-10-10-2 unsigned normalized RGBA.
    Rgb10a2Unorm,
    /// Packed 11-11-10 unsigned float RGB.
    Rg11b10Ufloat,
    // 16-bit formats
    /// One 16-bit float component.
    R16Float,
    /// One 16-bit unsigned integer component.
    R16Uint,
    /// Two 16-bit float components.
    Rg16Float,
    /// Four 16-bit float components.
    Rgba16Float,
    // 32-bit formats
    /// One 32-bit float component.
    R32Float,
    /// One 32-bit unsigned integer component.
    R32Uint,
    /// Two 32-bit float components.
    Rg32Float,
    /// Three 32-bit float components. Not renderable; vertex and staging data only.
    Rgb32Float,
    /// Four 32-bit float components.
    Rgba32Float,
    /// Four 32-bit unsigned integer components.
    Rgba32Uint,
    // Depth/stencil formats
    /// A 16-bit unsigned normalized depth format.
    Depth16Unorm,
    /// A 24-bit unsigned normalized depth format.
    Depth24Plus,
    /// A 24-bit depth format with an 8-bit stencil component.
    Depth24PlusStencil8,
    /// A 32-bit float depth format.
    Depth32Float,
    /// A 32-bit float depth format with an 8-bit stencil component.
    Depth32FloatStencil8,
    // Block-compressed formats
    /// BC1 block compression (RGBA, 4x4 blocks).
    Bc1RgbaUnorm,
    /// BC3 block compression (RGBA, 4x4 blocks).
    Bc3RgbaUnorm,
    /// BC7 block compression (RGBA, 4x4 blocks).
    Bc7RgbaUnorm,
    /// A format tag the device does not recognize.
    #[default]
    Unknown,
}

impl TextureFormat {
    /// Every uncompressed, recognized format.
    pub const UNCOMPRESSED: [TextureFormat; 24] = [
        TextureFormat::R8Unorm,
        TextureFormat::R8Uint,
        TextureFormat::Rg8Unorm,
        TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Bgra8Unorm,
        TextureFormat::Bgra8UnormSrgb,
        TextureFormat::Rgb10a2Unorm,
        TextureFormat::Rg11b10Ufloat,
        TextureFormat::R16Float,
        TextureFormat::R16Uint,
        TextureFormat::Rg16Float,
        TextureFormat::Rgba16Float,
        TextureFormat::R32Float,
        TextureFormat::R32Uint,
        TextureFormat::Rg32Float,
        TextureFormat::Rgb32Float,
        TextureFormat::Rgba32Float,
        TextureFormat::Rgba32Uint,
        TextureFormat::Depth16Unorm,
        TextureFormat::Depth24Plus,
        TextureFormat::Depth24PlusStencil8,
        TextureFormat::Depth32Float,
        TextureFormat::Depth32FloatStencil8,
    ];

    /// Returns `true` for formats carrying depth and/or stencil.
    pub fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth24Plus
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32Float
                | TextureFormat::Depth32FloatStencil8
        )
    }

    /// Returns `true` for block-compressed formats, which have no per-pixel size.
    pub fn is_compressed(self) -> bool {
        matches!(
            self,
            TextureFormat::Bc1RgbaUnorm | TextureFormat::Bc3RgbaUnorm | TextureFormat::Bc7RgbaUnorm
        )
    }

    /// Returns the size in bytes of a single pixel, or 0 when the format has
    /// no per-pixel size.
    pub fn bytes_per_pixel(self) -> u32 {
        super::format::format_size(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_entry_points_follow_naming_convention() {
        assert_eq!(ShaderStage::Vertex.entry_point(), "vs_main");
        assert_eq!(ShaderStage::Fragment.entry_point(), "fs_main");
        assert_eq!(ShaderStage::Geometry.entry_point(), "gs_main");
        assert_eq!(ShaderStage::Hull.entry_point(), "hs_main");
        assert_eq!(ShaderStage::Domain.entry_point(), "ds_main");
        assert_eq!(ShaderStage::Compute.entry_point(), "main");
    }

    #[test]
    fn backend_type_deserializes_from_variant_name() {
        let parsed: GraphicsBackendType = serde_json::from_str("\"Vulkan\"").unwrap();
        assert_eq!(parsed, GraphicsBackendType::Vulkan);
    }

    #[test]
    fn depth_formats_are_flagged() {
        assert!(TextureFormat::Depth32Float.is_depth_stencil());
        assert!(!TextureFormat::Rgba8Unorm.is_depth_stencil());
        assert!(TextureFormat::Bc7RgbaUnorm.is_compressed());
    }
}
