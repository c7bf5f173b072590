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

//! Defines data structures related to GPU texture and sampler resources.

use crate::math::Extent3D;
use crate::renderer::api::pipeline::CompareFunction;
use crate::renderer::api::util::{format, SampleCount, TextureFormat};
use bitflags::bitflags;
use std::borrow::Cow;

/// The dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    /// A one-dimensional texture.
    D1,
    /// A two-dimensional texture.
    #[default]
    D2,
    /// A three-dimensional (volumetric) texture.
    D3,
}

/// Defines how texture coordinates are handled when sampling outside the `[0, 1]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Coordinates wrap around.
    Repeat,
    /// Coordinates are clamped to the edge.
    ClampToEdge,
    /// Coordinates wrap around, mirroring at each integer boundary.
    MirrorRepeat,
    /// Coordinates outside the range are given a fixed border color.
    ClampToBorder,
}

/// Defines the filtering mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Returns the value of the nearest texel.
    Nearest,
    /// Returns a weighted average of the nearest texels.
    Linear,
}

/// Defines the filtering mode between mipmap levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipmapFilterMode {
    /// Use the nearest mipmap level.
    Nearest,
    /// Linearly interpolate between the two nearest mipmap levels.
    Linear,
}

/// The border color to use when `AddressMode::ClampToBorder` is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerBorderColor {
    /// `[0.0, 0.0, 0.0, 0.0]`.
    TransparentBlack,
    /// `[0.0, 0.0, 0.0, 1.0]`.
    OpaqueBlack,
    /// `[1.0, 1.0, 1.0, 1.0]`.
    OpaqueWhite,
}

bitflags! {
    /// Allowed usages of a texture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// The texture can be the source of a copy operation.
        const COPY_SRC = 1 << 0;
        /// The texture can be the destination of a copy operation.
        const COPY_DST = 1 << 1;
        /// The texture can be bound in a shader for sampling.
        const TEXTURE_BINDING = 1 << 2;
        /// The texture can be used as a storage texture.
        const STORAGE_BINDING = 1 << 3;
        /// The texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The dimensions of the texture.
    pub size: Extent3D,
    /// The number of mipmap levels.
    pub mip_level_count: u32,
    /// The number of samples per pixel.
    pub sample_count: SampleCount,
    /// The dimensionality of the texture.
    pub dimension: TextureDimension,
    /// The format of the texels.
    pub format: TextureFormat,
    /// How the texture will be used.
    pub usage: TextureUsage,
}

impl<'a> TextureDescriptor<'a> {
    /// A sampled, copyable 2D texture with a single mip level.
    pub fn d2(label: &'a str, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            size: Extent3D::d2(width, height),
            mip_level_count: 1,
            sample_count: SampleCount::X1,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST | TextureUsage::COPY_SRC,
        }
    }

    /// Byte size of mip level 0, or 0 when the format has no per-pixel size.
    pub fn base_level_size(&self) -> u64 {
        self.size.texel_count() * format::format_size(self.format) as u64
    }
}

/// Describes how a shader samples a texture.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The address mode for the U coordinate.
    pub address_mode_u: AddressMode,
    /// The address mode for the V coordinate.
    pub address_mode_v: AddressMode,
    /// The address mode for the W coordinate.
    pub address_mode_w: AddressMode,
    /// The magnification filter.
    pub mag_filter: FilterMode,
    /// The minification filter.
    pub min_filter: FilterMode,
    /// The filter between mipmap levels.
    pub mipmap_filter: MipmapFilterMode,
    /// The minimum level of detail.
    pub lod_min_clamp: f32,
    /// The maximum level of detail.
    pub lod_max_clamp: f32,
    /// If `Some`, this is a comparison sampler.
    pub compare: Option<CompareFunction>,
    /// The maximum anisotropy level; 1 disables anisotropic filtering.
    pub anisotropy_clamp: u16,
    /// The border color used with `ClampToBorder`.
    pub border_color: Option<SamplerBorderColor>,
}

impl Default for SamplerDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: MipmapFilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            anisotropy_clamp: 1,
            border_color: None,
        }
    }
}

/// A CPU-side copy of a texture's pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuTexture {
    /// Tightly packed pixel rows.
    pub pixels: Vec<u8>,
    /// The size of the texture.
    pub size: Extent3D,
    /// The format of the pixel data.
    pub format: TextureFormat,
}

impl CpuTexture {
    /// Gets the unpadded row size in bytes.
    pub fn row_size(&self) -> usize {
        format::row_pitch(self.format, self.size.width) as usize
    }
}

/// An opaque handle to a GPU texture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);
