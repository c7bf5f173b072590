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

use tessera_core::math::{Extent3D, Origin3D};
use tessera_core::renderer::{
    AddressMode, BlendComponentDescriptor, BlendFactor, BlendOperation, BlendStateDescriptor,
    ColorWrites, CompareFunction, CullMode, DepthStencilStateDescriptor, FilterMode, FrontFace,
    GraphicsBackendType, MipmapFilterMode, PolygonMode, RasterizerStateDescriptor,
    RendererDeviceType, SampleCount, SamplerBorderColor, StencilFaceState, StencilOperation,
    TextureDimension, TextureFormat, TextureUsage, VertexFormat, VertexStepMode,
};

/// A local extension trait to convert our device's types into WGPU-compatible types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

// --- Dimensions and Origins ---

impl IntoWgpu<wgpu::Extent3d> for Extent3D {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: self.depth_or_array_layers,
        }
    }
}

impl IntoWgpu<wgpu::Origin3d> for Origin3D {
    fn into_wgpu(self) -> wgpu::Origin3d {
        wgpu::Origin3d {
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }
}

// --- Texture related Enums ---

impl IntoWgpu<wgpu::TextureDimension> for TextureDimension {
    fn into_wgpu(self) -> wgpu::TextureDimension {
        match self {
            TextureDimension::D1 => wgpu::TextureDimension::D1,
            TextureDimension::D2 => wgpu::TextureDimension::D2,
            TextureDimension::D3 => wgpu::TextureDimension::D3,
        }
    }
}

impl IntoWgpu<wgpu::TextureUsages> for TextureUsage {
    fn into_wgpu(self) -> wgpu::TextureUsages {
        let mut usages = wgpu::TextureUsages::empty();
        for (ours, theirs) in [
            (TextureUsage::COPY_SRC, wgpu::TextureUsages::COPY_SRC),
            (TextureUsage::COPY_DST, wgpu::TextureUsages::COPY_DST),
            (TextureUsage::TEXTURE_BINDING, wgpu::TextureUsages::TEXTURE_BINDING),
            (TextureUsage::STORAGE_BINDING, wgpu::TextureUsages::STORAGE_BINDING),
            (TextureUsage::RENDER_ATTACHMENT, wgpu::TextureUsages::RENDER_ATTACHMENT),
        ] {
            if self.contains(ours) {
                usages |= theirs;
            }
        }
        usages
    }
}

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
            AddressMode::ClampToBorder => wgpu::AddressMode::ClampToBorder,
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::MipmapFilterMode> for MipmapFilterMode {
    fn into_wgpu(self) -> wgpu::MipmapFilterMode {
        match self {
            MipmapFilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
            MipmapFilterMode::Linear => wgpu::MipmapFilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::SamplerBorderColor> for SamplerBorderColor {
    fn into_wgpu(self) -> wgpu::SamplerBorderColor {
        match self {
            SamplerBorderColor::TransparentBlack => wgpu::SamplerBorderColor::TransparentBlack,
            SamplerBorderColor::OpaqueBlack => wgpu::SamplerBorderColor::OpaqueBlack,
            SamplerBorderColor::OpaqueWhite => wgpu::SamplerBorderColor::OpaqueWhite,
        }
    }
}

/// `None` for formats WGPU has no texture equivalent of.
impl IntoWgpu<Option<wgpu::TextureFormat>> for TextureFormat {
    fn into_wgpu(self) -> Option<wgpu::TextureFormat> {
        let format = match self {
            TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
            TextureFormat::R8Uint => wgpu::TextureFormat::R8Uint,
            TextureFormat::Rg8Unorm => wgpu::TextureFormat::Rg8Unorm,
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Rgb10a2Unorm => wgpu::TextureFormat::Rgb10a2Unorm,
            TextureFormat::Rg11b10Ufloat => wgpu::TextureFormat::Rg11b10Ufloat,
            TextureFormat::R16Float => wgpu::TextureFormat::R16Float,
            TextureFormat::R16Uint => wgpu::TextureFormat::R16Uint,
            TextureFormat::Rg16Float => wgpu::TextureFormat::Rg16Float,
            TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TextureFormat::R32Float => wgpu::TextureFormat::R32Float,
            TextureFormat::R32Uint => wgpu::TextureFormat::R32Uint,
            TextureFormat::Rg32Float => wgpu::TextureFormat::Rg32Float,
            TextureFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            TextureFormat::Rgba32Uint => wgpu::TextureFormat::Rgba32Uint,
            TextureFormat::Depth16Unorm => wgpu::TextureFormat::Depth16Unorm,
            TextureFormat::Depth24Plus => wgpu::TextureFormat::Depth24Plus,
            TextureFormat::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
            TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
            TextureFormat::Depth32FloatStencil8 => wgpu::TextureFormat::Depth32FloatStencil8,
            TextureFormat::Bc1RgbaUnorm => wgpu::TextureFormat::Bc1RgbaUnorm,
            TextureFormat::Bc3RgbaUnorm => wgpu::TextureFormat::Bc3RgbaUnorm,
            TextureFormat::Bc7RgbaUnorm => wgpu::TextureFormat::Bc7RgbaUnorm,
            TextureFormat::Rgb32Float | TextureFormat::Unknown => return None,
        };
        Some(format)
    }
}

impl IntoWgpu<u32> for SampleCount {
    fn into_wgpu(self) -> u32 {
        match self {
            SampleCount::X1 => 1,
            SampleCount::X2 => 2,
            SampleCount::X4 => 4,
            SampleCount::X8 => 8,
        }
    }
}

// --- Common Types ---

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

// --- Pipeline related Enums ---

impl IntoWgpu<wgpu::VertexFormat> for VertexFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
            VertexFormat::Float16x2 => wgpu::VertexFormat::Float16x2,
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            VertexFormat::Uint32 => wgpu::VertexFormat::Uint32,
            VertexFormat::Uint32x4 => wgpu::VertexFormat::Uint32x4,
        }
    }
}

impl IntoWgpu<wgpu::VertexStepMode> for VertexStepMode {
    fn into_wgpu(self) -> wgpu::VertexStepMode {
        match self {
            VertexStepMode::Vertex => wgpu::VertexStepMode::Vertex,
            VertexStepMode::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

impl IntoWgpu<wgpu::FrontFace> for FrontFace {
    fn into_wgpu(self) -> wgpu::FrontFace {
        match self {
            FrontFace::Ccw => wgpu::FrontFace::Ccw,
            FrontFace::Cw => wgpu::FrontFace::Cw,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
            CullMode::None => None,
        }
    }
}

impl IntoWgpu<wgpu::PolygonMode> for PolygonMode {
    fn into_wgpu(self) -> wgpu::PolygonMode {
        match self {
            PolygonMode::Fill => wgpu::PolygonMode::Fill,
            PolygonMode::Line => wgpu::PolygonMode::Line,
        }
    }
}

impl IntoWgpu<wgpu::StencilOperation> for StencilOperation {
    fn into_wgpu(self) -> wgpu::StencilOperation {
        match self {
            StencilOperation::Keep => wgpu::StencilOperation::Keep,
            StencilOperation::Zero => wgpu::StencilOperation::Zero,
            StencilOperation::Replace => wgpu::StencilOperation::Replace,
            StencilOperation::Invert => wgpu::StencilOperation::Invert,
            StencilOperation::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
            StencilOperation::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
        }
    }
}

impl IntoWgpu<wgpu::BlendFactor> for BlendFactor {
    fn into_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::Src => wgpu::BlendFactor::Src,
            BlendFactor::Dst => wgpu::BlendFactor::Dst,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        }
    }
}

impl IntoWgpu<wgpu::BlendOperation> for BlendOperation {
    fn into_wgpu(self) -> wgpu::BlendOperation {
        match self {
            BlendOperation::Add => wgpu::BlendOperation::Add,
            BlendOperation::Subtract => wgpu::BlendOperation::Subtract,
            BlendOperation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            BlendOperation::Min => wgpu::BlendOperation::Min,
            BlendOperation::Max => wgpu::BlendOperation::Max,
        }
    }
}

// --- Fixed-function state descriptors ---

impl IntoWgpu<wgpu::StencilFaceState> for StencilFaceState {
    fn into_wgpu(self) -> wgpu::StencilFaceState {
        wgpu::StencilFaceState {
            compare: self.compare.into_wgpu(),
            fail_op: self.fail_op.into_wgpu(),
            depth_fail_op: self.depth_fail_op.into_wgpu(),
            pass_op: self.depth_pass_op.into_wgpu(),
        }
    }
}

/// `None` when the format has no WGPU equivalent.
impl IntoWgpu<Option<wgpu::DepthStencilState>> for &DepthStencilStateDescriptor {
    fn into_wgpu(self) -> Option<wgpu::DepthStencilState> {
        let format: Option<wgpu::TextureFormat> = self.format.into_wgpu();
        // A disabled test is an always-passing compare.
        let depth_compare = if self.depth_test_enabled {
            self.depth_compare
        } else {
            CompareFunction::Always
        };
        let stencil = if self.stencil_enabled {
            wgpu::StencilState {
                front: self.stencil_front.into_wgpu(),
                back: self.stencil_back.into_wgpu(),
                read_mask: self.stencil_read_mask,
                write_mask: self.stencil_write_mask,
            }
        } else {
            wgpu::StencilState::default()
        };

        Some(wgpu::DepthStencilState {
            format: format?,
            depth_write_enabled: Some(self.depth_write_enabled),
            depth_compare: Some(depth_compare.into_wgpu()),
            stencil,
            bias: wgpu::DepthBiasState::default(),
        })
    }
}

impl IntoWgpu<wgpu::PrimitiveState> for &RasterizerStateDescriptor {
    fn into_wgpu(self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            front_face: self.front_face.into_wgpu(),
            cull_mode: self.cull_mode.into_wgpu(),
            polygon_mode: self.polygon_mode.into_wgpu(),
            unclipped_depth: self.unclipped_depth,
            ..Default::default()
        }
    }
}

/// Rasterizer depth bias, which WGPU carries on the depth/stencil state.
impl IntoWgpu<wgpu::DepthBiasState> for &RasterizerStateDescriptor {
    fn into_wgpu(self) -> wgpu::DepthBiasState {
        wgpu::DepthBiasState {
            constant: self.depth_bias.constant,
            slope_scale: self.depth_bias.slope_scale,
            clamp: self.depth_bias.clamp,
        }
    }
}

impl IntoWgpu<wgpu::BlendComponent> for BlendComponentDescriptor {
    fn into_wgpu(self) -> wgpu::BlendComponent {
        wgpu::BlendComponent {
            src_factor: self.src_factor.into_wgpu(),
            dst_factor: self.dst_factor.into_wgpu(),
            operation: self.operation.into_wgpu(),
        }
    }
}

impl IntoWgpu<wgpu::ColorWrites> for ColorWrites {
    fn into_wgpu(self) -> wgpu::ColorWrites {
        wgpu::ColorWrites::from_bits_truncate(self.bits() as u32)
    }
}

impl IntoWgpu<Option<wgpu::BlendState>> for &BlendStateDescriptor {
    fn into_wgpu(self) -> Option<wgpu::BlendState> {
        self.blend.map(|blend| wgpu::BlendState {
            color: blend.color.into_wgpu(),
            alpha: blend.alpha.into_wgpu(),
        })
    }
}

// --- Adapter identity ---

/// Converts a WGPU backend into our generic backend type.
pub fn backend_type_from_wgpu(backend: wgpu::Backend) -> GraphicsBackendType {
    match backend {
        wgpu::Backend::Vulkan => GraphicsBackendType::Vulkan,
        wgpu::Backend::Metal => GraphicsBackendType::Metal,
        wgpu::Backend::Dx12 => GraphicsBackendType::Dx12,
        wgpu::Backend::Gl => GraphicsBackendType::OpenGL,
        wgpu::Backend::BrowserWebGpu => GraphicsBackendType::WebGpu,
        #[allow(unreachable_patterns)]
        _ => GraphicsBackendType::Unknown,
    }
}

/// Converts a WGPU device type into our generic device type.
pub fn device_type_from_wgpu(device_type: wgpu::DeviceType) -> RendererDeviceType {
    match device_type {
        wgpu::DeviceType::IntegratedGpu => RendererDeviceType::IntegratedGpu,
        wgpu::DeviceType::DiscreteGpu => RendererDeviceType::DiscreteGpu,
        wgpu::DeviceType::VirtualGpu => RendererDeviceType::VirtualGpu,
        wgpu::DeviceType::Cpu => RendererDeviceType::Cpu,
        _ => RendererDeviceType::Unknown,
    }
}

/// The WGPU backend set that serves `backend_type`, or `None` when WGPU has no
/// implementation of that API.
pub fn backends_for(backend_type: GraphicsBackendType) -> Option<wgpu::Backends> {
    match backend_type {
        GraphicsBackendType::Vulkan => Some(wgpu::Backends::VULKAN),
        GraphicsBackendType::Metal => Some(wgpu::Backends::METAL),
        GraphicsBackendType::Dx12 => Some(wgpu::Backends::DX12),
        GraphicsBackendType::OpenGL => Some(wgpu::Backends::GL),
        GraphicsBackendType::WebGpu => Some(wgpu::Backends::BROWSER_WEBGPU),
        GraphicsBackendType::Dx11 | GraphicsBackendType::Headless | GraphicsBackendType::Unknown => {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::{BlendEquation, DepthBiasState};

    #[test]
    fn backend_type_round_trips_through_backend_sets() {
        assert_eq!(backends_for(GraphicsBackendType::Vulkan), Some(wgpu::Backends::VULKAN));
        assert_eq!(backends_for(GraphicsBackendType::OpenGL), Some(wgpu::Backends::GL));
        assert_eq!(backends_for(GraphicsBackendType::Dx11), None);
        assert_eq!(backends_for(GraphicsBackendType::Unknown), None);
        assert_eq!(backend_type_from_wgpu(wgpu::Backend::Gl), GraphicsBackendType::OpenGL);
    }

    #[test]
    fn texture_formats_without_wgpu_equivalent_are_none() {
        let rgb: Option<wgpu::TextureFormat> = TextureFormat::Rgb32Float.into_wgpu();
        let unknown: Option<wgpu::TextureFormat> = TextureFormat::Unknown.into_wgpu();
        let depth: Option<wgpu::TextureFormat> = TextureFormat::Depth32Float.into_wgpu();
        assert_eq!(rgb, None);
        assert_eq!(unknown, None);
        assert_eq!(depth, Some(wgpu::TextureFormat::Depth32Float));
    }

    #[test]
    fn usage_flags_map_one_to_one() {
        let usage: wgpu::TextureUsages =
            (TextureUsage::COPY_SRC | TextureUsage::TEXTURE_BINDING).into_wgpu();
        assert_eq!(
            usage,
            wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::TEXTURE_BINDING
        );
    }

    #[test]
    fn disabled_depth_test_compares_always() {
        let descriptor = DepthStencilStateDescriptor {
            format: TextureFormat::Depth32Float,
            depth_test_enabled: false,
            depth_write_enabled: false,
            depth_compare: CompareFunction::Less,
            stencil_enabled: false,
            stencil_front: StencilFaceState::default(),
            stencil_back: StencilFaceState::default(),
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
        };
        let state: Option<wgpu::DepthStencilState> = (&descriptor).into_wgpu();
        let state = state.unwrap();
        assert_eq!(state.depth_compare, Some(wgpu::CompareFunction::Always));
        assert_eq!(state.stencil, wgpu::StencilState::default());
    }

    #[test]
    fn rasterizer_bias_and_culling_convert() {
        let descriptor = RasterizerStateDescriptor {
            cull_mode: CullMode::Back,
            depth_bias: DepthBiasState {
                constant: 2,
                slope_scale: 1.5,
                clamp: 0.0,
            },
            ..Default::default()
        };
        let primitive: wgpu::PrimitiveState = (&descriptor).into_wgpu();
        let bias: wgpu::DepthBiasState = (&descriptor).into_wgpu();
        assert_eq!(primitive.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(bias.constant, 2);
        assert_eq!(bias.slope_scale, 1.5);
    }

    #[test]
    fn opaque_blend_has_no_blend_state() {
        let off = BlendStateDescriptor {
            blend: None,
            write_mask: ColorWrites::ALL,
            alpha_to_coverage: false,
        };
        let state: Option<wgpu::BlendState> = (&off).into_wgpu();
        assert!(state.is_none());

        let additive = BlendStateDescriptor {
            blend: Some(BlendEquation {
                color: BlendComponentDescriptor {
                    src_factor: BlendFactor::One,
                    dst_factor: BlendFactor::One,
                    operation: BlendOperation::Add,
                },
                alpha: BlendComponentDescriptor::REPLACE,
            }),
            ..off
        };
        let state: Option<wgpu::BlendState> = (&additive).into_wgpu();
        assert_eq!(state.unwrap().color.dst_factor, wgpu::BlendFactor::One);
    }
}
