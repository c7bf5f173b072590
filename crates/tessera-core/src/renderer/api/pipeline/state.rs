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

//! State descriptors and the immutable state objects built from them.

use super::enums::*;
use crate::renderer::api::util::TextureFormat;
use crate::renderer::error::ResourceError;
use bitflags::bitflags;

/// Describes the stencil test and operations for a single face of a primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StencilFaceState {
    /// The comparison function used for the stencil test.
    pub compare: CompareFunction,
    /// The operation to perform if the stencil test fails.
    pub fail_op: StencilOperation,
    /// The operation to perform if the stencil test passes but the depth test fails.
    pub depth_fail_op: StencilOperation,
    /// The operation to perform if both the stencil and depth tests pass.
    pub depth_pass_op: StencilOperation,
}

/// Describes depth biasing, used to prevent z-fighting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DepthBiasState {
    /// A constant value added to the depth of each fragment.
    pub constant: i32,
    /// A factor that scales with the fragment's depth slope.
    pub slope_scale: f32,
    /// The maximum bias that can be applied.
    pub clamp: f32,
}

/// Describes the state for depth and stencil testing.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilStateDescriptor {
    /// The format of the depth/stencil attachment this state is used with.
    pub format: TextureFormat,
    /// If `false`, the depth test is skipped entirely.
    pub depth_test_enabled: bool,
    /// If `true`, depth values are written to the depth buffer.
    pub depth_write_enabled: bool,
    /// The comparison function used for the depth test.
    pub depth_compare: CompareFunction,
    /// If `false`, stencil faces and masks are ignored.
    pub stencil_enabled: bool,
    /// The stencil state for front-facing primitives.
    pub stencil_front: StencilFaceState,
    /// The stencil state for back-facing primitives.
    pub stencil_back: StencilFaceState,
    /// A bitmask for reading from the stencil buffer.
    pub stencil_read_mask: u32,
    /// A bitmask for writing to the stencil buffer.
    pub stencil_write_mask: u32,
}

impl DepthStencilStateDescriptor {
    /// Rejects descriptors no backend can honour.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if !self.format.is_depth_stencil() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "depth/stencil state uses non-depth format {:?}",
                self.format
            )));
        }
        if self.depth_write_enabled && !self.depth_test_enabled {
            return Err(ResourceError::InvalidDescriptor(
                "depth writes require the depth test".to_string(),
            ));
        }
        let has_stencil = matches!(
            self.format,
            TextureFormat::Depth24PlusStencil8 | TextureFormat::Depth32FloatStencil8
        );
        if self.stencil_enabled && !has_stencil {
            return Err(ResourceError::InvalidDescriptor(format!(
                "stencil enabled on stencil-less format {:?}",
                self.format
            )));
        }
        Ok(())
    }
}

/// Describes how primitives are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RasterizerStateDescriptor {
    /// Filled or wireframe.
    pub polygon_mode: PolygonMode,
    /// The face culling mode.
    pub cull_mode: CullMode,
    /// The winding order that determines the front face.
    pub front_face: FrontFace,
    /// Depth bias applied to rasterized fragments.
    pub depth_bias: DepthBiasState,
    /// If `true`, disables clipping of fragments based on their depth.
    pub unclipped_depth: bool,
}

/// Describes a blend equation for the color or alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponentDescriptor {
    /// The blend factor for the source color.
    pub src_factor: BlendFactor,
    /// The blend factor for the destination color.
    pub dst_factor: BlendFactor,
    /// The operation combining both.
    pub operation: BlendOperation,
}

impl BlendComponentDescriptor {
    /// `src * 1 + dst * 0`, i.e. blending has no effect.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };
}

/// The color and alpha blend equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendEquation {
    /// The blend equation for the RGB components.
    pub color: BlendComponentDescriptor,
    /// The blend equation for the alpha component.
    pub alpha: BlendComponentDescriptor,
}

bitflags! {
    /// A bitmask to enable or disable writes to individual color channels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u8 {
        /// Enable writes to the Red channel.
        const R = 0b0001;
        /// Enable writes to the Green channel.
        const G = 0b0010;
        /// Enable writes to the Blue channel.
        const B = 0b0100;
        /// Enable writes to the Alpha channel.
        const A = 0b1000;
        /// Enable writes to all channels.
        const ALL = Self::R.bits() | Self::G.bits() | Self::B.bits() | Self::A.bits();
    }
}

/// Describes the blend stage for a color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendStateDescriptor {
    /// The blend equations. If `None`, blending is disabled.
    pub blend: Option<BlendEquation>,
    /// Which color channels are written.
    pub write_mask: ColorWrites,
    /// Derive coverage from the fragment alpha.
    pub alpha_to_coverage: bool,
}

/// Describes a single vertex attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttributeDescriptor {
    /// The semantic name, used for diagnostics.
    pub semantic: &'static str,
    /// The shader input location.
    pub shader_location: u32,
    /// The format of the attribute's data.
    pub format: VertexFormat,
    /// The byte offset from the start of the vertex.
    pub offset: u64,
}

/// Describes the vertex input layout of a single interleaved buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputLayoutDescriptor {
    /// The byte distance between consecutive vertices.
    pub array_stride: u64,
    /// How often the buffer is advanced.
    pub step_mode: VertexStepMode,
    /// The attributes of each element.
    pub attributes: Vec<VertexAttributeDescriptor>,
}

impl InputLayoutDescriptor {
    /// Builds a tightly packed per-vertex layout, assigning locations in order.
    pub fn packed(attributes: &[(&'static str, VertexFormat)]) -> Self {
        let mut offset = 0;
        let attributes = attributes
            .iter()
            .enumerate()
            .map(|(location, &(semantic, format))| {
                let attribute = VertexAttributeDescriptor {
                    semantic,
                    shader_location: location as u32,
                    format,
                    offset,
                };
                offset += format.size();
                attribute
            })
            .collect();
        Self {
            array_stride: offset,
            step_mode: VertexStepMode::Vertex,
            attributes,
        }
    }

    /// Rejects layouts with duplicate locations or attributes past the stride.
    pub fn validate(&self) -> Result<(), ResourceError> {
        for (i, attribute) in self.attributes.iter().enumerate() {
            if attribute.offset + attribute.format.size() > self.array_stride {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "attribute '{}' ends past the vertex stride of {} bytes",
                    attribute.semantic, self.array_stride
                )));
            }
            let duplicate = self.attributes[..i]
                .iter()
                .any(|other| other.shader_location == attribute.shader_location);
            if duplicate {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "shader location {} is used twice",
                    attribute.shader_location
                )));
            }
        }
        Ok(())
    }
}

/// An opaque handle to a backend-owned state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateObjectId(pub usize);

/// An immutable, named fixed-function state object.
///
/// The descriptor is kept alongside the native handle so callers can inspect
/// the configuration a name stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct StateObject<D> {
    /// The backend handle.
    pub id: StateObjectId,
    /// The catalogue name.
    pub name: &'static str,
    /// The configuration the object was built from.
    pub descriptor: D,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_layout_offsets_and_stride() {
        let layout = InputLayoutDescriptor::packed(&[
            ("POSITION", VertexFormat::Float32x3),
            ("NORMAL", VertexFormat::Float32x3),
            ("TEXCOORD", VertexFormat::Float32x2),
        ]);
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].shader_location, 2);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn layout_with_overflowing_attribute_is_rejected() {
        let mut layout = InputLayoutDescriptor::packed(&[("POSITION", VertexFormat::Float32x4)]);
        layout.array_stride = 8;
        assert!(matches!(
            layout.validate(),
            Err(ResourceError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn stencil_requires_a_stencil_format() {
        let desc = DepthStencilStateDescriptor {
            format: TextureFormat::Depth32Float,
            depth_test_enabled: true,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil_enabled: true,
            stencil_front: StencilFaceState::default(),
            stencil_back: StencilFaceState::default(),
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
        };
        assert!(desc.validate().is_err());

        let desc = DepthStencilStateDescriptor {
            format: TextureFormat::Depth24PlusStencil8,
            ..desc
        };
        assert!(desc.validate().is_ok());
    }
}
