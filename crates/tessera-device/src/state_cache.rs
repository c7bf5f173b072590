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

//! The fixed catalogue of named state objects built once per device.
//!
//! Names follow a short code: `d`/`dr`/`drw` for depth off, read and
//! read-write, `sr`/`srw` for stencil, `so`/`wf` for solid and wireframe fill,
//! `c<face>` for culling, `bl_` for blend modes, `sa_` for samplers and `il_`
//! followed by the vertex attributes for input layouts.

use std::borrow::Cow;
use std::collections::HashMap;
use tessera_core::renderer::{
    AddressMode, BlendComponentDescriptor, BlendEquation, BlendFactor, BlendOperation,
    BlendStateDescriptor, ColorWrites, CompareFunction, CullMode, DepthBiasState,
    DepthStencilStateDescriptor, FilterMode, FrontFace, InputLayoutDescriptor, MipmapFilterMode,
    PolygonMode, RasterizerStateDescriptor, RenderBackend, RenderError, ResourceError,
    SamplerDescriptor, StateObject, StateObjectId, StencilFaceState, StencilOperation,
    TextureFormat, VertexFormat,
};

/// Format every depth/stencil state is declared against.
pub const DEPTH_STENCIL_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;

/// Named, immutable state objects owned by one backend.
#[derive(Debug, Default)]
pub struct StateCache {
    depth_stencil: HashMap<&'static str, StateObject<DepthStencilStateDescriptor>>,
    rasterizer: HashMap<&'static str, StateObject<RasterizerStateDescriptor>>,
    blend: HashMap<&'static str, StateObject<BlendStateDescriptor>>,
    sampler: HashMap<&'static str, StateObject<SamplerDescriptor<'static>>>,
    input_layout: HashMap<&'static str, StateObject<InputLayoutDescriptor>>,
}

impl StateCache {
    /// Builds every catalogue entry through `backend`, each exactly once.
    ///
    /// ## Errors
    /// * `RenderError::Configuration` - If the backend rejects any entry.
    ///   Entries built before the failure are released first.
    pub fn create_states(backend: &dyn RenderBackend) -> Result<Self, RenderError> {
        let mut cache = Self::default();
        match cache.populate(backend) {
            Ok(()) => {
                log::info!("StateCache: Created {} state objects", cache.len());
                Ok(cache)
            }
            Err((name, err)) => {
                log::error!("StateCache: Failed to create state '{name}': {err}");
                cache.release(backend);
                Err(RenderError::Configuration(format!(
                    "state object '{name}' could not be created: {err}"
                )))
            }
        }
    }

    fn populate(
        &mut self,
        backend: &dyn RenderBackend,
    ) -> Result<(), (&'static str, ResourceError)> {
        for (name, descriptor) in depth_stencil_catalogue() {
            let id = backend
                .create_depth_stencil_state(&descriptor)
                .map_err(|e| (name, e))?;
            self.depth_stencil.insert(name, state(id, name, descriptor));
        }
        for (name, descriptor) in rasterizer_catalogue() {
            let id = backend
                .create_rasterizer_state(&descriptor)
                .map_err(|e| (name, e))?;
            self.rasterizer.insert(name, state(id, name, descriptor));
        }
        for (name, descriptor) in blend_catalogue() {
            let id = backend
                .create_blend_state(&descriptor)
                .map_err(|e| (name, e))?;
            self.blend.insert(name, state(id, name, descriptor));
        }
        for (name, descriptor) in sampler_catalogue() {
            let id = backend.create_sampler(&descriptor).map_err(|e| (name, e))?;
            self.sampler.insert(name, state(id, name, descriptor));
        }
        for (name, descriptor) in input_layout_catalogue() {
            let id = backend
                .create_input_layout(&descriptor)
                .map_err(|e| (name, e))?;
            self.input_layout.insert(name, state(id, name, descriptor));
        }
        Ok(())
    }

    /// Looks up a depth/stencil state. `None` means "use the default".
    pub fn get_depth_stencil(
        &self,
        name: &str,
    ) -> Option<&StateObject<DepthStencilStateDescriptor>> {
        self.depth_stencil.get(name)
    }

    /// Looks up a rasterizer state.
    pub fn get_rasterizer(&self, name: &str) -> Option<&StateObject<RasterizerStateDescriptor>> {
        self.rasterizer.get(name)
    }

    /// Looks up a blend state.
    pub fn get_blend(&self, name: &str) -> Option<&StateObject<BlendStateDescriptor>> {
        self.blend.get(name)
    }

    /// Looks up a sampler.
    pub fn get_sampler(&self, name: &str) -> Option<&StateObject<SamplerDescriptor<'static>>> {
        self.sampler.get(name)
    }

    /// Looks up a vertex input layout.
    pub fn get_input_layout(&self, name: &str) -> Option<&StateObject<InputLayoutDescriptor>> {
        self.input_layout.get(name)
    }

    /// Releases every object through `backend` and empties the cache.
    ///
    /// Calling it again is a no-op.
    pub fn release(&mut self, backend: &dyn RenderBackend) {
        let ids: Vec<(&'static str, StateObjectId)> = self
            .depth_stencil
            .drain()
            .map(|(name, s)| (name, s.id))
            .chain(self.rasterizer.drain().map(|(name, s)| (name, s.id)))
            .chain(self.blend.drain().map(|(name, s)| (name, s.id)))
            .chain(self.sampler.drain().map(|(name, s)| (name, s.id)))
            .chain(self.input_layout.drain().map(|(name, s)| (name, s.id)))
            .collect();
        if ids.is_empty() {
            return;
        }

        for (name, id) in &ids {
            if let Err(e) = backend.release_state_object(*id) {
                log::warn!("StateCache: Failed to release '{name}': {e}");
            }
        }
        log::debug!("StateCache: Released {} state objects", ids.len());
    }

    /// Number of live entries across all kinds.
    pub fn len(&self) -> usize {
        self.depth_stencil.len()
            + self.rasterizer.len()
            + self.blend.len()
            + self.sampler.len()
            + self.input_layout.len()
    }

    /// Returns `true` once the cache has been released.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every live entry name, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .depth_stencil
            .keys()
            .chain(self.rasterizer.keys())
            .chain(self.blend.keys())
            .chain(self.sampler.keys())
            .chain(self.input_layout.keys())
            .copied()
            .collect();
        names.sort_unstable();
        names
    }
}

fn state<D>(id: StateObjectId, name: &'static str, descriptor: D) -> StateObject<D> {
    StateObject {
        id,
        name,
        descriptor,
    }
}

// --- Catalogue ---

fn depth(test: bool, write: bool, compare: CompareFunction) -> DepthStencilStateDescriptor {
    DepthStencilStateDescriptor {
        format: DEPTH_STENCIL_FORMAT,
        depth_test_enabled: test,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil_enabled: false,
        stencil_front: StencilFaceState::default(),
        stencil_back: StencilFaceState::default(),
        stencil_read_mask: 0xff,
        stencil_write_mask: 0xff,
    }
}

fn with_stencil(
    base: DepthStencilStateDescriptor,
    face: StencilFaceState,
    write_mask: u32,
) -> DepthStencilStateDescriptor {
    DepthStencilStateDescriptor {
        stencil_enabled: true,
        stencil_front: face,
        stencil_back: face,
        stencil_write_mask: write_mask,
        ..base
    }
}

fn depth_stencil_catalogue() -> [(&'static str, DepthStencilStateDescriptor); 8] {
    use CompareFunction::*;

    let stencil_write = StencilFaceState {
        compare: Always,
        fail_op: StencilOperation::Keep,
        depth_fail_op: StencilOperation::Keep,
        depth_pass_op: StencilOperation::Replace,
    };
    let stencil_equal = StencilFaceState {
        compare: Equal,
        fail_op: StencilOperation::Keep,
        depth_fail_op: StencilOperation::Keep,
        depth_pass_op: StencilOperation::Keep,
    };

    [
        ("d_off", depth(false, false, Always)),
        ("dr_lt", depth(true, false, Less)),
        ("dr_le", depth(true, false, LessEqual)),
        ("dr_eq", depth(true, false, Equal)),
        ("drw_lt", depth(true, true, Less)),
        ("drw_le", depth(true, true, LessEqual)),
        (
            "drw_srw_lt",
            with_stencil(depth(true, true, Less), stencil_write, 0xff),
        ),
        (
            "dr_sr_eq",
            with_stencil(depth(true, false, LessEqual), stencil_equal, 0),
        ),
    ]
}

fn raster(polygon_mode: PolygonMode, cull_mode: CullMode) -> RasterizerStateDescriptor {
    RasterizerStateDescriptor {
        polygon_mode,
        cull_mode,
        front_face: FrontFace::Ccw,
        ..Default::default()
    }
}

fn rasterizer_catalogue() -> [(&'static str, RasterizerStateDescriptor); 5] {
    [
        ("so_cback", raster(PolygonMode::Fill, CullMode::Back)),
        ("so_cfront", raster(PolygonMode::Fill, CullMode::Front)),
        ("so_cnone", raster(PolygonMode::Fill, CullMode::None)),
        ("wf_cnone", raster(PolygonMode::Line, CullMode::None)),
        (
            "so_cback_bias",
            RasterizerStateDescriptor {
                depth_bias: DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
                ..raster(PolygonMode::Fill, CullMode::Back)
            },
        ),
    ]
}

fn component(src: BlendFactor, dst: BlendFactor) -> BlendComponentDescriptor {
    BlendComponentDescriptor {
        src_factor: src,
        dst_factor: dst,
        operation: BlendOperation::Add,
    }
}

fn blend(color: BlendComponentDescriptor, alpha: BlendComponentDescriptor) -> BlendStateDescriptor {
    BlendStateDescriptor {
        blend: Some(BlendEquation { color, alpha }),
        write_mask: ColorWrites::ALL,
        alpha_to_coverage: false,
    }
}

fn blend_catalogue() -> [(&'static str, BlendStateDescriptor); 5] {
    use BlendFactor::*;

    [
        (
            "bl_off",
            BlendStateDescriptor {
                blend: None,
                write_mask: ColorWrites::ALL,
                alpha_to_coverage: false,
            },
        ),
        (
            "bl_alpha",
            blend(
                component(SrcAlpha, OneMinusSrcAlpha),
                component(One, OneMinusSrcAlpha),
            ),
        ),
        (
            "bl_premul",
            blend(
                component(One, OneMinusSrcAlpha),
                component(One, OneMinusSrcAlpha),
            ),
        ),
        ("bl_add", blend(component(One, One), component(One, One))),
        ("bl_mul", blend(component(Dst, Zero), component(Dst, Zero))),
    ]
}

fn sampler(
    name: &'static str,
    filter: FilterMode,
    address_mode: AddressMode,
) -> SamplerDescriptor<'static> {
    let mipmap_filter = match filter {
        FilterMode::Nearest => MipmapFilterMode::Nearest,
        FilterMode::Linear => MipmapFilterMode::Linear,
    };
    SamplerDescriptor {
        label: Some(Cow::Borrowed(name)),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter,
        ..Default::default()
    }
}

fn sampler_catalogue() -> [(&'static str, SamplerDescriptor<'static>); 6] {
    use AddressMode::*;
    use FilterMode::*;

    let named = |name: &'static str, filter, address_mode| {
        (name, sampler(name, filter, address_mode))
    };
    [
        named("sa_point_clamp", Nearest, ClampToEdge),
        named("sa_point_wrap", Nearest, Repeat),
        named("sa_linear_clamp", Linear, ClampToEdge),
        named("sa_linear_wrap", Linear, Repeat),
        (
            "sa_aniso_wrap",
            SamplerDescriptor {
                anisotropy_clamp: 16,
                ..sampler("sa_aniso_wrap", Linear, Repeat)
            },
        ),
        (
            "sa_shadow_cmp",
            SamplerDescriptor {
                compare: Some(CompareFunction::LessEqual),
                mipmap_filter: MipmapFilterMode::Nearest,
                ..sampler("sa_shadow_cmp", Linear, ClampToEdge)
            },
        ),
    ]
}

fn input_layout_catalogue() -> [(&'static str, InputLayoutDescriptor); 5] {
    const POSITION: (&str, VertexFormat) = ("POSITION", VertexFormat::Float32x3);
    const COLOR: (&str, VertexFormat) = ("COLOR", VertexFormat::Float32x4);
    const NORMAL: (&str, VertexFormat) = ("NORMAL", VertexFormat::Float32x3);
    const TANGENT: (&str, VertexFormat) = ("TANGENT", VertexFormat::Float32x4);
    const TEXCOORD: (&str, VertexFormat) = ("TEXCOORD", VertexFormat::Float32x2);

    [
        ("il_pos", InputLayoutDescriptor::packed(&[POSITION])),
        ("il_pos_col", InputLayoutDescriptor::packed(&[POSITION, COLOR])),
        ("il_pos_uv", InputLayoutDescriptor::packed(&[POSITION, TEXCOORD])),
        (
            "il_pos_nrm_uv",
            InputLayoutDescriptor::packed(&[POSITION, NORMAL, TEXCOORD]),
        ),
        (
            "il_pos_nrm_tan_uv",
            InputLayoutDescriptor::packed(&[POSITION, NORMAL, TANGENT, TEXCOORD]),
        ),
    ]
}
