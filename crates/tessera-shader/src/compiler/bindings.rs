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

//! Combined image/sampler numbering.
//!
//! Targets without separate samplers fuse every sampled (image, sampler) pair
//! into one binding. The fused binding keeps the image's binding index so
//! numbering is stable whatever sampler a texture is read with.

use naga::{Expression, Function, GlobalVariable, Handle, Module, ResourceBinding, TypeInner};
use std::collections::BTreeMap;

/// An image and the sampler it is sampled with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedSampler {
    /// The image variable name.
    pub image: String,
    /// The sampler variable name.
    pub sampler: String,
    /// Bind group of the image.
    pub group: u32,
    /// Binding index of the image, inherited by the combined sampler.
    pub binding: u32,
}

/// Every distinct (image, sampler) pair sampled anywhere in `module`.
pub fn combined_samplers(module: &Module) -> Vec<CombinedSampler> {
    sampled_pairs(module)
        .into_iter()
        .filter_map(|(image, sampler)| {
            let image_var = &module.global_variables[image];
            let binding = image_var.binding.as_ref()?;
            Some(CombinedSampler {
                image: variable_name(image_var),
                sampler: variable_name(&module.global_variables[sampler]),
                group: binding.group,
                binding: binding.binding,
            })
        })
        .collect()
}

/// Flat binding slots for every image and sampler global.
///
/// Images keep their own binding index; a sampler takes the index of the
/// first image it is combined with, or its own when never combined. Indices
/// that do not fit a slot are skipped.
pub fn binding_map(module: &Module) -> BTreeMap<ResourceBinding, u8> {
    let pairs = sampled_pairs(module);
    let mut map = BTreeMap::new();

    for (handle, var) in module.global_variables.iter() {
        let Some(binding) = var.binding.clone() else {
            continue;
        };
        let slot = match module.types[var.ty].inner {
            TypeInner::Image { .. } => binding.binding,
            TypeInner::Sampler { .. } => pairs
                .iter()
                .find(|(_, sampler)| *sampler == handle)
                .and_then(|(image, _)| module.global_variables[*image].binding.as_ref())
                .map_or(binding.binding, |image_binding| image_binding.binding),
            _ => continue,
        };
        if let Ok(slot) = u8::try_from(slot) {
            map.insert(binding, slot);
        }
    }
    map
}

fn sampled_pairs(module: &Module) -> Vec<(Handle<GlobalVariable>, Handle<GlobalVariable>)> {
    let functions = module
        .functions
        .iter()
        .map(|(_, function)| function)
        .chain(module.entry_points.iter().map(|ep| &ep.function));

    let mut pairs = Vec::new();
    for function in functions {
        for (_, expression) in function.expressions.iter() {
            let Expression::ImageSample { image, sampler, .. } = *expression else {
                continue;
            };
            let (Some(image), Some(sampler)) = (global_of(function, image), global_of(function, sampler))
            else {
                continue;
            };
            if !pairs.contains(&(image, sampler)) {
                pairs.push((image, sampler));
            }
        }
    }
    pairs
}

fn global_of(function: &Function, expression: Handle<Expression>) -> Option<Handle<GlobalVariable>> {
    match function.expressions[expression] {
        Expression::GlobalVariable(handle) => Some(handle),
        _ => None,
    }
}

fn variable_name(var: &GlobalVariable) -> String {
    var.name.clone().unwrap_or_else(|| "<unnamed>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLED: &str = r#"
@group(0) @binding(3) var albedo: texture_2d<f32>;
@group(0) @binding(7) var linear_sampler: sampler;
@group(0) @binding(9) var unused_sampler: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(albedo, linear_sampler, uv);
}
"#;

    #[test]
    fn combined_sampler_inherits_image_binding() {
        let module = naga::front::wgsl::parse_str(SAMPLED).unwrap();
        let combined = combined_samplers(&module);

        assert_eq!(
            combined,
            [CombinedSampler {
                image: "albedo".to_string(),
                sampler: "linear_sampler".to_string(),
                group: 0,
                binding: 3,
            }]
        );
    }

    #[test]
    fn binding_map_numbers_samplers_after_their_image() {
        let module = naga::front::wgsl::parse_str(SAMPLED).unwrap();
        let map = binding_map(&module);

        let slot = |binding| map[&ResourceBinding { group: 0, binding }];
        assert_eq!(slot(3), 3);
        assert_eq!(slot(7), 3);
        assert_eq!(slot(9), 9);
    }
}
