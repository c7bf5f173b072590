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

//! Pixel-space sizes and offsets.

/// A three-dimensional extent: width, height, and depth or layer count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// The width in texels.
    pub width: u32,
    /// The height in texels.
    pub height: u32,
    /// The depth of a volume, or the number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// A single-layer 2D extent.
    pub const fn d2(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    /// Total number of texels covered by this extent.
    pub fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth_or_array_layers as u64
    }
}

/// A three-dimensional texel offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// The x offset.
    pub x: u32,
    /// The y offset.
    pub y: u32,
    /// The z offset or array layer.
    pub z: u32,
}

impl Origin3D {
    /// The origin at `(0, 0, 0)`.
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d2_extent_has_one_layer() {
        let extent = Extent3D::d2(64, 32);
        assert_eq!(extent.depth_or_array_layers, 1);
        assert_eq!(extent.texel_count(), 64 * 32);
    }
}
