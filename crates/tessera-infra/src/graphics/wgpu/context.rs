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

use anyhow::anyhow;
use anyhow::Result;
use tessera_core::platform::window::NativeWindowHandle;
use wgpu::SurfaceTargetUnsafe;
use wgpu::{Backends, Instance};

/// Holds the core WGPU state objects required by the device.
///
/// With a window the context owns a presentation surface; without one it runs
/// headless, which is how the device works when no window is available.
pub struct WgpuGraphicsContext {
    pub surface: Option<wgpu::Surface<'static>>,
    // The surface was created unsafely from raw handles; the window must outlive it.
    window: Option<NativeWindowHandle>,
    #[allow(dead_code)]
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    // Store info for easy access
    pub adapter_name: String,
    pub adapter_backend: wgpu::Backend,
    pub adapter_device_type: wgpu::DeviceType,
}

impl std::fmt::Debug for WgpuGraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuGraphicsContext")
            .field("adapter_name", &self.adapter_name)
            .field("adapter_backend", &self.adapter_backend)
            .field("adapter_device_type", &self.adapter_device_type)
            .field("has_window", &self.window.is_some())
            .finish_non_exhaustive()
    }
}

impl WgpuGraphicsContext {
    /// Asynchronously initializes the graphics context.
    ///
    /// ## Arguments
    /// * `backends` - The graphics APIs the adapter may use.
    /// * `window` - The window to present to, or `None` to run headless.
    /// * `label` - Debug label for the logical device.
    ///
    /// ## Returns
    /// * `Result<Self>` - The initialized context, or why no adapter or device
    ///   could be obtained.
    pub async fn new(
        backends: Backends,
        window: Option<NativeWindowHandle>,
        label: &str,
    ) -> Result<Self> {
        log::info!("Initializing WGPU Graphics Context (backends: {backends:?})...");

        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        // --- 1. Create Surface ---
        let surface = match &window {
            Some(window_handle) => {
                let surface_target = unsafe {
                    SurfaceTargetUnsafe::from_window(window_handle)
                        .map_err(|e| anyhow!("Failed to create surface target: {}", e))?
                };
                let surface = unsafe { instance.create_surface_unsafe(surface_target)? };
                log::debug!("WGPU surface created for the window.");
                Some(surface)
            }
            None => {
                log::info!("No window supplied, running headless.");
                None
            }
        };

        // --- 2. Select Adapter ---
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("Failed to find a suitable adapter: {}", e))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        // --- 3. Create Logical Device and Command Queue from Adapter ---
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        Ok(WgpuGraphicsContext {
            surface,
            window,
            adapter,
            device,
            queue,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            adapter_device_type: adapter_info.device_type,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns `true` if the context presents to a window.
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }
}
