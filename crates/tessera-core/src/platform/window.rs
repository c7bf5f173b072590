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

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Everything a backend needs from a window: its raw window and display handles.
///
/// Window creation and the event pump live outside the device. Any type that
/// exposes both raw handles qualifies through the blanket impl below.
pub trait WindowHandle: HasWindowHandle + HasDisplayHandle {}

impl<T: HasWindowHandle + HasDisplayHandle> WindowHandle for T {}

/// A shareable, thread-safe native window handle.
///
/// Passing `None` where one of these is expected makes the backend run
/// without a presentation surface.
pub type NativeWindowHandle = Arc<dyn WindowHandle + Send + Sync>;
