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

use std::sync::{Arc, Mutex};
use std::thread;
use tessera_core::renderer::ShaderModel;
use tessera_device::{Device, DeviceConfig, GraphicsDevice};
use tessera_infra::HeadlessBackend;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn shared_device() -> Arc<Device> {
    let backend = HeadlessBackend::new(ShaderModel::Canonical);
    Arc::new(Device::with_backend(DeviceConfig::headless(None), Box::new(backend)).unwrap())
}

fn recorder(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Box<dyn FnOnce() + Send + 'static> {
    let log = Arc::clone(log);
    Box::new(move || log.lock().unwrap().push(value))
}

#[test]
fn test_commands_from_other_thread_run_in_fifo_order() {
    init_logging();

    // --- 1. ARRANGE ---
    let device = shared_device();
    device.dispatch_queue(); // The test thread becomes the owner.
    let log = Arc::new(Mutex::new(Vec::new()));

    // --- 2. ACT ---
    let producer = {
        let device = Arc::clone(&device);
        let log = Arc::clone(&log);
        thread::spawn(move || {
            for value in 1..=3 {
                device.enqueue(recorder(&log, value));
            }
        })
    };
    producer.join().unwrap();

    // --- 3. ASSERT ---
    assert!(log.lock().unwrap().is_empty(), "Nothing runs before the drain");
    assert_eq!(device.dispatch_queue(), 3);
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(device.dispatch_queue(), 0, "Each command runs exactly once");
}

#[test]
fn test_owner_thread_enqueue_runs_synchronously() {
    init_logging();

    // --- 1. ARRANGE ---
    let device = shared_device();
    device.dispatch_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    // --- 2. ACT ---
    device.enqueue(recorder(&log, 7));

    // --- 3. ASSERT ---
    assert_eq!(*log.lock().unwrap(), vec![7]);
    assert_eq!(device.dispatch_queue(), 0);
}

#[test]
fn test_panicking_command_does_not_lose_later_commands() {
    init_logging();

    // --- 1. ARRANGE ---
    let device = shared_device();
    device.dispatch_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let producer = {
        let device = Arc::clone(&device);
        let log = Arc::clone(&log);
        thread::spawn(move || {
            device.enqueue(recorder(&log, 1));
            device.enqueue(Box::new(|| panic!("command failed on purpose")));
            device.enqueue(recorder(&log, 3));
        })
    };
    producer.join().unwrap();

    // --- 2. ACT ---
    let executed = device.dispatch_queue();

    // --- 3. ASSERT ---
    assert_eq!(executed, 3);
    assert_eq!(*log.lock().unwrap(), vec![1, 3]);
}

#[test]
fn test_ownership_follows_the_draining_thread() {
    init_logging();

    // --- 1. ARRANGE ---
    let device = shared_device();
    device.dispatch_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    // --- 2. ACT ---
    // A worker takes over the queue; the test thread is now a producer.
    {
        let device = Arc::clone(&device);
        thread::spawn(move || device.dispatch_queue()).join().unwrap();
    }
    device.enqueue(recorder(&log, 5));

    // --- 3. ASSERT ---
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(device.dispatch_queue(), 1);
    assert_eq!(*log.lock().unwrap(), vec![5]);
}

#[test]
fn test_lockup_runs_immediately_on_any_thread() {
    init_logging();

    // --- 1. ARRANGE ---
    let device = shared_device();
    device.dispatch_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    // --- 2. ACT ---
    {
        let device = Arc::clone(&device);
        let log = Arc::clone(&log);
        thread::spawn(move || {
            let mut local = 0;
            device.lockup(Box::new(|| local = 9));
            log.lock().unwrap().push(local);
        })
        .join()
        .unwrap();
    }

    // --- 3. ASSERT ---
    assert_eq!(*log.lock().unwrap(), vec![9]);
}
