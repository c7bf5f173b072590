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

//! Funnels work from any thread onto the thread that owns the device.

use parking_lot::{ReentrantMutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ThreadId};
use tessera_core::renderer::Command;

/// A FIFO mailbox of commands drained by the owner thread.
///
/// The owner is whichever thread last called [`CommandQueue::dispatch_queue`].
/// Commands enqueued on the owner run immediately; commands enqueued anywhere
/// else wait in the mailbox until the next drain.
#[derive(Debug)]
pub struct CommandQueue {
    sender: flume::Sender<Command>,
    receiver: flume::Receiver<Command>,
    owner: RwLock<Option<ThreadId>>,
    execution: ReentrantMutex<()>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    /// Creates an empty queue with no owner.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            sender,
            receiver,
            owner: RwLock::new(None),
            execution: ReentrantMutex::new(()),
        }
    }

    /// Submits a command.
    ///
    /// On the owner thread the command runs before this returns. On any
    /// other thread it is queued and this returns without waiting.
    pub fn enqueue(&self, command: Command) {
        if self.is_owner_thread() {
            let _guard = self.execution.lock();
            run_guarded(command);
            return;
        }

        log::trace!("CommandQueue: Queued command from {:?}", thread::current().id());
        if let Err(e) = self.sender.send(command) {
            // The receiver lives as long as `self`, so this cannot happen.
            log::error!("CommandQueue: Failed to queue command: {e}");
        }
    }

    /// Makes the calling thread the owner and runs queued commands in order
    /// until the mailbox is empty, including any added while draining.
    ///
    /// ## Returns
    /// The number of commands executed.
    pub fn dispatch_queue(&self) -> usize {
        let current = thread::current().id();
        {
            let mut owner = self.owner.write();
            if *owner != Some(current) {
                log::debug!("CommandQueue: Ownership moves to {current:?}");
                *owner = Some(current);
            }
        }

        let _guard = self.execution.lock();
        let mut executed = 0;
        while let Ok(command) = self.receiver.try_recv() {
            run_guarded(command);
            executed += 1;
        }
        if executed > 0 {
            log::trace!("CommandQueue: Dispatched {executed} commands");
        }
        executed
    }

    /// Runs `command` right away on the calling thread, excluding any drain.
    ///
    /// Unlike queued commands, a panic here propagates to the caller.
    pub fn lockup(&self, command: Box<dyn FnOnce() + '_>) {
        let _guard = self.execution.lock();
        command();
    }

    /// Number of commands waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// The thread that drains the queue, once one has.
    pub fn owner(&self) -> Option<ThreadId> {
        *self.owner.read()
    }

    /// Returns `true` if the calling thread is the owner.
    pub fn is_owner_thread(&self) -> bool {
        self.owner() == Some(thread::current().id())
    }
}

fn run_guarded(command: Command) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(command)) {
        Ok(()) => true,
        Err(payload) => {
            log::error!("CommandQueue: Command panicked: {}", panic_message(&*payload));
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn queue_starts_without_owner() {
        let queue = CommandQueue::new();
        assert_eq!(queue.owner(), None);
        assert!(!queue.is_owner_thread());
        assert_eq!(queue.dispatch_queue(), 0);
        assert!(queue.is_owner_thread());
    }

    #[test]
    fn non_owner_enqueue_waits_for_dispatch() {
        let queue = Arc::new(CommandQueue::new());
        queue.dispatch_queue();
        let ran = Arc::new(AtomicUsize::new(0));

        let worker = {
            let queue = Arc::clone(&queue);
            let ran = Arc::clone(&ran);
            thread::spawn(move || {
                queue.enqueue(Box::new(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                }));
            })
        };
        worker.join().unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.dispatch_queue(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn commands_enqueued_during_drain_run_in_the_same_drain() {
        let queue = Arc::new(CommandQueue::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let queue = Arc::clone(&queue);
            let log = Arc::clone(&log);
            Box::new(move || {
                log.lock().unwrap().push("outer");
                let inner_log = Arc::clone(&log);
                // Runs on the owner thread, so it executes synchronously.
                queue.enqueue(Box::new(move || inner_log.lock().unwrap().push("inner")));
            })
        };
        queue.sender.send(first).unwrap();

        assert_eq!(queue.dispatch_queue(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }

    #[test]
    fn lockup_is_reentrant_inside_a_command() {
        let queue = Arc::new(CommandQueue::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let command = {
            let queue = Arc::clone(&queue);
            let hits = Arc::clone(&hits);
            Box::new(move || {
                queue.lockup(Box::new(|| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }));
            })
        };
        queue.sender.send(command).unwrap();
        queue.dispatch_queue();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panic_payloads_are_reported() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*payload), "<non-string panic payload>");
    }
}
