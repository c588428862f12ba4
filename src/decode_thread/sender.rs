// MZoom6 -- Tiled zoom, pan and rotate engine for very large images
//
// Copyright (c) 2024-2025 Martin van der Werff <github (at) newinnovations.nl>
//
// This file is part of MZoom6.
//
// MZoom6 is free software: you can redistribute it and/or modify it under the terms of
// the GNU Affero General Public License as published by the Free Software Foundation, either
// version 3 of the License, or (at your option) any later version.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR
// IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND
// FITNESS FOR A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR ANY
// DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR
// BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT,
// STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_channel::Sender;
use log::warn;

use crate::decode_thread::model::{DecodeCommand, DecodeCommandMessage};

/// Hands decode commands to the worker pool, stamping each with the current
/// epoch. Bumping the epoch invalidates everything still queued: workers
/// skip commands from earlier epochs and the owner drops their replies.
#[derive(Debug, Clone)]
pub struct DecodeThreadSender {
    sender: Sender<DecodeCommandMessage>,
    epoch: Arc<AtomicU64>,
}

impl DecodeThreadSender {
    pub fn new(sender: Sender<DecodeCommandMessage>, epoch: Arc<AtomicU64>) -> Self {
        Self { sender, epoch }
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Starts a new epoch, invalidating all queued and in-flight commands.
    pub fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Queues a command under the current epoch. Returns false when the
    /// worker pool is gone.
    pub fn send(&self, cmd: DecodeCommand) -> bool {
        let message = DecodeCommandMessage {
            epoch: self.current_epoch(),
            cmd,
        };
        match self.sender.send_blocking(message) {
            Ok(()) => true,
            Err(error) => {
                warn!("decode command dropped, workers gone: {error}");
                false
            }
        }
    }
}
