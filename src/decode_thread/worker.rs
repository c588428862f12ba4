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

use async_channel::{Receiver, Sender};
use log::{debug, warn};

use crate::{
    decode_thread::model::{DecodeCommand, DecodeCommandMessage, DecodeReply, DecodeReplyMessage},
    tiles::decoder::TileDecoder,
};

/// One decode worker. Several workers share the same command receiver
/// (the channel is multi-consumer) and the same decoder pool; each blocks in
/// `TileDecoder::decode` on its own leased decoder instance.
#[derive(Clone)]
pub struct DecodeWorker {
    receiver: Receiver<DecodeCommandMessage>,
    reply_sender: Sender<DecodeReplyMessage>,
    epoch: Arc<AtomicU64>,
    decoder: Arc<TileDecoder>,
}

impl DecodeWorker {
    pub fn new(
        receiver: Receiver<DecodeCommandMessage>,
        reply_sender: Sender<DecodeReplyMessage>,
        epoch: Arc<AtomicU64>,
        decoder: Arc<TileDecoder>,
    ) -> Self {
        Self {
            receiver,
            reply_sender,
            epoch,
            decoder,
        }
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Runs until the command channel closes.
    pub fn run(&self) {
        while let Ok(message) = self.receiver.recv_blocking() {
            if message.epoch != self.current_epoch() {
                debug!("skipping decode command from stale epoch {}", message.epoch);
                continue;
            }

            match message.cmd {
                DecodeCommand::Decode {
                    key,
                    src_rect,
                    sample_size,
                } => {
                    let result = self.decoder.decode(&key, src_rect, sample_size);

                    // The session may have been superseded while decoding
                    if message.epoch != self.current_epoch() {
                        debug!("discarding decode result for stale epoch {}", message.epoch);
                        continue;
                    }
                    let reply = DecodeReplyMessage {
                        epoch: message.epoch,
                        reply: DecodeReply::Done { key, result },
                    };
                    if let Err(error) = self.reply_sender.send_blocking(reply) {
                        warn!("failed to send decode reply: {error}");
                        break;
                    }
                }
            }
        }
    }
}
