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

pub mod model;
mod sender;
mod worker;

use std::{
    sync::{atomic::AtomicU64, Arc},
    thread::{self, JoinHandle},
};

use async_channel::{Receiver, Sender};

use crate::{
    decode_thread::{
        model::{DecodeCommandMessage, DecodeReplyMessage},
        worker::DecodeWorker,
    },
    tiles::decoder::TileDecoder,
};

pub use sender::DecodeThreadSender;

/// The decode worker pool for one image session. Tile decoding must never
/// block the owning thread, so commands cross to these workers over a
/// channel and replies come back over another, drained by the owner.
#[derive(Debug)]
pub struct DecodeThread {
    _handles: Vec<JoinHandle<()>>,
    epoch: Arc<AtomicU64>,
    decoder: Arc<TileDecoder>,
}

impl DecodeThread {
    /// Spawns one worker per pooled decoder instance. The workers exit when
    /// the command channel closes (every sender dropped).
    pub fn new(
        decoder: TileDecoder,
        to_dt_receiver: Receiver<DecodeCommandMessage>,
        from_dt_sender: Sender<DecodeReplyMessage>,
    ) -> Self {
        let epoch = Arc::new(AtomicU64::new(0));
        let decoder = Arc::new(decoder);
        let workers = decoder.pool_size().max(1);

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let worker = DecodeWorker::new(
                to_dt_receiver.clone(),
                from_dt_sender.clone(),
                Arc::clone(&epoch),
                Arc::clone(&decoder),
            );
            handles.push(thread::spawn(move || worker.run()));
        }

        DecodeThread {
            _handles: handles,
            epoch,
            decoder,
        }
    }

    pub fn create_sender(&self, to_dt_sender: Sender<DecodeCommandMessage>) -> DecodeThreadSender {
        DecodeThreadSender::new(to_dt_sender, self.epoch.clone())
    }

    /// Closes the underlying decoders. Queued commands still drain, but
    /// their decodes fail fast and their epoch no longer matches once the
    /// caller bumps it.
    pub fn close(&self) {
        self.decoder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decode_thread::model::{DecodeCommand, DecodeReply},
        error::{MzoomError, MzoomResult},
        rect::RectI,
        tiles::decoder::RegionDecoder,
        tiles::{tile::TileKey, ImageInfo, TileImage},
    };

    /// Decoder stub producing a 1x1 image, or an error for a marked column.
    struct StubDecoder {
        info: ImageInfo,
        fail_col: Option<u32>,
    }

    impl RegionDecoder for StubDecoder {
        fn image_info(&self) -> &ImageInfo {
            &self.info
        }

        fn ready(&mut self) -> MzoomResult<()> {
            Ok(())
        }

        fn decode_region(
            &mut self,
            key: &TileKey,
            _src_rect: RectI,
            _sample_size: u32,
        ) -> MzoomResult<TileImage> {
            if Some(key.col) == self.fail_col {
                Err(MzoomError::Decode("stub failure".to_string()))
            } else {
                Ok(TileImage::from_rgba8(1, 1, vec![0, 0, 0, 255]))
            }
        }

        fn close(&mut self) {}

        fn try_clone(&self) -> MzoomResult<Box<dyn RegionDecoder>> {
            Ok(Box::new(StubDecoder {
                info: self.info.clone(),
                fail_col: self.fail_col,
            }))
        }

        fn parallel_safe(&self) -> bool {
            true
        }
    }

    fn stub_thread(
        fail_col: Option<u32>,
    ) -> (
        DecodeThread,
        DecodeThreadSender,
        Sender<DecodeCommandMessage>,
        Receiver<DecodeReplyMessage>,
    ) {
        let decoder = TileDecoder::new(
            Box::new(StubDecoder {
                info: ImageInfo::new(1000, 1000, "image/png"),
                fail_col,
            }),
            2,
        );
        let (to_dt_sender, to_dt_receiver) = async_channel::unbounded();
        let (from_dt_sender, from_dt_receiver) = async_channel::unbounded();
        let thread = DecodeThread::new(decoder, to_dt_receiver, from_dt_sender);
        let sender = thread.create_sender(to_dt_sender.clone());
        (thread, sender, to_dt_sender, from_dt_receiver)
    }

    fn decode_command(col: u32) -> DecodeCommand {
        DecodeCommand::Decode {
            key: TileKey::new(1, col, 0),
            src_rect: RectI::new(0, 0, 250, 250),
            sample_size: 1,
        }
    }

    #[test]
    fn test_round_trip_through_workers() {
        let (_thread, sender, _raw, replies) = stub_thread(None);
        assert!(sender.send(decode_command(3)));

        let message = replies.recv_blocking().unwrap();
        assert_eq!(message.epoch, 0);
        let DecodeReply::Done { key, result } = message.reply;
        assert_eq!(key, TileKey::new(1, 3, 0));
        assert!(result.is_ok());
    }

    #[test]
    fn test_decode_errors_travel_back() {
        let (_thread, sender, _raw, replies) = stub_thread(Some(7));
        assert!(sender.send(decode_command(7)));

        let DecodeReply::Done { result, .. } = replies.recv_blocking().unwrap().reply;
        assert!(matches!(result, Err(MzoomError::Decode(_))));
    }

    #[test]
    fn test_stale_epoch_commands_are_skipped() {
        let (_thread, sender, raw, replies) = stub_thread(None);
        sender.bump_epoch();

        // A command stamped with the superseded epoch is skipped without a
        // reply; the fresh one that follows is the only reply we get
        raw.send_blocking(DecodeCommandMessage {
            epoch: 0,
            cmd: decode_command(1),
        })
        .unwrap();
        assert!(sender.send(decode_command(2)));

        let message = replies.recv_blocking().unwrap();
        assert_eq!(message.epoch, 1);
        let DecodeReply::Done { key, .. } = message.reply;
        assert_eq!(key.col, 2);
        assert!(replies.is_empty());
    }

    #[test]
    fn test_workers_exit_when_channel_closes() {
        let (thread, sender, raw, _replies) = stub_thread(None);
        drop(sender);
        drop(raw);
        thread.close();
        // Workers drain and exit; joining must not deadlock
        for handle in thread._handles {
            handle.join().unwrap();
        }
    }
}
