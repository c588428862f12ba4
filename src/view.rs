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

use std::{collections::BTreeMap, time::Duration};

use async_channel::Receiver;
use log::debug;

use crate::{
    config::Settings,
    decode_thread::{
        model::{DecodeReply, DecodeReplyMessage},
        DecodeThread, DecodeThreadSender,
    },
    error::MzoomResult,
    rect::{PointD, RectI, SizeI, VectorD},
    tiles::{
        decoder::{read_image_info, ImageSource, RegionDecoderFactory, TileDecoder},
        manager::TileManager,
        tile::TileSnapshot,
    },
    zoom::{scales::ReadMode, transform::Transform, Alignment, ContentScale, ZoomEngine},
};

/// Invoked after every state change with the composed transform and the
/// current tile snapshots (background tiles first).
pub type RenderCallback = Box<dyn FnMut(&Transform, &[TileSnapshot])>;

/// Wires the zoom engine to the tile manager and the host render layer.
///
/// The view owns the image session: it probes the source, builds the region
/// decoder and its worker pool, forwards every transform change into
/// `refresh_tiles`, and marshals decode completions back onto the owning
/// thread through [`ZoomView::drain_decode_replies`]. All methods are
/// called from the single owning thread.
pub struct ZoomView {
    settings: Settings,
    engine: ZoomEngine,
    manager: Option<TileManager>,
    decode_thread: Option<DecodeThread>,
    command_sender: Option<DecodeThreadSender>,
    reply_receiver: Option<Receiver<DecodeReplyMessage>>,
    render_callback: Option<RenderCallback>,
}

impl ZoomView {
    pub fn new(settings: Settings) -> Self {
        Self {
            engine: ZoomEngine::new(settings.clone()),
            settings,
            manager: None,
            decode_thread: None,
            command_sender: None,
            reply_receiver: None,
            render_callback: None,
        }
    }

    pub fn set_render_callback(&mut self, callback: RenderCallback) {
        self.render_callback = Some(callback);
    }

    /// Starts an image session: probes the source, resets the user
    /// transform, and - when the image supports it - builds the region
    /// decoder pool and tile manager. The container size should be set
    /// before this call; the session derives its tile geometry from it.
    ///
    /// `SourceUnavailable` and `UnsupportedImage` are the one-time results
    /// the host may surface to the user; in both cases the engine remains
    /// usable for single-bitmap display of whatever the host has resident.
    pub fn set_image(
        &mut self,
        source: &dyn ImageSource,
        factory: &dyn RegionDecoderFactory,
        content_size: SizeI,
    ) -> MzoomResult<()> {
        self.close_session();

        let info = read_image_info(source)?;
        self.engine.reset();
        self.engine
            .set_content_size(content_size.to_size_d(), Some(info.size().to_size_d()));

        let decoder = factory.create(source, &info)?;
        let tile_decoder = TileDecoder::new(decoder, self.settings.decoder_pool_size);

        let (to_dt_sender, to_dt_receiver) = async_channel::unbounded();
        let (from_dt_sender, from_dt_receiver) = async_channel::unbounded();
        let decode_thread = DecodeThread::new(tile_decoder, to_dt_receiver, from_dt_sender);
        let sender = decode_thread.create_sender(to_dt_sender);

        let manager = TileManager::new(
            source.key(),
            info,
            self.container_size_i(),
            self.engine.scale_to_original(),
            &self.settings,
            sender.clone(),
        );
        debug!(
            "image session {}: subsampling {}",
            source.key(),
            if manager.subsampling_enabled() { "on" } else { "off" }
        );

        self.manager = Some(manager);
        self.decode_thread = Some(decode_thread);
        self.command_sender = Some(sender);
        self.reply_receiver = Some(from_dt_receiver);

        self.update("set_image");
        Ok(())
    }

    /// Ends the current image session. Queued decode work is invalidated
    /// via the epoch; the workers exit once every command sender is gone.
    pub fn close_session(&mut self) {
        if let Some(sender) = &self.command_sender {
            sender.bump_epoch();
        }
        if let Some(thread) = &self.decode_thread {
            thread.close();
        }
        if let Some(mut manager) = self.manager.take() {
            manager.reset();
        }
        self.decode_thread = None;
        self.command_sender = None;
        self.reply_receiver = None;
    }

    fn container_size_i(&self) -> SizeI {
        self.engine.container_size().round()
    }

    // State changes, each followed by a tile refresh and render notification

    pub fn set_container_size(&mut self, size: SizeI) {
        self.engine.set_container_size(size.to_size_d());
        self.update("container_resized");
    }

    pub fn set_content_scale(&mut self, content_scale: ContentScale) {
        self.engine.set_content_scale(content_scale);
        self.update("content_scale_changed");
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.engine.set_alignment(alignment);
        self.update("alignment_changed");
    }

    pub fn set_rotation(&mut self, rotation: i32) {
        self.engine.set_rotation(rotation);
        self.update("rotation_changed");
    }

    /// Enables or disables read mode (auto-fill for long images), using the
    /// configured aspect-ratio threshold.
    pub fn set_read_mode(&mut self, enabled: bool) {
        let read_mode = enabled.then(|| ReadMode::new(self.settings.read_mode_aspect_threshold));
        self.engine.set_read_mode(read_mode);
        self.update("read_mode_changed");
    }

    pub fn rotate_by(&mut self, degrees: i32) {
        self.engine.rotate_by(degrees);
        self.update("rotated");
    }

    pub fn scale_to(&mut self, target_scale: f64, centroid: PointD, animated: bool) {
        self.engine.scale_to(target_scale, centroid, animated);
        self.update("scaled");
    }

    pub fn switch_scale(&mut self, centroid: Option<PointD>, animated: bool) {
        self.engine.switch_scale(centroid, animated);
        self.update("scale_switched");
    }

    pub fn zoom_in(&mut self, centroid: PointD) {
        self.engine.zoom_in(centroid);
        self.update("zoom_in");
    }

    pub fn zoom_out(&mut self, centroid: PointD) {
        self.engine.zoom_out(centroid);
        self.update("zoom_out");
    }

    pub fn drag(&mut self, delta: VectorD) {
        self.engine.drag(delta);
        self.update("drag");
    }

    pub fn drag_end(&mut self, velocity: VectorD) {
        self.engine.drag_end(velocity);
        self.update("drag_end");
    }

    pub fn reset_transform(&mut self) {
        self.engine.reset();
        self.update("reset");
    }

    /// Drives the running animation; the host calls this from its frame
    /// clock while it returns true.
    pub fn advance_animation(&mut self, dt: Duration) -> bool {
        let running = self.engine.advance_animation(dt);
        self.update("animation");
        running
    }

    /// Recomputes the tile grid for the current transform and notifies the
    /// render callback. Invoked by every mutation above; hosts driving the
    /// engine directly call it themselves.
    pub fn update(&mut self, caller: &str) {
        if let Some(manager) = &mut self.manager {
            manager.refresh_tiles(
                self.engine.image_load_rect(),
                self.engine.scale_to_original(),
                self.engine.rotation(),
                self.engine.is_transforming(),
                caller,
            );
        }
        self.notify();
    }

    /// Moves finished decodes from the worker threads into tile state, on
    /// the owning thread. Stale replies (superseded epoch, evicted tile) are
    /// dropped. Returns true when any tile changed; the grid is refreshed
    /// afterwards so satisfied background tiles get evicted.
    pub fn drain_decode_replies(&mut self) -> bool {
        let (Some(receiver), Some(sender), Some(manager)) = (
            &self.reply_receiver,
            &self.command_sender,
            &mut self.manager,
        ) else {
            return false;
        };

        let epoch = sender.current_epoch();
        let mut committed = false;
        while let Ok(message) = receiver.try_recv() {
            if message.epoch != epoch {
                continue;
            }
            let DecodeReply::Done { key, result } = message.reply;
            committed |= manager.on_decode_complete(key, result);
        }
        if committed {
            self.update("decode_complete");
        }
        committed
    }

    fn notify(&mut self) {
        if let Some(callback) = &mut self.render_callback {
            let transform = self.engine.transform();
            let snapshots = self
                .manager
                .as_ref()
                .map(|manager| manager.snapshots())
                .unwrap_or_default();
            callback(&transform, &snapshots);
        }
    }

    // Read-only surface for the render layer

    pub fn engine(&self) -> &ZoomEngine {
        &self.engine
    }

    pub fn transform(&self) -> Transform {
        self.engine.transform()
    }

    pub fn tile_snapshots(&self) -> Vec<TileSnapshot> {
        self.manager
            .as_ref()
            .map(|manager| manager.snapshots())
            .unwrap_or_default()
    }

    /// The original-image area tiles are being loaded for (visible rect
    /// plus prefetch margin), or the bare visible rect when no tile session
    /// is active.
    pub fn image_load_rect(&self) -> RectI {
        self.manager
            .as_ref()
            .map(|manager| manager.image_load_rect())
            .unwrap_or_else(|| self.engine.image_load_rect())
    }

    pub fn tile_grid_size_map(&self) -> BTreeMap<u32, SizeI> {
        self.manager
            .as_ref()
            .map(|manager| manager.tile_grid_size_map().clone())
            .unwrap_or_default()
    }

    pub fn subsampling_enabled(&self) -> bool {
        self.manager
            .as_ref()
            .map(|manager| manager.subsampling_enabled())
            .unwrap_or(false)
    }
}

impl Drop for ZoomView {
    fn drop(&mut self) {
        self.close_session();
    }
}
