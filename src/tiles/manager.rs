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

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace, warn};

use crate::{
    config::Settings,
    decode_thread::{model::DecodeCommand, DecodeThreadSender},
    error::MzoomError,
    rect::{RectI, SizeI},
    tiles::{
        cache::TileCache,
        tile::{
            cells_in_rect, grid_size_map, preferred_tile_size, sample_size_for_scale, Tile,
            TileKey, TileSnapshot, TileState,
        },
        ImageInfo, TileImage,
    },
};

/// The tiling state machine.
///
/// On every `refresh_tiles` call the manager computes the tile grid the
/// current viewport needs - a foreground set at the sample size matching the
/// scale, plus a coarser background set that keeps the viewport covered
/// while foreground tiles decode - and reconciles it against the live tile
/// set: stale tiles are released, missing ones created and queued for
/// decoding, everything else is left untouched. Decode completions are
/// committed only when the tile is still live.
///
/// All methods run on the single owning thread.
pub struct TileManager {
    image_key: String,
    image_info: ImageInfo,
    preferred_tile: SizeI,
    grid_map: BTreeMap<u32, SizeI>,
    tiles: HashMap<TileKey, Tile>,
    sample_size: u32,
    image_load_rect: RectI,
    pause_when_transforming: bool,
    prefetch_margin: f64,
    cache: TileCache,
    sender: DecodeThreadSender,
}

impl TileManager {
    /// `base_scale_to_original` is the original-pixels-to-container-pixels
    /// scale of the base placement; it fixes the coarsest sample size of the
    /// session. When that sample size is already 1 the content needs no
    /// subsampling and the manager stays inert.
    pub fn new(
        image_key: &str,
        image_info: ImageInfo,
        container_size: SizeI,
        base_scale_to_original: f64,
        settings: &Settings,
        sender: DecodeThreadSender,
    ) -> Self {
        let preferred_tile = preferred_tile_size(container_size, settings.texture_ceiling);
        let base_sample = sample_size_for_scale(base_scale_to_original);
        let grid_map = grid_size_map(image_info.size(), preferred_tile, base_sample);
        debug!(
            "tile session for {image_key}: base sample {base_sample}, {} levels",
            grid_map.len()
        );
        Self {
            image_key: image_key.to_string(),
            image_info,
            preferred_tile,
            grid_map,
            tiles: HashMap::new(),
            sample_size: base_sample,
            image_load_rect: RectI::default(),
            pause_when_transforming: settings.pause_when_transforming,
            prefetch_margin: settings.prefetch_margin,
            cache: TileCache::new(settings.cache_capacity_bytes),
            sender,
        }
    }

    /// False when the content is already at native resolution and tiling
    /// would add nothing.
    pub fn subsampling_enabled(&self) -> bool {
        !self.grid_map.is_empty()
    }

    /// Diagnostic: sample size to grid columns x rows, for every level of
    /// this session.
    pub fn tile_grid_size_map(&self) -> &BTreeMap<u32, SizeI> {
        &self.grid_map
    }

    /// The sample size selected by the last refresh.
    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    /// The area of the original image (pixels) the last refresh loaded
    /// tiles for: the visible rect expanded by the prefetch margin.
    pub fn image_load_rect(&self) -> RectI {
        self.image_load_rect
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Recomputes the required tile set for the given viewport state and
    /// reconciles the live tiles against it. Returns true when any tile was
    /// created, released or changed state.
    ///
    /// `visible_rect` is in original image pixels, pre-rotation (rotation
    /// only affects which part of the image is visible, which the caller
    /// already folded into the rect - hence the parameter is unused beyond
    /// tracing). While `transforming` is set and the pause policy is on,
    /// the previously computed grid stays authoritative.
    pub fn refresh_tiles(
        &mut self,
        visible_rect: RectI,
        scale_to_original: f64,
        rotation: i32,
        transforming: bool,
        caller: &str,
    ) -> bool {
        if !self.subsampling_enabled() {
            return false;
        }
        if transforming && self.pause_when_transforming {
            trace!("refresh_tiles({caller}): paused during continuous transform");
            return false;
        }

        let base_sample = *self.grid_map.keys().next_back().unwrap_or(&1);
        let sample = sample_size_for_scale(scale_to_original).min(base_sample);

        let margin = (self.prefetch_margin
            * self.preferred_tile.width().min(self.preferred_tile.height()) as f64
            * sample as f64) as i32;
        let load_rect = visible_rect
            .expand(margin)
            .intersect(&RectI::new_from_size(self.image_info.size()));

        let foreground = cells_in_rect(self.image_info.size(), self.preferred_tile, sample, load_rect);

        // One coarser level underneath, kept per cell until every foreground
        // tile covering that cell has decoded
        let background_sample = sample * 2;
        let background: Vec<(TileKey, RectI)> =
            cells_in_rect(self.image_info.size(), self.preferred_tile, background_sample, load_rect)
                .into_iter()
                .filter(|(_, src)| {
                    foreground.iter().any(|(fg_key, fg_src)| {
                        fg_src.intersects(src)
                            && self
                                .tiles
                                .get(fg_key)
                                .map(|tile| tile.state != TileState::Decoded)
                                .unwrap_or(true)
                    })
                })
                .collect();

        let mut required: HashSet<TileKey> = HashSet::with_capacity(foreground.len() + background.len());
        required.extend(foreground.iter().map(|(key, _)| *key));
        required.extend(background.iter().map(|(key, _)| *key));

        let mut changed = false;

        // Release tiles that fell out of the requirement, and failed tiles
        // so the idempotent recomputation below retries them
        let before = self.tiles.len();
        self.tiles
            .retain(|key, tile| required.contains(key) && tile.state != TileState::Error);
        if self.tiles.len() != before {
            trace!(
                "refresh_tiles({caller}): released {} tiles",
                before - self.tiles.len()
            );
            changed = true;
        }

        // Create what is missing; the cache may satisfy a tile outright
        for (key, src_rect) in foreground.iter().chain(background.iter()) {
            if self.tiles.contains_key(key) {
                continue;
            }
            let mut tile = Tile::new(*key, *src_rect);
            if let Some(image) = self.cache.get(&key.cache_key(&self.image_key)) {
                tile.image = Some(image);
                tile.state = TileState::Decoded;
            }
            self.tiles.insert(*key, tile);
            changed = true;
        }

        // Hand fresh tiles to the decode workers
        for tile in self.tiles.values_mut() {
            if tile.state == TileState::Waiting {
                let sent = self.sender.send(DecodeCommand::Decode {
                    key: tile.key,
                    src_rect: tile.src_rect,
                    sample_size: tile.key.sample_size,
                });
                if sent {
                    tile.state = TileState::Decoding;
                    changed = true;
                }
            }
        }

        self.sample_size = sample;
        self.image_load_rect = load_rect;
        trace!(
            "refresh_tiles({caller}): sample {sample}, rotation {rotation}, {} tiles",
            self.tiles.len()
        );
        changed
    }

    /// Commits a decode completion. A result for a tile that has been
    /// evicted - or that is not in `Decoding` state - is discarded, which is
    /// what makes late arrivals harmless. Returns true when tile state
    /// changed.
    pub fn on_decode_complete(
        &mut self,
        key: TileKey,
        result: Result<TileImage, MzoomError>,
    ) -> bool {
        let Some(tile) = self.tiles.get_mut(&key) else {
            trace!("discarding decode result for evicted tile {key}");
            return false;
        };
        if tile.state != TileState::Decoding {
            trace!("discarding decode result for tile {key} in {:?}", tile.state);
            return false;
        }
        match result {
            Ok(image) => {
                // The cache owns reuse; a same-key victim is simply dropped
                let _ = self.cache.put(
                    &key.cache_key(&self.image_key),
                    image.clone(),
                    &self.image_key,
                    &self.image_info,
                );
                tile.image = Some(image);
                tile.state = TileState::Decoded;
            }
            Err(error) => {
                warn!("tile {key} failed to decode: {error}");
                tile.state = TileState::Error;
            }
        }
        true
    }

    /// Read-only projection for the render callback: background tiles
    /// first (drawn underneath), then the foreground grid, in key order.
    pub fn snapshots(&self) -> Vec<TileSnapshot> {
        let mut snapshots: Vec<TileSnapshot> = self
            .tiles
            .values()
            .map(|tile| TileSnapshot::of(tile, tile.key.sample_size != self.sample_size))
            .collect();
        snapshots.sort_by_key(|snapshot| (!snapshot.background, snapshot.key));
        snapshots
    }

    /// Drops every live tile and cached image; in-flight decode results
    /// will arrive for evicted tiles and be discarded.
    pub fn reset(&mut self) {
        self.tiles.clear();
        self.cache.clear();
        self.image_load_rect = RectI::default();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{atomic::AtomicU64, Arc};

    use async_channel::Receiver;

    use super::*;
    use crate::decode_thread::model::DecodeCommandMessage;

    fn test_image() -> TileImage {
        TileImage::from_rgba8(1, 1, vec![0, 0, 0, 255])
    }

    /// Manager over a raw channel; no workers, the test plays decoder.
    fn manager_500_2000x618() -> (TileManager, Receiver<DecodeCommandMessage>) {
        let (sender, receiver) = async_channel::unbounded();
        let sender = DecodeThreadSender::new(sender, Arc::new(AtomicU64::new(0)));
        let manager = TileManager::new(
            "photo.jpg",
            ImageInfo::new(2000, 618, "image/jpeg"),
            SizeI::new(500, 500),
            0.25,
            &Settings::default(),
            sender,
        );
        (manager, receiver)
    }

    fn drain_keys(receiver: &Receiver<DecodeCommandMessage>) -> Vec<TileKey> {
        let mut keys = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            let DecodeCommand::Decode { key, .. } = message.cmd;
            keys.push(key);
        }
        keys
    }

    #[test]
    fn test_reference_grid_map() {
        let (manager, _receiver) = manager_500_2000x618();
        assert!(manager.subsampling_enabled());
        let map = manager.tile_grid_size_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map[&4], SizeI::new(2, 1));
        assert_eq!(map[&2], SizeI::new(4, 2));
        assert_eq!(map[&1], SizeI::new(8, 3));
    }

    #[test]
    fn test_native_resolution_disables_subsampling() {
        let (sender, _receiver) = async_channel::unbounded();
        let sender = DecodeThreadSender::new(sender, Arc::new(AtomicU64::new(0)));
        let mut manager = TileManager::new(
            "photo.jpg",
            ImageInfo::new(2000, 618, "image/jpeg"),
            SizeI::new(500, 500),
            1.0,
            &Settings::default(),
            sender,
        );
        assert!(!manager.subsampling_enabled());
        assert!(manager.tile_grid_size_map().is_empty());
        assert!(!manager.refresh_tiles(RectI::new(0, 0, 500, 500), 1.0, 0, false, "test"));
        assert!(manager.snapshots().is_empty());
    }

    #[test]
    fn test_refresh_creates_and_queues_tiles() {
        let (mut manager, receiver) = manager_500_2000x618();
        let visible = RectI::new(0, 0, 2000, 618);

        assert!(manager.refresh_tiles(visible, 0.25, 0, false, "test"));
        assert_eq!(manager.sample_size(), 4);

        // Foreground 2x1 at sample 4, background 1x1 at sample 8
        let snapshots = manager.snapshots();
        let foreground: Vec<_> = snapshots.iter().filter(|s| !s.background).collect();
        let background: Vec<_> = snapshots.iter().filter(|s| s.background).collect();
        assert_eq!(foreground.len(), 2);
        assert_eq!(background.len(), 1);
        // Background is ordered before foreground for painting
        assert!(snapshots[0].background);

        // Everything was handed to the decoder
        assert!(snapshots.iter().all(|s| s.state == TileState::Decoding));
        assert_eq!(drain_keys(&receiver).len(), 3);

        // An identical refresh is a no-op
        assert!(!manager.refresh_tiles(visible, 0.25, 0, false, "test"));
        assert!(drain_keys(&receiver).is_empty());
    }

    #[test]
    fn test_foreground_covers_visible_rect() {
        let (mut manager, _receiver) = manager_500_2000x618();
        let visible = RectI::new(700, 150, 1300, 450);
        manager.refresh_tiles(visible, 1.0, 0, false, "test");
        assert_eq!(manager.sample_size(), 1);

        let mut union = RectI::default();
        for snapshot in manager.snapshots().iter().filter(|s| !s.background) {
            union = union.union(&snapshot.src_rect);
        }
        assert_eq!(union.intersect(&visible), visible);
        // The load rect includes the prefetch margin around the viewport
        assert_eq!(manager.image_load_rect(), visible.expand(125));
    }

    #[test]
    fn test_pause_during_continuous_transform() {
        let (mut manager, receiver) = manager_500_2000x618();
        assert!(!manager.refresh_tiles(RectI::new(0, 0, 2000, 618), 0.25, 0, true, "pinch"));
        assert_eq!(manager.tile_count(), 0);
        assert!(drain_keys(&receiver).is_empty());

        // The same call without the flag regenerates
        assert!(manager.refresh_tiles(RectI::new(0, 0, 2000, 618), 0.25, 0, false, "settle"));
        assert!(manager.tile_count() > 0);
    }

    #[test]
    fn test_decode_completion_commits_once_and_discards_stale() {
        let (mut manager, receiver) = manager_500_2000x618();
        manager.refresh_tiles(RectI::new(0, 0, 2000, 618), 0.25, 0, false, "test");
        let keys = drain_keys(&receiver);
        let key = keys[0];

        assert!(manager.on_decode_complete(key, Ok(test_image())));
        let snapshot = manager
            .snapshots()
            .into_iter()
            .find(|s| s.key == key)
            .unwrap();
        assert_eq!(snapshot.state, TileState::Decoded);
        assert!(snapshot.image.is_some());

        // A duplicate completion for the same tile is discarded
        assert!(!manager.on_decode_complete(key, Ok(test_image())));

        // A completion for a tile that was never created is discarded
        assert!(!manager.on_decode_complete(TileKey::new(1, 7, 2), Ok(test_image())));
    }

    #[test]
    fn test_zooming_in_releases_old_grid_and_discards_late_decodes() {
        let (mut manager, receiver) = manager_500_2000x618();
        manager.refresh_tiles(RectI::new(0, 0, 2000, 618), 0.25, 0, false, "fit");
        let coarse_keys = drain_keys(&receiver);

        // Zoom into a corner at full resolution: requirement changes
        manager.refresh_tiles(RectI::new(0, 0, 400, 300), 1.0, 0, false, "zoomed");
        assert_eq!(manager.sample_size(), 1);

        // A late decode for a released coarse tile is a no-op
        let gone: Vec<_> = coarse_keys
            .iter()
            .filter(|key| !manager.snapshots().iter().any(|s| s.key == **key))
            .collect();
        assert!(!gone.is_empty());
        assert!(!manager.on_decode_complete(*gone[0], Ok(test_image())));
    }

    #[test]
    fn test_background_survives_until_foreground_decoded() {
        let (mut manager, receiver) = manager_500_2000x618();
        let visible = RectI::new(0, 0, 600, 618);
        manager.refresh_tiles(visible, 1.0, 0, false, "test");

        let foreground_keys: Vec<TileKey> = manager
            .snapshots()
            .iter()
            .filter(|s| !s.background)
            .map(|s| s.key)
            .collect();
        let background_count = manager.snapshots().iter().filter(|s| s.background).count();
        assert!(background_count > 0);

        // Still loading: background stays through another refresh
        manager.refresh_tiles(visible, 1.0, 0, false, "test");
        assert_eq!(
            manager.snapshots().iter().filter(|s| s.background).count(),
            background_count
        );

        // Decode every foreground tile, then refresh: background evicted
        for key in foreground_keys {
            manager.on_decode_complete(key, Ok(test_image()));
        }
        assert!(manager.refresh_tiles(visible, 1.0, 0, false, "test"));
        assert_eq!(manager.snapshots().iter().filter(|s| s.background).count(), 0);
        drop(receiver);
    }

    #[test]
    fn test_error_keeps_background_and_retries_on_next_refresh() {
        let (mut manager, receiver) = manager_500_2000x618();
        let visible = RectI::new(0, 0, 600, 618);
        manager.refresh_tiles(visible, 1.0, 0, false, "test");
        let keys = drain_keys(&receiver);
        let failing = *keys
            .iter()
            .find(|key| key.sample_size == manager.sample_size())
            .unwrap();

        assert!(manager.on_decode_complete(failing, Err(MzoomError::Decode("boom".into()))));
        let background_count = manager.snapshots().iter().filter(|s| s.background).count();
        assert!(background_count > 0, "background must stay visible on error");

        // The next refresh with the same viewport retries the failed tile
        assert!(manager.refresh_tiles(visible, 1.0, 0, false, "retry"));
        let requeued = drain_keys(&receiver);
        assert!(requeued.contains(&failing));
        let snapshot = manager
            .snapshots()
            .into_iter()
            .find(|s| s.key == failing)
            .unwrap();
        assert_eq!(snapshot.state, TileState::Decoding);
    }

    #[test]
    fn test_cache_satisfies_tiles_without_decoding() {
        let (mut manager, receiver) = manager_500_2000x618();
        let visible = RectI::new(0, 0, 2000, 618);
        manager.refresh_tiles(visible, 0.25, 0, false, "first");
        for key in drain_keys(&receiver) {
            manager.on_decode_complete(key, Ok(test_image()));
        }

        // Change requirement away and back: tiles come straight from cache
        manager.refresh_tiles(RectI::new(0, 0, 300, 300), 1.0, 0, false, "away");
        drain_keys(&receiver);
        manager.refresh_tiles(visible, 0.25, 0, false, "back");

        let foreground: Vec<_> = manager
            .snapshots()
            .into_iter()
            .filter(|s| !s.background)
            .collect();
        assert!(!foreground.is_empty());
        assert!(foreground.iter().all(|s| s.state == TileState::Decoded));
        // Nothing new was queued for the cached tiles
        assert!(drain_keys(&receiver)
            .iter()
            .all(|key| key.sample_size != 4));
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut manager, receiver) = manager_500_2000x618();
        manager.refresh_tiles(RectI::new(0, 0, 2000, 618), 0.25, 0, false, "test");
        let keys = drain_keys(&receiver);
        manager.reset();
        assert_eq!(manager.tile_count(), 0);
        assert!(manager.snapshots().is_empty());
        // Late replies for the old session are discarded
        assert!(!manager.on_decode_complete(keys[0], Ok(test_image())));
    }
}
