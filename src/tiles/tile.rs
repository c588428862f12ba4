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

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::rect::{RectI, SizeI};

/// Identifies one cell of the tile grid at one sample size. Fresh
/// requirements always produce fresh keys, which is what makes stale decode
/// results detectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub sample_size: u32,
    pub col: u32,
    pub row: u32,
}

impl TileKey {
    pub fn new(sample_size: u32, col: u32, row: u32) -> Self {
        Self {
            sample_size,
            col,
            row,
        }
    }

    /// The cache key for this tile within the given image session.
    pub fn cache_key(&self, image_key: &str) -> String {
        format!("{image_key}@{self}")
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}x{}", self.sample_size, self.col, self.row)
    }
}

/// Lifecycle of a tile. A tile never goes back from `Decoded` to `Waiting`;
/// when the requirement changes the tile is destroyed and a fresh one takes
/// its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Created, not yet handed to the decoder
    Waiting,
    /// Handed to the decode workers
    Decoding,
    /// Image available
    Decoded,
    /// Decode failed; the coarser background tile stays visible
    Error,
}

/// Decoded RGBA8 pixels of one tile. Cheap to clone - the pixel buffer is
/// shared - so the cache and the manager can both hold it; the cache stays
/// the only authority on eviction.
#[derive(Debug, Clone)]
pub struct TileImage {
    inner: Arc<TileImageData>,
}

#[derive(Debug)]
struct TileImageData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TileImage {
    /// Wraps an RGBA8 pixel buffer; `pixels.len()` must be
    /// `width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            inner: Arc::new(TileImageData {
                width,
                height,
                pixels,
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.inner.pixels
    }

    /// Memory footprint used for the cache byte budget.
    pub fn byte_count(&self) -> usize {
        self.inner.pixels.len()
    }
}

impl PartialEq for TileImage {
    /// Two tile images are equal when they share the same pixel buffer.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// One live tile owned by the tile manager.
#[derive(Debug, Clone)]
pub struct Tile {
    pub key: TileKey,
    /// Source rectangle in original image pixels, pre-rotation
    pub src_rect: RectI,
    pub sample_size: u32,
    pub state: TileState,
    pub image: Option<TileImage>,
}

impl Tile {
    pub fn new(key: TileKey, src_rect: RectI) -> Self {
        Self {
            key,
            src_rect,
            sample_size: key.sample_size,
            state: TileState::Waiting,
            image: None,
        }
    }
}

/// Immutable projection of a [`Tile`] handed to the render callback.
/// Background tiles come first in the snapshot list so they are drawn
/// underneath the foreground grid.
#[derive(Debug, Clone)]
pub struct TileSnapshot {
    pub key: TileKey,
    pub src_rect: RectI,
    pub sample_size: u32,
    pub state: TileState,
    pub image: Option<TileImage>,
    pub background: bool,
}

impl TileSnapshot {
    pub fn of(tile: &Tile, background: bool) -> Self {
        Self {
            key: tile.key,
            src_rect: tile.src_rect,
            sample_size: tile.sample_size,
            state: tile.state,
            image: tile.image.clone(),
            background,
        }
    }
}

/// Largest sample size the grid enumeration will consider.
const MAX_SAMPLE_SIZE: u32 = 1 << 14;

/// The power-of-two downsample factor needed at the given scale from
/// original pixels to container pixels: the greatest power of two that does
/// not exceed `1 / scale`, never less than 1. Non-increasing as the scale
/// grows.
pub fn sample_size_for_scale(scale_to_original: f64) -> u32 {
    if !scale_to_original.is_finite() || scale_to_original <= 0.0 {
        return 1;
    }
    let ratio = 1.0 / scale_to_original;
    let mut sample = 1u32;
    while ((sample * 2) as f64) <= ratio + 1.0e-9 && sample < MAX_SAMPLE_SIZE {
        sample *= 2;
    }
    sample
}

/// The decoded size of a tile should stay near half the container so a
/// screenful is a handful of tiles, bounded by the platform texture ceiling.
pub fn preferred_tile_size(container: SizeI, texture_ceiling: u32) -> SizeI {
    let ceiling = texture_ceiling as i32;
    SizeI::new(
        (container.width() / 2).clamp(64, ceiling),
        (container.height() / 2).clamp(64, ceiling),
    )
}

/// Grid dimensions (columns x rows) covering the image with tiles of
/// `preferred` decoded pixels at the given sample size.
pub fn grid_size(image: SizeI, preferred: SizeI, sample_size: u32) -> SizeI {
    let tile_w = preferred.width() * sample_size as i32;
    let tile_h = preferred.height() * sample_size as i32;
    SizeI::new(
        (image.width() + tile_w - 1) / tile_w,
        (image.height() + tile_h - 1) / tile_h,
    )
}

/// Grid dimensions for every sample size from `base_sample` down to 1.
///
/// An empty map means subsampling is off for this image: when the base
/// placement already shows the content at native resolution (base sample
/// size 1) there is no finer level to stream in.
pub fn grid_size_map(image: SizeI, preferred: SizeI, base_sample: u32) -> BTreeMap<u32, SizeI> {
    let mut map = BTreeMap::new();
    if base_sample <= 1 || !image.is_positive() || !preferred.is_positive() {
        return map;
    }
    let mut sample = base_sample;
    loop {
        map.insert(sample, grid_size(image, preferred, sample));
        if sample == 1 {
            break;
        }
        sample /= 2;
    }
    map
}

/// The grid cells at `sample_size` that intersect `rect` (original image
/// pixels), together with their source rectangles. The source rectangles of
/// a full row/column sweep tile the image exactly: no gaps, no overlap, and
/// edge tiles are clipped to the image bounds.
pub fn cells_in_rect(
    image: SizeI,
    preferred: SizeI,
    sample_size: u32,
    rect: RectI,
) -> Vec<(TileKey, RectI)> {
    let clipped = rect.intersect(&RectI::new_from_size(image));
    if clipped.is_empty() {
        return Vec::new();
    }
    let tile_w = preferred.width() * sample_size as i32;
    let tile_h = preferred.height() * sample_size as i32;

    let col0 = clipped.x0 / tile_w;
    let col1 = (clipped.x1 - 1) / tile_w;
    let row0 = clipped.y0 / tile_h;
    let row1 = (clipped.y1 - 1) / tile_h;

    let mut cells = Vec::with_capacity(((col1 - col0 + 1) * (row1 - row0 + 1)) as usize);
    for row in row0..=row1 {
        for col in col0..=col1 {
            let src = RectI::new(
                col * tile_w,
                row * tile_h,
                ((col + 1) * tile_w).min(image.width()),
                ((row + 1) * tile_h).min(image.height()),
            );
            cells.push((TileKey::new(sample_size, col as u32, row as u32), src));
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_size_is_power_of_two_and_monotonic() {
        let mut previous = u32::MAX;
        for scale in [0.05, 0.1, 0.2, 0.25, 0.4, 0.5, 0.9, 1.0, 2.0, 8.0] {
            let sample = sample_size_for_scale(scale);
            assert!(sample >= 1);
            assert!(sample.is_power_of_two());
            assert!(sample <= previous, "sample must not grow with scale");
            previous = sample;
        }
        assert_eq!(sample_size_for_scale(0.25), 4);
        assert_eq!(sample_size_for_scale(0.26), 2);
        assert_eq!(sample_size_for_scale(1.0), 1);
        assert_eq!(sample_size_for_scale(4.0), 1);
        assert_eq!(sample_size_for_scale(0.0), 1);
        assert_eq!(sample_size_for_scale(f64::NAN), 1);
    }

    #[test]
    fn test_preferred_tile_size() {
        assert_eq!(
            preferred_tile_size(SizeI::new(500, 500), 4096),
            SizeI::new(250, 250)
        );
        // Tiny containers are lifted to a workable tile size
        assert_eq!(
            preferred_tile_size(SizeI::new(64, 64), 4096),
            SizeI::new(64, 64)
        );
        // Huge containers are capped by the texture ceiling
        assert_eq!(
            preferred_tile_size(SizeI::new(16384, 16384), 4096),
            SizeI::new(4096, 4096)
        );
    }

    #[test]
    fn test_reference_grid_size_map() {
        // 2000x618 image in a 500x500 container (preferred tile 250x250),
        // base sample size 4
        let map = grid_size_map(SizeI::new(2000, 618), SizeI::new(250, 250), 4);
        assert_eq!(map.len(), 3);
        assert_eq!(map[&4], SizeI::new(2, 1));
        assert_eq!(map[&2], SizeI::new(4, 2));
        assert_eq!(map[&1], SizeI::new(8, 3));
    }

    #[test]
    fn test_grid_size_map_empty_at_native_resolution() {
        let map = grid_size_map(SizeI::new(2000, 618), SizeI::new(250, 250), 1);
        assert!(map.is_empty());
    }

    #[test]
    fn test_cells_cover_visible_rect_without_gaps() {
        let image = SizeI::new(2000, 618);
        let preferred = SizeI::new(250, 250);
        let visible = RectI::new(300, 100, 1200, 500);

        let cells = cells_in_rect(image, preferred, 1, visible);
        assert!(!cells.is_empty());

        // The union of the source rects covers the visible rect
        let mut union = RectI::default();
        for (_, src) in &cells {
            union = union.union(src);
        }
        assert_eq!(union.intersect(&visible), visible);

        // Cells never overlap and never leave the image
        for (i, (_, a)) in cells.iter().enumerate() {
            assert!(a.x1 <= image.width() && a.y1 <= image.height());
            for (_, b) in cells.iter().skip(i + 1) {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_cells_edge_tiles_reach_image_border() {
        let image = SizeI::new(2000, 618);
        let preferred = SizeI::new(250, 250);
        let cells = cells_in_rect(image, preferred, 2, RectI::new_from_size(image));

        // 4x2 grid at sample size 2
        assert_eq!(cells.len(), 8);
        let last = &cells.last().unwrap().1;
        assert_eq!(last.x1, 2000);
        assert_eq!(last.y1, 618);
        // The bottom row is a partial tile
        assert_eq!(last.height(), 618 - 500);
    }

    #[test]
    fn test_cells_outside_image_are_empty() {
        let cells = cells_in_rect(
            SizeI::new(1000, 1000),
            SizeI::new(250, 250),
            1,
            RectI::new(2000, 2000, 3000, 3000),
        );
        assert!(cells.is_empty());
    }

    #[test]
    fn test_tile_image_sharing() {
        let image = TileImage::from_rgba8(2, 2, vec![0u8; 16]);
        let clone = image.clone();
        assert_eq!(image, clone);
        assert_eq!(image.byte_count(), 16);

        let other = TileImage::from_rgba8(2, 2, vec![0u8; 16]);
        assert_ne!(image, other); // equality is sharing, not content
    }

    #[test]
    fn test_tile_lifecycle_starts_waiting() {
        let tile = Tile::new(TileKey::new(2, 1, 0), RectI::new(500, 0, 1000, 500));
        assert_eq!(tile.state, TileState::Waiting);
        assert!(tile.image.is_none());
        assert_eq!(tile.sample_size, 2);
    }

    #[test]
    fn test_cache_key_format() {
        let key = TileKey::new(4, 3, 2);
        assert_eq!(key.cache_key("photo.jpg"), "photo.jpg@4-3x2");
    }
}
