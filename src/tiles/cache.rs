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

use log::debug;
use lru::LruCache;

use crate::tiles::{ImageInfo, TileImage};

struct CacheEntry {
    image: TileImage,
    _image_key: String,
}

/// Byte-size-bounded LRU cache for decoded tile images, shared across all
/// tiles of one image session.
///
/// The cache is the single source of truth for tile image reuse: the tile
/// manager requeries it on every refresh instead of assuming a previously
/// returned image is still resident. Accessed from the owning thread only.
pub struct TileCache {
    entries: LruCache<String, CacheEntry>,
    capacity_bytes: usize,
    used_bytes: usize,
}

impl TileCache {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity_bytes,
            used_bytes: 0,
        }
    }

    /// Looks up a tile image and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<TileImage> {
        self.entries.get(key).map(|entry| entry.image.clone())
    }

    /// Stores a tile image, evicting least-recently-used entries until the
    /// byte budget holds again. When the key was already present the
    /// replaced image is returned so the caller can recycle it.
    pub fn put(
        &mut self,
        key: &str,
        image: TileImage,
        image_key: &str,
        _image_info: &ImageInfo,
    ) -> Option<TileImage> {
        let added = image.byte_count();
        let replaced = self.entries.push(
            key.to_string(),
            CacheEntry {
                image,
                _image_key: image_key.to_string(),
            },
        );

        self.used_bytes += added;
        let replaced_image = match replaced {
            // push reports the displaced entry; same-key replacement is the
            // one the caller may want to recycle
            Some((old_key, entry)) => {
                self.used_bytes -= entry.image.byte_count();
                if old_key == key {
                    Some(entry.image)
                } else {
                    None
                }
            }
            None => None,
        };

        while self.used_bytes > self.capacity_bytes {
            match self.entries.pop_lru() {
                Some((evicted_key, entry)) => {
                    self.used_bytes -= entry.image.byte_count();
                    debug!("tile cache evicted {evicted_key} ({} bytes)", entry.image.byte_count());
                }
                None => break,
            }
        }

        replaced_image
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }
}
