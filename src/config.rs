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

use std::{
    fs::{create_dir_all, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

/// Tuning values for the zoom and tiling engines.
///
/// A `Settings` value is handed to [`crate::view::ZoomView`] (or directly to
/// the engines) at construction. There is no process-wide configuration
/// state; hosts that want persistent settings can use [`Settings::load`] and
/// [`Settings::save`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Duration of an animated zoom step in milliseconds
    pub zoom_animation_ms: u64,
    /// Duration of the spring-back after releasing a rubber-banded drag
    pub spring_back_ms: u64,
    /// Multiplier applied per scroll-wheel zoom step
    pub zoom_multiplier: f64,
    /// Asymptotic limit, in container pixels, of panning past a bound
    pub rubber_band_limit: f64,
    /// Exponential decay rate of a fling, per second
    pub fling_decay: f64,
    /// Fling speed, in pixels per second, below which the fling stops
    pub fling_stop_speed: f64,
    /// Factor between the min/medium/max double-tap scale steps
    pub scale_step_multiple: f64,
    /// Aspect-ratio factor beyond which read mode considers an image "long"
    pub read_mode_aspect_threshold: f64,
    /// Upper bound for a decoded tile dimension (texture-size ceiling)
    pub texture_ceiling: u32,
    /// Fraction of the preferred tile size prefetched around the viewport
    pub prefetch_margin: f64,
    /// Byte budget of the in-memory tile cache
    pub cache_capacity_bytes: usize,
    /// Skip tile regeneration while a gesture, fling or animation is running
    pub pause_when_transforming: bool,
    /// Number of region-decoder instances (and worker threads) per image
    pub decoder_pool_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zoom_animation_ms: 300,
            spring_back_ms: 250,
            zoom_multiplier: 1.05,
            rubber_band_limit: 96.0,
            fling_decay: 4.2,
            fling_stop_speed: 40.0,
            scale_step_multiple: 3.0,
            read_mode_aspect_threshold: 2.5,
            texture_ceiling: 4096,
            prefetch_margin: 0.5,
            cache_capacity_bytes: 256 * 1024 * 1024,
            pause_when_transforming: true,
            decoder_pool_size: 2,
        }
    }
}

impl Settings {
    fn config_dir() -> PathBuf {
        let mut dir = dirs::config_dir().unwrap_or_default();
        dir.push("mzoom6");
        dir
    }

    fn config_file() -> PathBuf {
        Self::config_dir().join("mzoom6.json")
    }

    /// Reads settings from the user configuration directory, falling back to
    /// the defaults when the file is missing or malformed.
    pub fn load() -> Self {
        match File::open(Self::config_file()) {
            Ok(file) => serde_json::from_reader(file).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        create_dir_all(Self::config_dir())?;
        let file = File::create(Self::config_file())?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let settings = Settings::default();
        assert!(settings.zoom_multiplier > 1.0);
        assert!(settings.rubber_band_limit > 0.0);
        assert!(settings.fling_decay > 0.0);
        assert!(settings.scale_step_multiple > 1.0);
        assert!(settings.texture_ceiling >= 1024);
        assert!(settings.decoder_pool_size >= 1);
    }

    #[test]
    fn test_json_round_trip() {
        let mut settings = Settings::default();
        settings.zoom_animation_ms = 150;
        settings.pause_when_transforming = false;

        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, back);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let back: Settings = serde_json::from_str(r#"{"zoom_multiplier": 1.2}"#).unwrap();
        assert_eq!(back.zoom_multiplier, 1.2);
        assert_eq!(back.spring_back_ms, Settings::default().spring_back_ms);
    }
}
