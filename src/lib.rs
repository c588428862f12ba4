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

//! Pan, zoom and rotate an arbitrarily large image inside a bounded viewport
//! while only a content bitmap (typically a thumbnail) is resident in memory.
//! Full-resolution detail is streamed in as rectangular tiles decoded at the
//! power-of-two sample size the current viewport needs.
//!
//! The two cores are [`zoom::ZoomEngine`] (the transform state machine) and
//! [`tiles::TileManager`] (the tiling state machine); [`view::ZoomView`] wires
//! them together and talks to the host render layer.

pub mod config;
pub mod decode_thread;
pub mod error;
pub mod rect;
pub mod tiles;
pub mod view;
pub mod zoom;

pub use config::Settings;
pub use error::{MzoomError, MzoomResult};
pub use tiles::decoder::{ImageSource, RegionDecoder, RegionDecoderFactory};
pub use tiles::{ImageInfo, TileImage, TileSnapshot, TileState};
pub use view::ZoomView;
pub use zoom::transform::{ScaleFactor, Transform};
pub use zoom::{Alignment, ContentScale, ZoomEngine};
