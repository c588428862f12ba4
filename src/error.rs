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

use thiserror::Error;

/// Errors produced by the zoom and tiling engines.
///
/// Only `SourceUnavailable` and `UnsupportedImage` surface to the host as a
/// one-time result when an image session starts; everything else is recovered
/// locally (degraded transform, coarser tile stays visible).
#[derive(Error, Debug)]
pub enum MzoomError {
    /// Non-positive container or content dimensions. The engine degrades to
    /// an identity transform instead of failing.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A region decode failed. The affected tile is marked as errored and the
    /// coarser background tile remains visible.
    #[error("decode error: {0}")]
    Decode(String),

    /// The mime type or dimensions preclude subsampling. The image can still
    /// be shown as a single bitmap.
    #[error("unsupported image: {mime_type}")]
    UnsupportedImage { mime_type: String },

    /// Opening the image source failed. Subsampling is disabled.
    #[error("image source unavailable: {0}")]
    SourceUnavailable(#[from] std::io::Error),
}

pub type MzoomResult<T> = Result<T, MzoomError>;

impl From<image::ImageError> for MzoomError {
    fn from(error: image::ImageError) -> Self {
        MzoomError::Decode(error.to_string())
    }
}
