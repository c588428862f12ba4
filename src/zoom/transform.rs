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

use crate::rect::{PointD, RectD, VectorD};

/// Floating point comparison epsilon for scale factors
const SCALE_EPSILON: f64 = 1.0e-6;

/// Per-axis scale factor. Most content-scale modes produce a uniform factor;
/// `FillBounds` stretches the axes independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor {
    pub x: f64,
    pub y: f64,
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

impl ScaleFactor {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The same factor on both axes.
    pub fn uniform(scale: f64) -> Self {
        Self { x: scale, y: scale }
    }

    pub fn is_identity(&self) -> bool {
        (self.x - 1.0).abs() < SCALE_EPSILON && (self.y - 1.0).abs() < SCALE_EPSILON
    }

    /// Returns the factor with the axes exchanged. Needed when a 90 or 270
    /// degree rotation is applied after this scale.
    pub fn swapped(&self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }

    /// Component-wise product.
    pub fn mul(&self, other: ScaleFactor) -> Self {
        Self {
            x: self.x * other.x,
            y: self.y * other.y,
        }
    }

    /// Multiplies both axes by a uniform factor.
    pub fn times(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

/// An affine transform restricted to what the viewer can express: a per-axis
/// scale, a translation and a rotation in 90-degree steps.
///
/// Mapping a content point `p` applies rotation about the origin first, then
/// the scale, then the offset:
///
/// ```text
/// p' = rotate(p, rotation) * scale + offset
/// ```
///
/// The placement math absorbs the rotation pivot into `offset` (rotating
/// about a pivot equals rotating about the origin plus a constant
/// translation), so no separate pivot is carried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: ScaleFactor,
    pub offset: VectorD,
    /// Rotation angle in degrees (0, 90, 180, 270)
    pub rotation: i32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(scale: ScaleFactor, offset: VectorD, rotation: i32) -> Self {
        Self {
            scale,
            offset,
            rotation: rotation.rem_euclid(360),
        }
    }

    /// The neutral element of [`Transform::compose`].
    pub fn identity() -> Self {
        Self {
            scale: ScaleFactor::default(),
            offset: VectorD::default(),
            rotation: 0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.scale.is_identity() && self.rotation == 0 && self.offset.length() < SCALE_EPSILON
    }

    /// Maps a point from the source space of this transform to its target
    /// space (rotate, then scale, then translate).
    pub fn map_point(&self, p: PointD) -> PointD {
        p.rotate(self.rotation)
            .scale_xy(self.scale.x, self.scale.y)
            .translate(self.offset)
    }

    /// Maps a point from the target space back to the source space. Inverse
    /// of [`Transform::map_point`].
    pub fn unmap_point(&self, p: PointD) -> PointD {
        (p - self.offset)
            .unscale_xy(self.scale.x, self.scale.y)
            .rotate(-self.rotation)
    }

    /// Maps a rectangle to the target space; the result is normalized so it
    /// stays valid under rotation.
    pub fn map_rect(&self, rect: &RectD) -> RectD {
        rect.rotate(self.rotation)
            .scale_xy(self.scale.x, self.scale.y)
            .translate(self.offset)
    }

    /// Maps a rectangle from the target space back to the source space.
    pub fn unmap_rect(&self, rect: &RectD) -> RectD {
        rect.translate(self.offset.neg())
            .unscale_xy(self.scale.x, self.scale.y)
            .rotate(-self.rotation)
    }

    /// Composes two transforms: the result first applies `self`, then
    /// `other`. Composition is associative with [`Transform::identity`] as
    /// the neutral element, but it is not commutative - scaling after a
    /// translation moves the translation, translating after a scale does
    /// not.
    pub fn compose(&self, other: &Transform) -> Transform {
        // A 90 or 270 degree rotation applied after this scale exchanges the
        // axes the scale acts on.
        let scale = match other.rotation.rem_euclid(360) {
            90 | 270 => self.scale.swapped(),
            _ => self.scale,
        };
        Transform {
            scale: scale.mul(other.scale),
            offset: other.map_point(self.offset),
            rotation: (self.rotation + other.rotation).rem_euclid(360),
        }
    }
}
