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

use crate::rect::SizeD;
use crate::zoom::transform::ScaleFactor;

/// The three user-scale steps the double-tap cycle moves through.
///
/// All values are on the user-transform axis: 1.0 is the base placement
/// produced by the content-scale mode, `medium` and `max` zoom in from
/// there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scales {
    pub min: f64,
    pub medium: f64,
    pub max: f64,
}

impl Default for Scales {
    fn default() -> Self {
        Self {
            min: 1.0,
            medium: 3.0,
            max: 9.0,
        }
    }
}

/// Derives the min/medium/max scale steps from the container, content and
/// original image sizes.
///
/// `medium` reaches at least the scale that fills the container (Crop), and
/// `max` reaches at least the scale at which one original image pixel maps
/// to one container pixel, so a double-tap cycle always exposes the full
/// native resolution.
#[derive(Debug, Clone, Copy)]
pub struct ScalesCalculator {
    /// Factor between successive steps when fill/origin do not dictate more
    pub multiple: f64,
}

impl Default for ScalesCalculator {
    fn default() -> Self {
        Self { multiple: 3.0 }
    }
}

impl ScalesCalculator {
    pub fn new(multiple: f64) -> Self {
        Self { multiple }
    }

    /// `content` is the effective (rotation-adjusted) content size,
    /// `content_origin` the full-resolution size of the same content (equal
    /// to `content` when no thumbnail is in play), `base_scale` the scale
    /// factor of the base transform.
    pub fn calculate(
        &self,
        container: SizeD,
        content: SizeD,
        content_origin: SizeD,
        base_scale: ScaleFactor,
    ) -> Scales {
        if !container.is_positive() || !content.is_positive() {
            return Scales::default();
        }

        // User scale at which the content covers the container on both axes
        let fill_x = container.width() / (content.width() * base_scale.x);
        let fill_y = container.height() / (content.height() * base_scale.y);
        let fill = fill_x.max(fill_y);

        // User scale at which one original image pixel maps to one container
        // pixel (the 1:1 inspection scale)
        let origin_x = content_origin.width() / (content.width() * base_scale.x);
        let origin_y = content_origin.height() / (content.height() * base_scale.y);
        let origin = origin_x.max(origin_y).max(1.0);

        let min = 1.0;
        let medium = (min * self.multiple).max(fill);
        let max = (medium * self.multiple).max(origin);
        Scales { min, medium, max }
    }
}

/// Automatically fills the container with one axis of a "long" image so
/// reading starts without a manual zoom: a tall comic strip fills the width,
/// a wide panorama fills the height.
#[derive(Debug, Clone, Copy)]
pub struct ReadMode {
    /// Content/container aspect ratio factor from which an image counts as
    /// long
    pub aspect_threshold: f64,
}

impl Default for ReadMode {
    fn default() -> Self {
        Self {
            aspect_threshold: 2.5,
        }
    }
}

impl ReadMode {
    pub fn new(aspect_threshold: f64) -> Self {
        Self { aspect_threshold }
    }

    /// Returns true when the content is so much longer than the container
    /// (in either orientation) that the read-mode placement should replace
    /// the regular content-scale placement.
    pub fn accept(&self, content: SizeD, container: SizeD) -> bool {
        if !content.is_positive() || !container.is_positive() {
            return false;
        }
        let content_aspect = content.height() / content.width();
        let container_aspect = container.height() / container.width();
        content_aspect >= container_aspect * self.aspect_threshold
            || content_aspect <= container_aspect / self.aspect_threshold
    }

    /// The base scale for an accepted long image: fill the short axis of the
    /// content so the long axis can be panned through.
    pub fn scale(&self, content: SizeD, container: SizeD) -> ScaleFactor {
        let content_aspect = content.height() / content.width();
        let container_aspect = container.height() / container.width();
        if content_aspect >= container_aspect {
            // tall image: fill the container width
            ScaleFactor::uniform(container.width() / content.width())
        } else {
            // wide image: fill the container height
            ScaleFactor::uniform(container.height() / content.height())
        }
    }
}
