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

mod animation;
pub mod scales;
pub mod scaling;
pub mod transform;

use std::time::Duration;

use log::trace;

use crate::{
    config::Settings,
    rect::{PointD, RectD, RectI, SizeD, VectorD},
    zoom::{
        animation::{Animation, Fling, SpringBack, ZoomAnimation},
        scales::{ReadMode, Scales, ScalesCalculator},
        transform::{ScaleFactor, Transform},
    },
};

pub use scaling::{Alignment, ContentScale};

/// Floating point comparison epsilon for scale stepping
const STEP_EPSILON: f64 = 1.0e-4;
/// Tolerance for "offset is outside its bounds" decisions
const BOUNDS_EPSILON: f64 = 0.5;

/// The transform state machine.
///
/// Owns a *base transform* derived purely from the container size, content
/// size, content-scale mode, alignment, rotation and read mode, and a *user
/// transform* (a uniform scale plus an offset) driven by gestures, animation
/// and programmatic calls. The composed transform maps content coordinates
/// to container coordinates.
///
/// All methods are called from one owning thread; animation progress is
/// driven explicitly through [`ZoomEngine::advance_animation`].
#[derive(Debug)]
pub struct ZoomEngine {
    settings: Settings,
    container_size: SizeD,
    content_size: SizeD,
    content_origin_size: SizeD,
    content_scale: ContentScale,
    alignment: Alignment,
    rotation: i32,
    read_mode: Option<ReadMode>,
    read_mode_active: bool,
    base_transform: Transform,
    /// Content rect mapped by the base transform (user transform identity)
    base_display_rect: RectD,
    user_scale: f64,
    user_offset: VectorD,
    scales: Scales,
    /// Legal range for `user_offset` at the current user scale;
    /// degenerates to a point on an axis where the content fits
    offset_bounds: RectD,
    animation: Option<Animation>,
    dragging: bool,
}

impl ZoomEngine {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            container_size: SizeD::default(),
            content_size: SizeD::default(),
            content_origin_size: SizeD::default(),
            content_scale: ContentScale::default(),
            alignment: Alignment::default(),
            rotation: 0,
            read_mode: None,
            read_mode_active: false,
            base_transform: Transform::identity(),
            base_display_rect: RectD::default(),
            user_scale: 1.0,
            user_offset: VectorD::default(),
            scales: Scales::default(),
            offset_bounds: RectD::default(),
            animation: None,
            dragging: false,
        }
    }

    /// True once both container and content have positive dimensions.
    /// Until then the base transform is the identity and every gesture
    /// operation is a no-op.
    pub fn ready(&self) -> bool {
        self.container_size.is_positive() && self.content_size.is_positive()
    }

    // State setters. Each recomputes the base transform and the offset
    // bounds; a user offset that no longer fits is clamped to the nearest
    // legal point, never reset.

    pub fn set_container_size(&mut self, size: SizeD) {
        self.container_size = size;
        self.rebuild();
    }

    /// Sets the logical content size (the resident bitmap) and the size of
    /// the full-resolution original it stands in for. Pass `None` when the
    /// content is the original.
    pub fn set_content_size(&mut self, content: SizeD, origin: Option<SizeD>) {
        self.content_size = content;
        self.content_origin_size = origin.unwrap_or(content);
        self.rebuild();
    }

    pub fn set_content_scale(&mut self, content_scale: ContentScale) {
        self.content_scale = content_scale;
        self.rebuild();
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
        self.rebuild();
    }

    /// Sets the rotation angle, constraining it to 90-degree increments.
    pub fn set_rotation(&mut self, rotation: i32) {
        self.rotation = Self::normalize_rotation(rotation);
        self.rebuild();
    }

    pub fn set_read_mode(&mut self, read_mode: Option<ReadMode>) {
        self.read_mode = read_mode;
        self.rebuild();
    }

    fn normalize_rotation(rotation: i32) -> i32 {
        let rounded = ((rotation as f64 / 90.0).round() as i32) * 90;
        rounded.rem_euclid(360)
    }

    /// Recomputes the base transform, the scale steps and the offset bounds
    /// from the current inputs. Deterministic and idempotent: calling it
    /// twice in a row changes nothing.
    fn rebuild(&mut self) {
        if !self.ready() {
            self.base_transform = Transform::identity();
            self.base_display_rect = RectD::default();
            self.scales = Scales::default();
            self.offset_bounds = RectD::default();
            self.read_mode_active = false;
            return;
        }

        let rotated = RectD::new_from_size(self.content_size).rotate(self.rotation);
        let effective = rotated.size();

        self.read_mode_active = self
            .read_mode
            .map(|rm| rm.accept(effective, self.container_size))
            .unwrap_or(false);

        let scale = if self.read_mode_active {
            // read mode overrides the content-scale placement
            self.read_mode
                .map(|rm| rm.scale(effective, self.container_size))
                .unwrap_or_else(|| self.content_scale.compute(effective, self.container_size))
        } else {
            self.content_scale.compute(effective, self.container_size)
        };

        let scaled = rotated.scale_xy(scale.x, scale.y);
        let align_offset = if self.read_mode_active {
            VectorD::default() // start reading at the top-left
        } else {
            self.alignment.offset(scaled.size(), self.container_size)
        };
        // The rotated rect may have a negative origin; the offset absorbs it
        let offset = align_offset - scaled.origin();
        self.base_transform = Transform::new(scale, offset, self.rotation);
        self.base_display_rect = self
            .base_transform
            .map_rect(&RectD::new_from_size(self.content_size));

        let effective_origin = match self.rotation {
            90 | 270 => self.content_origin_size.swapped(),
            _ => self.content_origin_size,
        };
        self.scales = ScalesCalculator::new(self.settings.scale_step_multiple).calculate(
            self.container_size,
            effective,
            effective_origin,
            scale,
        );

        self.user_scale = self.user_scale.clamp(self.scales.min, self.scales.max);
        self.offset_bounds = self.compute_offset_bounds(self.user_scale);
        self.user_offset = self.clamp_offset(self.user_offset);
        trace!(
            "rebuild: base={:?} scales={:?} bounds={:?}",
            self.base_transform,
            self.scales,
            self.offset_bounds
        );
    }

    /// Legal range of the user offset at the given user scale. On an axis
    /// where the scaled content covers the container the content edges may
    /// not come inside the container; on an axis where it fits, the offset
    /// is pinned to the aligned position.
    fn compute_offset_bounds(&self, user_scale: f64) -> RectD {
        let d = &self.base_display_rect;
        let cw = self.container_size.width();
        let ch = self.container_size.height();

        let w = d.width() * user_scale;
        let (min_x, max_x) = if w >= cw - BOUNDS_EPSILON {
            (cw - d.x1 * user_scale, -d.x0 * user_scale)
        } else {
            let target = if self.read_mode_active {
                0.0
            } else {
                self.alignment.position_x(w, cw)
            };
            let pinned = target - d.x0 * user_scale;
            (pinned, pinned)
        };

        let h = d.height() * user_scale;
        let (min_y, max_y) = if h >= ch - BOUNDS_EPSILON {
            (ch - d.y1 * user_scale, -d.y0 * user_scale)
        } else {
            let target = if self.read_mode_active {
                0.0
            } else {
                self.alignment.position_y(h, ch)
            };
            let pinned = target - d.y0 * user_scale;
            (pinned, pinned)
        };

        RectD::new(min_x, min_y, max_x, max_y)
    }

    fn clamp_offset(&self, offset: VectorD) -> VectorD {
        let b = &self.offset_bounds;
        VectorD::new(offset.x().clamp(b.x0, b.x1), offset.y().clamp(b.y0, b.y1))
    }

    fn offset_outside_bounds(&self) -> bool {
        (self.user_offset - self.clamp_offset(self.user_offset)).length() > BOUNDS_EPSILON
    }

    // Accessors

    /// The transform derived from content scale, alignment, rotation and
    /// read mode; independent of any gesture.
    pub fn base_transform(&self) -> Transform {
        self.base_transform
    }

    fn user_transform(&self) -> Transform {
        Transform::new(
            ScaleFactor::uniform(self.user_scale),
            self.user_offset,
            0,
        )
    }

    /// The composed transform mapping content coordinates to container
    /// coordinates: base first, user on top.
    pub fn transform(&self) -> Transform {
        self.base_transform.compose(&self.user_transform())
    }

    pub fn container_size(&self) -> SizeD {
        self.container_size
    }

    pub fn content_size(&self) -> SizeD {
        self.content_size
    }

    pub fn user_scale(&self) -> f64 {
        self.user_scale
    }

    pub fn user_offset(&self) -> VectorD {
        self.user_offset
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn min_scale(&self) -> f64 {
        self.scales.min
    }

    pub fn medium_scale(&self) -> f64 {
        self.scales.medium
    }

    pub fn max_scale(&self) -> f64 {
        self.scales.max
    }

    /// True while an animation, fling or active drag is in progress. The
    /// tile manager uses this to pause tile regeneration during fast
    /// gestures.
    pub fn is_transforming(&self) -> bool {
        self.animation.is_some() || self.dragging
    }

    /// The scale from original-image pixels to container pixels. Drives the
    /// tile sample-size selection.
    pub fn scale_to_original(&self) -> f64 {
        if !self.ready() || !self.content_origin_size.is_positive() {
            return 1.0;
        }
        self.transform().scale.x * self.content_size.width() / self.content_origin_size.width()
    }

    /// Where the scaled content lies in container coordinates.
    pub fn content_display_rect(&self) -> RectD {
        if !self.ready() {
            return RectD::default();
        }
        self.transform()
            .map_rect(&RectD::new_from_size(self.content_size))
    }

    /// Integer projection of [`ZoomEngine::content_display_rect`]: position
    /// and size are rounded to whole pixels independently.
    pub fn content_display_rect_rounded(&self) -> RectI {
        Self::round_position_and_size(self.content_display_rect())
    }

    /// The visible part of the content in the coordinates of the content as
    /// laid out by the base transform (origin at the displayed content's
    /// top-left corner). Empty when the content is entirely off screen.
    pub fn content_visible_rect(&self) -> RectD {
        if !self.ready() {
            return RectD::default();
        }
        let display = self.content_display_rect();
        let visible = display.intersect(&RectD::new_from_size(self.container_size));
        if visible.is_empty() {
            return RectD::default();
        }
        visible
            .translate(display.origin().neg())
            .scale(1.0 / self.user_scale)
    }

    /// Integer projection of [`ZoomEngine::content_visible_rect`].
    pub fn content_visible_rect_rounded(&self) -> RectI {
        Self::round_position_and_size(self.content_visible_rect())
    }

    fn round_position_and_size(rect: RectD) -> RectI {
        if rect.is_empty() {
            return RectI::default();
        }
        let origin = rect.origin().round();
        let size = rect.size().round();
        RectI::new(
            origin.x(),
            origin.y(),
            origin.x() + size.width(),
            origin.y() + size.height(),
        )
    }

    /// The visible part of the content in content pixels (pre-rotation).
    /// Used to derive the tile load rect.
    pub fn content_visible_px(&self) -> RectD {
        if !self.ready() {
            return RectD::default();
        }
        let viewport = RectD::new_from_size(self.container_size);
        self.transform()
            .unmap_rect(&viewport)
            .intersect(&RectD::new_from_size(self.content_size))
    }

    /// The visible rect in original-image pixels, rounded outward.
    pub fn image_load_rect(&self) -> RectI {
        if !self.ready() || !self.content_origin_size.is_positive() {
            return RectI::default();
        }
        let visible = self.content_visible_px();
        if visible.is_empty() {
            return RectI::default();
        }
        let fx = self.content_origin_size.width() / self.content_size.width();
        let fy = self.content_origin_size.height() / self.content_size.height();
        visible
            .scale_xy(fx, fy)
            .intersect(&RectD::new_from_size(self.content_origin_size))
            .round_out()
    }

    /// Converts a container (touch) point to a content point.
    pub fn touch_point_to_content_point(&self, point: PointD) -> PointD {
        self.transform().unmap_point(point)
    }

    /// Converts a content point to a container point.
    pub fn content_point_to_touch_point(&self, point: PointD) -> PointD {
        self.transform().map_point(point)
    }

    // Operations

    /// Zooms to `target_scale` (clamped into `[min_scale, max_scale]`) while
    /// keeping the content under `centroid` (container coordinates) visually
    /// fixed. When `animated`, interpolates over the configured duration;
    /// any later gesture input cancels the animation.
    pub fn scale_to(&mut self, target_scale: f64, centroid: PointD, animated: bool) {
        if !self.ready() {
            return;
        }
        let target = target_scale.clamp(self.scales.min, self.scales.max);

        // Keep the content point under the centroid stationary:
        // composed offset A = base.offset * u + user_offset
        let u = self.user_scale;
        let a = self.user_offset + self.base_transform.offset.scale(u);
        let anchor = (centroid - a).unscale(u);
        let a_new = centroid - anchor.scale(target);
        let offset_new = a_new - self.base_transform.offset.scale(target);

        let bounds = self.compute_offset_bounds(target);
        let clamped = VectorD::new(
            offset_new.x().clamp(bounds.x0, bounds.x1),
            offset_new.y().clamp(bounds.y0, bounds.y1),
        );

        if animated {
            self.animation = Some(Animation::Zoom(ZoomAnimation::new(
                u,
                target,
                self.user_offset,
                clamped,
                Duration::from_millis(self.settings.zoom_animation_ms),
            )));
        } else {
            self.user_scale = target;
            self.offset_bounds = bounds;
            self.user_offset = clamped;
            self.animation = None;
        }
    }

    /// One multiplicative zoom step in, anchored at `centroid` (scroll-wheel
    /// zoom).
    pub fn zoom_in(&mut self, centroid: PointD) {
        self.scale_to(self.user_scale * self.settings.zoom_multiplier, centroid, false);
    }

    /// One multiplicative zoom step out, anchored at `centroid`.
    pub fn zoom_out(&mut self, centroid: PointD) {
        self.scale_to(self.user_scale / self.settings.zoom_multiplier, centroid, false);
    }

    /// The next scale in the min/medium/max double-tap cycle, skipping the
    /// current value within an epsilon tolerance.
    pub fn next_step_scale(&self) -> f64 {
        for step in [self.scales.min, self.scales.medium, self.scales.max] {
            if step > self.user_scale + STEP_EPSILON {
                return step;
            }
        }
        self.scales.min
    }

    /// Steps to the next scale in the cycle, anchored at `centroid` or the
    /// container centre.
    pub fn switch_scale(&mut self, centroid: Option<PointD>, animated: bool) {
        if !self.ready() {
            return;
        }
        let centroid =
            centroid.unwrap_or_else(|| RectD::new_from_size(self.container_size).center());
        self.scale_to(self.next_step_scale(), centroid, animated);
    }

    /// Applies a drag displacement. Inside the bounds the offset follows the
    /// finger; outside, the excess is fed through a bounded resistance curve
    /// so the content never travels further than the rubber-band limit past
    /// its bound.
    pub fn drag(&mut self, delta: VectorD) {
        if !self.ready() {
            return;
        }
        if self.animation.take().is_some() {
            // A cancelled zoom animation may have left the bounds behind
            // the interpolated scale
            self.offset_bounds = self.compute_offset_bounds(self.user_scale);
        }
        self.dragging = true;
        let b = self.offset_bounds;
        let limit = self.settings.rubber_band_limit;
        self.user_offset = VectorD::new(
            Self::drag_axis(self.user_offset.x(), delta.x(), b.x0, b.x1, limit),
            Self::drag_axis(self.user_offset.y(), delta.y(), b.y0, b.y1, limit),
        );
    }

    /// Ends the drag. Outside the bounds the offset springs back to the
    /// nearest legal point; otherwise the velocity (container px/s) starts
    /// an exponential-decay fling clamped to the bounds.
    pub fn drag_end(&mut self, velocity: VectorD) {
        if !self.ready() {
            self.dragging = false;
            return;
        }
        self.dragging = false;
        if self.offset_outside_bounds() {
            self.animation = Some(Animation::SpringBack(SpringBack::new(
                self.user_offset,
                self.clamp_offset(self.user_offset),
                Duration::from_millis(self.settings.spring_back_ms),
            )));
        } else if velocity.length() >= self.settings.fling_stop_speed {
            self.animation = Some(Animation::Fling(Fling::new(
                velocity,
                self.settings.fling_decay,
                self.settings.fling_stop_speed,
            )));
        } else {
            self.animation = None;
        }
    }

    /// Maps one drag axis through the rubber band. The applied excess is
    /// `limit * tanh(raw / limit)`: the raw (finger) excess is reconstructed
    /// from the applied one, advanced by the delta, and mapped back, so the
    /// resistance grows continuously with the distance past the bound.
    fn drag_axis(value: f64, delta: f64, min: f64, max: f64, limit: f64) -> f64 {
        let raw = if value > max {
            max + Self::inverse_rubber(value - max, limit)
        } else if value < min {
            min - Self::inverse_rubber(min - value, limit)
        } else {
            value
        } + delta;

        if raw > max {
            max + Self::rubber(raw - max, limit)
        } else if raw < min {
            min - Self::rubber(min - raw, limit)
        } else {
            raw
        }
    }

    fn rubber(excess: f64, limit: f64) -> f64 {
        limit * (excess / limit).tanh()
    }

    fn inverse_rubber(applied: f64, limit: f64) -> f64 {
        limit * (applied / limit).min(0.999_999).atanh()
    }

    /// Rotates by a multiple of 90 degrees (other angles are rounded to the
    /// nearest step), keeping the content point at the container centre in
    /// place where the bounds allow.
    pub fn rotate_by(&mut self, degrees: i32) {
        let delta = Self::normalize_rotation(degrees);
        if delta == 0 {
            return;
        }
        if !self.ready() {
            self.rotation = (self.rotation + delta).rem_euclid(360);
            self.rebuild();
            return;
        }
        let center = RectD::new_from_size(self.container_size).center();
        let content_point = self.transform().unmap_point(center);

        self.animation = None;
        self.rotation = (self.rotation + delta).rem_euclid(360);
        self.rebuild();

        // Restore the remembered content point to the container centre
        let placed = self.base_transform.map_point(content_point);
        self.user_offset = self.clamp_offset(center - placed.scale(self.user_scale));
    }

    /// Drops the user transform back to the base placement and cancels any
    /// running animation.
    pub fn reset(&mut self) {
        self.animation = None;
        self.dragging = false;
        self.user_scale = 1.0;
        self.user_offset = VectorD::default();
        self.rebuild();
    }

    /// Advances the running animation by `dt`, mutating the user transform.
    /// Returns true while an animation is still in progress. The host calls
    /// this from its frame clock and redraws after every tick.
    pub fn advance_animation(&mut self, dt: Duration) -> bool {
        if !self.ready() {
            self.animation = None;
            return false;
        }
        let Some(animation) = self.animation.take() else {
            return false;
        };
        match animation {
            Animation::Zoom(mut animation) => {
                let (scale, offset, done) = animation.advance(dt);
                self.user_scale = scale;
                self.user_offset = offset;
                if done {
                    self.offset_bounds = self.compute_offset_bounds(self.user_scale);
                    self.user_offset = self.clamp_offset(self.user_offset);
                } else {
                    self.animation = Some(Animation::Zoom(animation));
                }
                !done
            }
            Animation::SpringBack(mut spring) => {
                let (offset, done) = spring.advance(dt);
                self.user_offset = offset;
                if !done {
                    self.animation = Some(Animation::SpringBack(spring));
                }
                !done
            }
            Animation::Fling(mut fling) => {
                let (displacement, decayed) = fling.advance(dt);
                let target = self.user_offset + displacement;
                let clamped = self.clamp_offset(target);
                if (clamped.x() - target.x()).abs() > f64::EPSILON {
                    fling.stop_axis_x();
                }
                if (clamped.y() - target.y()).abs() > f64::EPSILON {
                    fling.stop_axis_y();
                }
                self.user_offset = clamped;
                let done = decayed || fling.is_stopped();
                if !done {
                    self.animation = Some(Animation::Fling(fling));
                }
                !done
            }
        }
    }
}
