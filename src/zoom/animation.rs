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

//! Tick-driven animation state for the zoom engine.
//!
//! The engine owns at most one animation at a time; starting a new one (or
//! any gesture input) replaces the old, which is how cancellation works.
//! The host drives progress by calling `ZoomEngine::advance_animation` from
//! its frame clock; nothing here keeps time on its own.

use std::time::Duration;

use crate::rect::VectorD;

/// Cubic ease-out: fast start, smooth landing.
pub(crate) fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Interpolates the user scale and offset towards a precomputed target.
/// Used for animated zoom steps and double-tap scale switching.
#[derive(Debug, Clone)]
pub(crate) struct ZoomAnimation {
    pub start_scale: f64,
    pub end_scale: f64,
    pub start_offset: VectorD,
    pub end_offset: VectorD,
    elapsed: Duration,
    duration: Duration,
}

impl ZoomAnimation {
    pub fn new(
        start_scale: f64,
        end_scale: f64,
        start_offset: VectorD,
        end_offset: VectorD,
        duration: Duration,
    ) -> Self {
        Self {
            start_scale,
            end_scale,
            start_offset,
            end_offset,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    /// Advances by `dt` and returns the interpolated (scale, offset, done).
    pub fn advance(&mut self, dt: Duration) -> (f64, VectorD, bool) {
        self.elapsed += dt;
        if self.duration.is_zero() || self.elapsed >= self.duration {
            return (self.end_scale, self.end_offset, true);
        }
        let t = ease_out_cubic(self.elapsed.as_secs_f64() / self.duration.as_secs_f64());
        let scale = self.start_scale + (self.end_scale - self.start_scale) * t;
        let offset = self.start_offset + (self.end_offset - self.start_offset).scale(t);
        (scale, offset, false)
    }
}

/// Eases the user offset back to the nearest legal point after a
/// rubber-banded drag is released.
#[derive(Debug, Clone)]
pub(crate) struct SpringBack {
    pub start_offset: VectorD,
    pub end_offset: VectorD,
    elapsed: Duration,
    duration: Duration,
}

impl SpringBack {
    pub fn new(start_offset: VectorD, end_offset: VectorD, duration: Duration) -> Self {
        Self {
            start_offset,
            end_offset,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    /// Advances by `dt` and returns the interpolated (offset, done).
    pub fn advance(&mut self, dt: Duration) -> (VectorD, bool) {
        self.elapsed += dt;
        if self.duration.is_zero() || self.elapsed >= self.duration {
            return (self.end_offset, true);
        }
        let t = ease_out_cubic(self.elapsed.as_secs_f64() / self.duration.as_secs_f64());
        let offset = self.start_offset + (self.end_offset - self.start_offset).scale(t);
        (offset, false)
    }
}

/// Exponential-decay fling integrator. The engine clamps the resulting
/// offset to its bounds each step and zeroes the velocity on a pinned axis,
/// which ends the fling early at an edge.
#[derive(Debug, Clone)]
pub(crate) struct Fling {
    pub velocity: VectorD,
    decay: f64,
    stop_speed: f64,
}

impl Fling {
    pub fn new(velocity: VectorD, decay: f64, stop_speed: f64) -> Self {
        Self {
            velocity,
            decay,
            stop_speed,
        }
    }

    /// Advances by `dt` and returns the displacement to apply. Done once the
    /// decayed speed drops under the stop threshold.
    pub fn advance(&mut self, dt: Duration) -> (VectorD, bool) {
        let dt_s = dt.as_secs_f64();
        let displacement = self.velocity.scale(dt_s);
        self.velocity = self.velocity.scale((-self.decay * dt_s).exp());
        (displacement, self.velocity.length() < self.stop_speed)
    }

    pub fn stop_axis_x(&mut self) {
        self.velocity = VectorD::new(0.0, self.velocity.y());
    }

    pub fn stop_axis_y(&mut self) {
        self.velocity = VectorD::new(self.velocity.x(), 0.0);
    }

    pub fn is_stopped(&self) -> bool {
        self.velocity.length() < self.stop_speed
    }
}

/// The single animation slot of the engine.
#[derive(Debug, Clone)]
pub(crate) enum Animation {
    Zoom(ZoomAnimation),
    SpringBack(SpringBack),
    Fling(Fling),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_out_cubic_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(2.0), 1.0); // clamped
        assert_eq!(ease_out_cubic(-1.0), 0.0); // clamped
        // Monotonic, decelerating
        assert!(ease_out_cubic(0.25) > 0.25);
        assert!(ease_out_cubic(0.5) < ease_out_cubic(0.75));
    }

    #[test]
    fn test_zoom_animation_reaches_target() {
        let mut animation = ZoomAnimation::new(
            1.0,
            3.0,
            VectorD::new(0.0, 0.0),
            VectorD::new(-100.0, -50.0),
            Duration::from_millis(300),
        );

        let mut steps = 0;
        loop {
            let (scale, offset, done) = animation.advance(Duration::from_millis(16));
            steps += 1;
            assert!((1.0..=3.0).contains(&scale));
            if done {
                assert_eq!(scale, 3.0);
                assert_eq!(offset, VectorD::new(-100.0, -50.0));
                break;
            }
            assert!(steps < 100, "animation failed to terminate");
        }
    }

    #[test]
    fn test_zoom_animation_zero_duration_is_immediate() {
        let mut animation = ZoomAnimation::new(
            1.0,
            2.0,
            VectorD::default(),
            VectorD::new(10.0, 10.0),
            Duration::ZERO,
        );
        let (scale, offset, done) = animation.advance(Duration::from_millis(1));
        assert!(done);
        assert_eq!(scale, 2.0);
        assert_eq!(offset, VectorD::new(10.0, 10.0));
    }

    #[test]
    fn test_spring_back_converges() {
        let mut spring = SpringBack::new(
            VectorD::new(120.0, 0.0),
            VectorD::new(0.0, 0.0),
            Duration::from_millis(250),
        );
        let mut last_distance = f64::MAX;
        let mut steps = 0;
        loop {
            let (offset, done) = spring.advance(Duration::from_millis(16));
            let distance = offset.length();
            assert!(distance <= last_distance + 1e-9);
            last_distance = distance;
            steps += 1;
            if done {
                assert_eq!(offset, VectorD::new(0.0, 0.0));
                break;
            }
            assert!(steps < 100, "spring-back failed to terminate");
        }
    }

    #[test]
    fn test_fling_decays_to_stop() {
        let mut fling = Fling::new(VectorD::new(1200.0, -300.0), 4.2, 40.0);
        let mut steps = 0;
        loop {
            let (displacement, done) = fling.advance(Duration::from_millis(16));
            assert!(displacement.length().is_finite());
            steps += 1;
            if done {
                break;
            }
            assert!(steps < 200, "fling failed to terminate");
        }
        // 4.2/s decay kills 1200 px/s within roughly a second of ticks
        assert!(steps < 80);
    }

    #[test]
    fn test_fling_axis_pinning() {
        let mut fling = Fling::new(VectorD::new(500.0, 500.0), 4.2, 40.0);
        fling.stop_axis_x();
        let (displacement, _) = fling.advance(Duration::from_millis(16));
        assert_eq!(displacement.x(), 0.0);
        assert!(displacement.y() > 0.0);
        fling.stop_axis_y();
        assert!(fling.is_stopped());
    }
}
