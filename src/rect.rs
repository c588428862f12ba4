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

use std::fmt::Debug;

/// A rectangle defined by two corner points (x0, y0) and (x1, y1).
/// The rectangle is valid when x0 <= x1 and y0 <= y1.
/// Empty rectangles have x0 >= x1 or y0 >= y1.
///
/// Generic over numeric types T that support basic arithmetic and comparison
/// operations. Content-space, container-space and tile source rectangles all
/// share this one type.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Rect<T> {
    pub x0: T,
    pub y0: T,
    pub x1: T,
    pub y1: T,
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Size<T> {
    width: T,
    height: T,
}

impl<T> Size<T>
where
    T: Copy,
{
    pub fn new(width: T, height: T) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> T {
        self.width
    }

    pub fn height(&self) -> T {
        self.height
    }

    /// Returns the size with width and height exchanged (a 90 or 270 degree
    /// rotation of the area it describes).
    pub fn swapped(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

impl<T> Size<T>
where
    T: Copy + Default + PartialOrd,
{
    /// Returns true if both dimensions are strictly positive.
    pub fn is_positive(&self) -> bool {
        self.width > T::default() && self.height > T::default()
    }
}

impl Size<i32> {
    pub fn to_size_d(self) -> Size<f64> {
        Size::new(self.width as f64, self.height as f64)
    }
}

impl Size<f64> {
    /// Rounds both dimensions to the nearest integers.
    pub fn round(self) -> Size<i32> {
        Size::new(self.width.round() as i32, self.height.round() as i32)
    }
}

/// A point or displacement in one of the coordinate spaces. The same type
/// serves both roles; `Point*` and `Vector*` aliases exist for readability.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct VectorPoint<T> {
    x: T,
    y: T,
}

impl<T> VectorPoint<T>
where
    T: Default
        + Copy
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + std::ops::Div<Output = T>,
{
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> T {
        self.x
    }

    pub fn y(&self) -> T {
        self.y
    }

    /// Returns a new vector translated by the given offset.
    pub fn translate(&self, offset: VectorPoint<T>) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y)
    }

    /// Returns a new vector scaled uniformly.
    pub fn scale(&self, scale: T) -> Self {
        Self::new(self.x * scale, self.y * scale)
    }

    /// Returns a new vector scaled per axis.
    pub fn scale_xy(&self, sx: T, sy: T) -> Self {
        Self::new(self.x * sx, self.y * sy)
    }

    /// Returns a new vector unscaled (divided) uniformly.
    pub fn unscale(&self, scale: T) -> Self {
        Self::new(self.x / scale, self.y / scale)
    }

    /// Returns a new vector unscaled per axis.
    pub fn unscale_xy(&self, sx: T, sy: T) -> Self {
        Self::new(self.x / sx, self.y / sy)
    }

    /// Returns the vector pointing the opposite way.
    pub fn neg(&self) -> Self {
        Self::new(T::default() - self.x, T::default() - self.y)
    }

    /// Rotates the vector around the origin in 90-degree steps. Angles other
    /// than multiples of 90 leave the vector unchanged.
    pub fn rotate(&self, rotation: i32) -> Self {
        match rotation.rem_euclid(360) {
            90 => Self::new(T::default() - self.y, self.x),
            180 => Self::new(T::default() - self.x, T::default() - self.y),
            270 => Self::new(self.y, T::default() - self.x),
            _ => Self::new(self.x, self.y),
        }
    }
}

impl<T> std::ops::Add for VectorPoint<T>
where
    T: Copy + std::ops::Add<Output = T>,
{
    type Output = VectorPoint<T>;

    fn add(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl<T> std::ops::AddAssign for VectorPoint<T>
where
    T: Copy + std::ops::Add<Output = T>,
{
    fn add_assign(&mut self, rhs: Self) {
        self.x = self.x + rhs.x;
        self.y = self.y + rhs.y;
    }
}

impl<T> std::ops::Sub for VectorPoint<T>
where
    T: Copy + std::ops::Sub<Output = T>,
{
    type Output = VectorPoint<T>;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl VectorPoint<f64> {
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn round(self) -> VectorPoint<i32> {
        VectorPoint::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl<T> Rect<T>
where
    T: Copy
        + PartialOrd
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + std::ops::Div<Output = T>
        + Debug
        + Default,
{
    /// Creates a new rectangle with the given coordinates.
    /// No validation is performed - the rectangle may be invalid or empty.
    pub const fn new(x0: T, y0: T, x1: T, y1: T) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// A rectangle spanning the given size with its origin at (0, 0).
    pub fn new_from_size(size: Size<T>) -> Self {
        Self::new(T::default(), T::default(), size.width, size.height)
    }

    /// Returns true if the rectangle is empty (has zero or negative area).
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Returns true if the rectangle is valid (x0 <= x1 and y0 <= y1).
    /// A valid rectangle may still be empty if x0 == x1 or y0 == y1.
    pub fn is_valid(&self) -> bool {
        self.x0 <= self.x1 && self.y0 <= self.y1
    }

    /// Returns true if the point is contained within the rectangle.
    /// Uses half-open intervals: [x0, x1) and [y0, y1).
    pub fn contains(&self, p: VectorPoint<T>) -> bool {
        if self.is_empty() {
            false
        } else {
            p.x >= self.x0 && p.x < self.x1 && p.y >= self.y0 && p.y < self.y1
        }
    }

    /// Returns the width of the rectangle, zero when empty.
    pub fn width(&self) -> T {
        if self.is_empty() {
            T::default()
        } else {
            self.x1 - self.x0
        }
    }

    /// Returns the height of the rectangle, zero when empty.
    pub fn height(&self) -> T {
        if self.is_empty() {
            T::default()
        } else {
            self.y1 - self.y0
        }
    }

    /// Returns the size of the rectangle, zero when empty.
    pub fn size(&self) -> Size<T> {
        if self.is_empty() {
            Size::default()
        } else {
            Size {
                width: self.x1 - self.x0,
                height: self.y1 - self.y0,
            }
        }
    }

    pub fn origin(&self) -> VectorPoint<T> {
        VectorPoint {
            x: self.x0,
            y: self.y0,
        }
    }

    /// Returns the intersection of this rectangle with another rectangle.
    /// Returns an empty rectangle if there is no intersection.
    pub fn intersect(&self, other: &Self) -> Self {
        let x0 = if self.x0 >= other.x0 { self.x0 } else { other.x0 };
        let y0 = if self.y0 >= other.y0 { self.y0 } else { other.y0 };
        let x1 = if self.x1 <= other.x1 { self.x1 } else { other.x1 };
        let y1 = if self.y1 <= other.y1 { self.y1 } else { other.y1 };
        Self::new(x0, y0, x1, y1)
    }

    /// Returns true if this rectangle and the other share any area.
    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Returns the union of this rectangle with another rectangle.
    /// If one rectangle is empty, returns the other rectangle.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() && other.is_empty() {
            Self::default()
        } else if self.is_empty() {
            *other
        } else if other.is_empty() {
            *self
        } else {
            Self::new(
                if self.x0 <= other.x0 { self.x0 } else { other.x0 },
                if self.y0 <= other.y0 { self.y0 } else { other.y0 },
                if self.x1 >= other.x1 { self.x1 } else { other.x1 },
                if self.y1 >= other.y1 { self.y1 } else { other.y1 },
            )
        }
    }

    /// Returns a new rectangle scaled uniformly around the origin.
    pub fn scale(&self, scale: T) -> Self {
        Self::new(
            self.x0 * scale,
            self.y0 * scale,
            self.x1 * scale,
            self.y1 * scale,
        )
    }

    /// Returns a new rectangle scaled per axis around the origin.
    pub fn scale_xy(&self, sx: T, sy: T) -> Self {
        Self::new(self.x0 * sx, self.y0 * sy, self.x1 * sx, self.y1 * sy)
    }

    /// Returns a new rectangle unscaled (divided) per axis.
    pub fn unscale_xy(&self, sx: T, sy: T) -> Self {
        Self::new(self.x0 / sx, self.y0 / sy, self.x1 / sx, self.y1 / sy)
    }

    /// Returns a new rectangle translated by the given offset.
    pub fn translate(&self, offset: VectorPoint<T>) -> Self {
        Self::new(
            self.x0 + offset.x,
            self.y0 + offset.y,
            self.x1 + offset.x,
            self.y1 + offset.y,
        )
    }

    /// Returns a new rectangle grown by `margin` on every side. A negative
    /// margin shrinks the rectangle and may make it empty.
    pub fn expand(&self, margin: T) -> Self {
        Self::new(
            self.x0 - margin,
            self.y0 - margin,
            self.x1 + margin,
            self.y1 + margin,
        )
    }

    /// Rotates the rectangle around the origin in 90-degree steps and
    /// normalizes the corners so the result is valid again.
    pub fn rotate(&self, rotation: i32) -> Self {
        if self.is_valid() {
            let a = VectorPoint::new(self.x0, self.y0).rotate(rotation);
            let b = VectorPoint::new(self.x1, self.y1).rotate(rotation);
            Self::new(
                if a.x < b.x { a.x } else { b.x },
                if a.y < b.y { a.y } else { b.y },
                if a.x > b.x { a.x } else { b.x },
                if a.y > b.y { a.y } else { b.y },
            )
        } else {
            Self::default()
        }
    }
}

// Floating-point specific implementations
impl Rect<f64> {
    /// Rounds outward to the enclosing integer rectangle.
    /// Uses floor for the origin and ceil for the far corner so the result
    /// always covers the input.
    pub fn round_out(&self) -> Rect<i32> {
        Rect::new(
            self.x0.floor() as i32,
            self.y0.floor() as i32,
            self.x1.ceil() as i32,
            self.y1.ceil() as i32,
        )
    }

    /// Rounds every coordinate to the nearest integer.
    pub fn round(&self) -> Rect<i32> {
        Rect::new(
            self.x0.round() as i32,
            self.y0.round() as i32,
            self.x1.round() as i32,
            self.y1.round() as i32,
        )
    }

    pub fn center(&self) -> VectorPoint<f64> {
        VectorPoint::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }
}

// Integer specific implementations
impl Rect<i32> {
    pub fn to_rect_d(self) -> Rect<f64> {
        Rect::new(
            self.x0 as f64,
            self.y0 as f64,
            self.x1 as f64,
            self.y1 as f64,
        )
    }
}

// Type aliases for convenience
pub type RectI = Rect<i32>;
pub type RectD = Rect<f64>;
pub type SizeI = Size<i32>;
pub type SizeD = Size<f64>;
pub type PointI = VectorPoint<i32>;
pub type PointD = VectorPoint<f64>;
pub type VectorI = VectorPoint<i32>;
pub type VectorD = VectorPoint<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i32_rect() {
        let rect = RectI::new(0, 0, 10, 20);

        assert!(!rect.is_empty());
        assert!(rect.is_valid());
        assert!(rect.contains(PointI::new(5, 5)));
        assert!(!rect.contains(PointI::new(10, 5))); // Exclusive upper bound
        assert_eq!(rect.width(), 10);
        assert_eq!(rect.height(), 20);
        assert_eq!(rect.size(), SizeI::new(10, 20));

        let translated = rect.translate(VectorI::new(5, 5));
        assert_eq!(translated, RectI::new(5, 5, 15, 25));
    }

    #[test]
    fn test_empty_rect_conventions() {
        let empty = RectI::new(5, 5, 5, 5);
        assert!(empty.is_empty());
        assert!(empty.is_valid());
        assert_eq!(empty.width(), 0);
        assert!(!empty.contains(PointI::new(5, 5)));

        let inverted = RectI::new(10, 10, 0, 0);
        assert!(inverted.is_empty());
        assert!(!inverted.is_valid());
    }

    #[test]
    fn test_intersect_and_union() {
        let a = RectI::new(0, 0, 10, 10);
        let b = RectI::new(5, 5, 15, 15);
        assert_eq!(a.intersect(&b), RectI::new(5, 5, 10, 10));
        assert!(a.intersects(&b));
        assert_eq!(a.union(&b), RectI::new(0, 0, 15, 15));

        let c = RectI::new(20, 20, 30, 30);
        assert!(a.intersect(&c).is_empty());
        assert!(!a.intersects(&c));

        let empty = RectI::default();
        assert_eq!(a.union(&empty), a);
    }

    #[test]
    fn test_expand() {
        let rect = RectD::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(rect.expand(5.0), RectD::new(5.0, 5.0, 25.0, 25.0));
        assert!(rect.expand(-6.0).is_empty());
    }

    #[test]
    fn test_vector_rotate() {
        let v = VectorI::new(10, 0);
        assert_eq!(v.rotate(90), VectorI::new(0, 10));
        assert_eq!(v.rotate(180), VectorI::new(-10, 0));
        assert_eq!(v.rotate(270), VectorI::new(0, -10));
        assert_eq!(v.rotate(-90), VectorI::new(0, -10));
        assert_eq!(v.rotate(360), v);
        assert_eq!(v.rotate(45), v); // not a 90-degree step
    }

    #[test]
    fn test_rect_rotate_normalizes() {
        let rect = RectD::new(0.0, 0.0, 100.0, 50.0);
        let rotated = rect.rotate(90);
        assert!(rotated.is_valid());
        assert_eq!(rotated, RectD::new(-50.0, 0.0, 0.0, 100.0));
        assert_eq!(rotated.size(), SizeD::new(50.0, 100.0));

        // Four quarter turns come back to the original
        let back = rotated.rotate(90).rotate(90).rotate(90);
        assert_eq!(back, rect);
    }

    #[test]
    fn test_round_out_covers_input() {
        let rect = RectD::new(1.2, 2.7, 5.1, 6.9);
        let out = rect.round_out();
        assert_eq!(out, RectI::new(1, 2, 6, 7));
        assert!(out.to_rect_d().x0 <= rect.x0);
        assert!(out.to_rect_d().y1 >= rect.y1);

        assert_eq!(rect.round(), RectI::new(1, 3, 5, 7));
    }

    #[test]
    fn test_scale_per_axis() {
        let rect = RectD::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(rect.scale_xy(2.0, 10.0), RectD::new(2.0, 20.0, 6.0, 40.0));
        assert_eq!(
            rect.scale_xy(2.0, 10.0).unscale_xy(2.0, 10.0),
            RectD::new(1.0, 2.0, 3.0, 4.0)
        );
    }

    #[test]
    fn test_size_helpers() {
        assert!(SizeI::new(10, 20).is_positive());
        assert!(!SizeI::new(0, 20).is_positive());
        assert!(!SizeD::new(10.0, -1.0).is_positive());
        assert_eq!(SizeI::new(10, 20).swapped(), SizeI::new(20, 10));
        assert_eq!(SizeD::new(10.4, 20.6).round(), SizeI::new(10, 21));
    }

    #[test]
    fn test_vector_length_and_ops() {
        let v = VectorD::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        assert_eq!(v + VectorD::new(1.0, 1.0), VectorD::new(4.0, 5.0));
        assert_eq!(v - VectorD::new(1.0, 1.0), VectorD::new(2.0, 3.0));
        assert_eq!(v.neg(), VectorD::new(-3.0, -4.0));
        assert_eq!(v.scale_xy(2.0, 3.0), VectorD::new(6.0, 12.0));
        assert_eq!(v.unscale_xy(3.0, 4.0), VectorD::new(1.0, 1.0));
    }

    #[test]
    fn test_center() {
        let rect = RectD::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(rect.center(), PointD::new(50.0, 25.0));
    }
}
