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

use crate::rect::{SizeD, VectorD};
use crate::zoom::transform::ScaleFactor;

/// Defines how content should be (initially) scaled within the container.
///
/// This enum represents the host's intent for how the content should be
/// displayed, which is then translated into a concrete scale factor by
/// [`ContentScale::compute`].
#[derive(Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Copy)]
pub enum ContentScale {
    /// Scale uniformly so the content fits entirely within the container
    /// (may leave bars on one axis)
    #[default]
    Fit,
    /// Scale uniformly so the content covers the container completely
    /// (may crop the other axis)
    Crop,
    /// Scale uniformly so the content width matches the container width
    FillWidth,
    /// Scale uniformly so the content height matches the container height
    FillHeight,
    /// Scale each axis independently so the content exactly covers the
    /// container (may distort)
    FillBounds,
    /// Like Fit, but never scales up content smaller than the container
    Inside,
    /// Display content at its original size (1:1)
    None,
}

impl ContentScale {
    /// Computes the scale factor that realizes this mode for the given
    /// content and container sizes. Both sizes must be positive; callers
    /// guard this.
    pub fn compute(&self, content: SizeD, container: SizeD) -> ScaleFactor {
        let sx = container.width() / content.width();
        let sy = container.height() / content.height();
        match self {
            ContentScale::Fit => ScaleFactor::uniform(sx.min(sy)),
            ContentScale::Crop => ScaleFactor::uniform(sx.max(sy)),
            ContentScale::FillWidth => ScaleFactor::uniform(sx),
            ContentScale::FillHeight => ScaleFactor::uniform(sy),
            ContentScale::FillBounds => ScaleFactor::new(sx, sy),
            ContentScale::Inside => ScaleFactor::uniform(sx.min(sy).min(1.0)),
            ContentScale::None => ScaleFactor::uniform(1.0),
        }
    }
}

impl From<&str> for ContentScale {
    fn from(value: &str) -> Self {
        match value {
            "crop" => ContentScale::Crop,
            "fill-width" => ContentScale::FillWidth,
            "fill-height" => ContentScale::FillHeight,
            "fill-bounds" => ContentScale::FillBounds,
            "inside" => ContentScale::Inside,
            "none" => ContentScale::None,
            _ => ContentScale::Fit,
        }
    }
}

impl From<ContentScale> for &str {
    fn from(value: ContentScale) -> Self {
        match value {
            ContentScale::Fit => "fit",
            ContentScale::Crop => "crop",
            ContentScale::FillWidth => "fill-width",
            ContentScale::FillHeight => "fill-height",
            ContentScale::FillBounds => "fill-bounds",
            ContentScale::Inside => "inside",
            ContentScale::None => "none",
        }
    }
}

/// Where scaled content is positioned inside the container when it does not
/// cover it: one of the nine anchor points of a 3x3 grid.
#[derive(Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Copy)]
pub enum Alignment {
    TopStart,
    TopCenter,
    TopEnd,
    CenterStart,
    #[default]
    Center,
    CenterEnd,
    BottomStart,
    BottomCenter,
    BottomEnd,
}

impl Alignment {
    /// Fraction of the leftover horizontal space placed before the content.
    fn fraction_x(&self) -> f64 {
        match self {
            Alignment::TopStart | Alignment::CenterStart | Alignment::BottomStart => 0.0,
            Alignment::TopCenter | Alignment::Center | Alignment::BottomCenter => 0.5,
            Alignment::TopEnd | Alignment::CenterEnd | Alignment::BottomEnd => 1.0,
        }
    }

    /// Fraction of the leftover vertical space placed above the content.
    fn fraction_y(&self) -> f64 {
        match self {
            Alignment::TopStart | Alignment::TopCenter | Alignment::TopEnd => 0.0,
            Alignment::CenterStart | Alignment::Center | Alignment::CenterEnd => 0.5,
            Alignment::BottomStart | Alignment::BottomCenter | Alignment::BottomEnd => 1.0,
        }
    }

    /// Computes the top-left position of scaled content of size `scaled`
    /// inside the container. When the content is larger than the container
    /// the offset goes negative, keeping the anchored edge visible.
    pub fn offset(&self, scaled: SizeD, container: SizeD) -> VectorD {
        VectorD::new(
            (container.width() - scaled.width()) * self.fraction_x(),
            (container.height() - scaled.height()) * self.fraction_y(),
        )
    }

    /// The horizontal component of [`Alignment::offset`].
    pub fn position_x(&self, scaled_width: f64, container_width: f64) -> f64 {
        (container_width - scaled_width) * self.fraction_x()
    }

    /// The vertical component of [`Alignment::offset`].
    pub fn position_y(&self, scaled_height: f64, container_height: f64) -> f64 {
        (container_height - scaled_height) * self.fraction_y()
    }
}

impl From<&str> for Alignment {
    fn from(value: &str) -> Self {
        match value {
            "top-start" => Alignment::TopStart,
            "top-center" => Alignment::TopCenter,
            "top-end" => Alignment::TopEnd,
            "center-start" => Alignment::CenterStart,
            "center-end" => Alignment::CenterEnd,
            "bottom-start" => Alignment::BottomStart,
            "bottom-center" => Alignment::BottomCenter,
            "bottom-end" => Alignment::BottomEnd,
            _ => Alignment::Center,
        }
    }
}

impl From<Alignment> for &str {
    fn from(value: Alignment) -> Self {
        match value {
            Alignment::TopStart => "top-start",
            Alignment::TopCenter => "top-center",
            Alignment::TopEnd => "top-end",
            Alignment::CenterStart => "center-start",
            Alignment::Center => "center",
            Alignment::CenterEnd => "center-end",
            Alignment::BottomStart => "bottom-start",
            Alignment::BottomCenter => "bottom-center",
            Alignment::BottomEnd => "bottom-end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_SCALES: [ContentScale; 7] = [
        ContentScale::Fit,
        ContentScale::Crop,
        ContentScale::FillWidth,
        ContentScale::FillHeight,
        ContentScale::FillBounds,
        ContentScale::Inside,
        ContentScale::None,
    ];

    const ALL_ALIGNMENTS: [Alignment; 9] = [
        Alignment::TopStart,
        Alignment::TopCenter,
        Alignment::TopEnd,
        Alignment::CenterStart,
        Alignment::Center,
        Alignment::CenterEnd,
        Alignment::BottomStart,
        Alignment::BottomCenter,
        Alignment::BottomEnd,
    ];

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_fit_scale() {
        // 2:1 content in a 4:3 container: height is the limiting factor
        let sf = ContentScale::Fit.compute(SizeD::new(200.0, 400.0), SizeD::new(400.0, 300.0));
        assert_eq!(sf, ScaleFactor::uniform(0.75));
    }

    #[test]
    fn test_crop_scale() {
        let sf = ContentScale::Crop.compute(SizeD::new(200.0, 400.0), SizeD::new(400.0, 300.0));
        assert_eq!(sf, ScaleFactor::uniform(2.0));
    }

    #[test]
    fn test_fill_axis_scales() {
        let content = SizeD::new(200.0, 400.0);
        let container = SizeD::new(400.0, 300.0);
        assert_eq!(
            ContentScale::FillWidth.compute(content, container),
            ScaleFactor::uniform(2.0)
        );
        assert_eq!(
            ContentScale::FillHeight.compute(content, container),
            ScaleFactor::uniform(0.75)
        );
        assert_eq!(
            ContentScale::FillBounds.compute(content, container),
            ScaleFactor::new(2.0, 0.75)
        );
    }

    #[test]
    fn test_inside_never_scales_up() {
        let small = SizeD::new(50.0, 50.0);
        let container = SizeD::new(400.0, 300.0);
        assert_eq!(
            ContentScale::Inside.compute(small, container),
            ScaleFactor::uniform(1.0)
        );
        // but still scales down
        let large = SizeD::new(800.0, 600.0);
        assert_eq!(
            ContentScale::Inside.compute(large, container),
            ScaleFactor::uniform(0.5)
        );
    }

    #[test]
    fn test_fit_content_within_container_for_all_alignments() {
        // For Fit the scaled content must lie inside the container with at
        // least one axis flush, regardless of alignment.
        let content = SizeD::new(2000.0, 618.0);
        let container = SizeD::new(500.0, 500.0);
        let sf = ContentScale::Fit.compute(content, container);
        let scaled = SizeD::new(content.width() * sf.x, content.height() * sf.y);

        assert!(scaled.width() <= container.width() + 1e-9);
        assert!(scaled.height() <= container.height() + 1e-9);
        let flush_x = approx_eq(scaled.width(), container.width(), 1e-9);
        let flush_y = approx_eq(scaled.height(), container.height(), 1e-9);
        assert!(flush_x || flush_y);

        for alignment in ALL_ALIGNMENTS {
            let offset = alignment.offset(scaled, container);
            assert!(offset.x() >= -1e-9);
            assert!(offset.y() >= -1e-9);
            assert!(offset.x() + scaled.width() <= container.width() + 1e-9);
            assert!(offset.y() + scaled.height() <= container.height() + 1e-9);
        }
    }

    #[test]
    fn test_crop_covers_container_for_all_scales() {
        // Crop and FillBounds always cover the full container
        let content = SizeD::new(300.0, 200.0);
        let container = SizeD::new(400.0, 400.0);
        for mode in [ContentScale::Crop, ContentScale::FillBounds] {
            let sf = mode.compute(content, container);
            assert!(content.width() * sf.x >= container.width() - 1e-9);
            assert!(content.height() * sf.y >= container.height() - 1e-9);
        }
    }

    #[test]
    fn test_all_scales_are_positive() {
        let content = SizeD::new(123.0, 456.0);
        let container = SizeD::new(640.0, 480.0);
        for mode in ALL_SCALES {
            let sf = mode.compute(content, container);
            assert!(sf.x > 0.0 && sf.y > 0.0, "{mode:?} produced {sf:?}");
        }
    }

    #[test]
    fn test_alignment_offsets() {
        let scaled = SizeD::new(100.0, 200.0);
        let container = SizeD::new(400.0, 300.0);

        assert_eq!(
            Alignment::TopStart.offset(scaled, container),
            VectorD::new(0.0, 0.0)
        );
        assert_eq!(
            Alignment::Center.offset(scaled, container),
            VectorD::new(150.0, 50.0)
        );
        assert_eq!(
            Alignment::BottomEnd.offset(scaled, container),
            VectorD::new(300.0, 100.0)
        );
        assert_eq!(
            Alignment::CenterEnd.offset(scaled, container),
            VectorD::new(300.0, 50.0)
        );
    }

    #[test]
    fn test_alignment_with_oversized_content() {
        // Content larger than the container anchors its matching edge
        let scaled = SizeD::new(2000.0, 618.0);
        let container = SizeD::new(500.0, 500.0);
        let offset = Alignment::BottomEnd.offset(scaled, container);
        assert_eq!(offset, VectorD::new(-1500.0, -118.0));
    }

    #[test]
    fn test_string_conversions() {
        for mode in ALL_SCALES {
            let s: &str = mode.into();
            assert_eq!(ContentScale::from(s), mode);
        }
        for alignment in ALL_ALIGNMENTS {
            let s: &str = alignment.into();
            assert_eq!(Alignment::from(s), alignment);
        }
        assert_eq!(ContentScale::from("bogus"), ContentScale::Fit);
        assert_eq!(Alignment::from("bogus"), Alignment::Center);
    }
}
