//! Coordinate transforms between normalized boxes and pixel space.
//!
//! Normalized boxes are center-based fractions of the image size. Screen boxes
//! are top-left based pixels relative to the rendered image origin; callers add
//! the on-screen image offset themselves (see [`ImageLayout`]).

use crate::model::{ImageDimensions, NormalizedBox, ScreenBox, ScreenPoint};

/// Convert a normalized box to pixel space.
pub fn to_screen(bbox: &NormalizedBox, dims: ImageDimensions) -> ScreenBox {
    ScreenBox {
        x: (bbox.x - bbox.w / 2.0) * dims.width,
        y: (bbox.y - bbox.h / 2.0) * dims.height,
        width: bbox.w * dims.width,
        height: bbox.h * dims.height,
        class_id: bbox.class_id,
    }
}

/// Convert a pixel-space box back to normalized, center-based format.
///
/// `dims` must be valid (see [`ImageDimensions::is_valid`]).
pub fn to_normalized(screen: &ScreenBox, dims: ImageDimensions) -> NormalizedBox {
    NormalizedBox {
        class_id: screen.class_id,
        x: (screen.x + screen.width / 2.0) / dims.width,
        y: (screen.y + screen.height / 2.0) / dims.height,
        w: screen.width / dims.width,
        h: screen.height / dims.height,
    }
}

/// Constrain a box to the image bounds.
///
/// A box larger than the image is truncated to the image size; otherwise the
/// size is kept and the box is shifted back inside.
pub fn clamp_to_image(screen: &ScreenBox, dims: ImageDimensions) -> ScreenBox {
    let width = screen.width.max(0.0).min(dims.width);
    let height = screen.height.max(0.0).min(dims.height);
    ScreenBox {
        x: screen.x.clamp(0.0, dims.width - width),
        y: screen.y.clamp(0.0, dims.height - height),
        width,
        height,
        class_id: screen.class_id,
    }
}

/// Clamp a normalized box into the unit square, with the same rules as
/// [`clamp_to_image`]. A box already inside is returned bit-for-bit unchanged.
pub fn clamp_normalized(bbox: &NormalizedBox) -> NormalizedBox {
    let (x, w) = clamp_axis(bbox.x, bbox.w);
    let (y, h) = clamp_axis(bbox.y, bbox.h);
    NormalizedBox {
        class_id: bbox.class_id,
        x,
        y,
        w,
        h,
    }
}

/// Clamp one axis given as (center, size) into `[0, 1]`.
fn clamp_axis(center: f64, size: f64) -> (f64, f64) {
    let size = size.max(0.0).min(1.0);
    let start = center - size / 2.0;
    let clamped = start.clamp(0.0, 1.0 - size);
    if clamped == start {
        (center, size)
    } else {
        (clamped + size / 2.0, size)
    }
}

/// Placement of an image letterboxed inside a container.
///
/// The image is scaled to fit while preserving its aspect ratio, then centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageLayout {
    /// Offset of the image origin inside the container.
    pub offset: ScreenPoint,
    /// Rendered image size.
    pub dimensions: ImageDimensions,
    /// Rendered size divided by natural size.
    pub scale: f64,
}

impl ImageLayout {
    /// Image drawn at its rendered size with no offset.
    pub fn unscaled(dimensions: ImageDimensions) -> Self {
        Self {
            offset: ScreenPoint::default(),
            dimensions,
            scale: 1.0,
        }
    }

    /// Fit an image of `natural` size into `container`.
    ///
    /// Returns `None` until both sizes are known.
    pub fn fit(container: ImageDimensions, natural: ImageDimensions) -> Option<Self> {
        if !container.is_valid() || !natural.is_valid() {
            return None;
        }

        let scale = (container.width / natural.width).min(container.height / natural.height);
        let dimensions = ImageDimensions::new(natural.width * scale, natural.height * scale);
        let offset = ScreenPoint::new(
            (container.width - dimensions.width) / 2.0,
            (container.height - dimensions.height) / 2.0,
        );

        Some(Self {
            offset,
            dimensions,
            scale,
        })
    }

    /// Convert a container-relative point to image-origin pixel space.
    pub fn to_image_point(&self, container_point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(
            container_point.x - self.offset.x,
            container_point.y - self.offset.y,
        )
    }

    /// Convert an image-origin point back to container coordinates.
    pub fn to_container_point(&self, image_point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(
            image_point.x + self.offset.x,
            image_point.y + self.offset.y,
        )
    }

    /// Clamp an image-origin point onto the image area.
    pub fn clamp_point(&self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(
            point.x.clamp(0.0, self.dimensions.width),
            point.y.clamp(0.0, self.dimensions.height),
        )
    }

    /// Whether an image-origin point lies on the image.
    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x <= self.dimensions.width
            && point.y <= self.dimensions.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn boxes_approx_eq(a: &NormalizedBox, b: &NormalizedBox) -> bool {
        a.class_id == b.class_id
            && approx_eq(a.x, b.x)
            && approx_eq(a.y, b.y)
            && approx_eq(a.w, b.w)
            && approx_eq(a.h, b.h)
    }

    #[test]
    fn test_to_screen() {
        let bbox = NormalizedBox::new(1, 0.5, 0.5, 0.2, 0.4);
        let sb = to_screen(&bbox, ImageDimensions::new(1000.0, 500.0));
        assert!(approx_eq(sb.x, 400.0));
        assert!(approx_eq(sb.y, 150.0));
        assert!(approx_eq(sb.width, 200.0));
        assert!(approx_eq(sb.height, 200.0));
        assert_eq!(sb.class_id, 1);
    }

    #[test]
    fn test_drawn_box_normalizes() {
        // Drawn from (100, 100) to (300, 200) on a 1000x500 image.
        let dims = ImageDimensions::new(1000.0, 500.0);
        let sb = ScreenBox::from_corners(ScreenPoint::new(100.0, 100.0), ScreenPoint::new(300.0, 200.0), 2);
        let bbox = to_normalized(&sb, dims);
        assert!(boxes_approx_eq(&bbox, &NormalizedBox::new(2, 0.2, 0.3, 0.2, 0.2)));
    }

    #[test]
    fn test_round_trip() {
        let dims_list = [
            ImageDimensions::new(1000.0, 500.0),
            ImageDimensions::new(1.0, 1.0),
            ImageDimensions::new(333.3, 4096.0),
            ImageDimensions::new(7.0, 13.0),
        ];
        let boxes = [
            NormalizedBox::new(0, 0.5, 0.5, 1.0, 1.0),
            NormalizedBox::new(4, 0.123_456, 0.987_654, 0.01, 0.02),
            NormalizedBox::new(9, 0.1, 0.9, 0.2, 0.2),
        ];

        for dims in dims_list {
            for bbox in &boxes {
                let back = to_normalized(&to_screen(bbox, dims), dims);
                assert!(boxes_approx_eq(bbox, &back), "{bbox:?} via {dims:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn test_clamp_overflow() {
        let sb = ScreenBox::new(-20.0, 10.0, 100.0, 50.0, 0);
        let clamped = clamp_to_image(&sb, ImageDimensions::new(80.0, 80.0));
        assert_eq!(clamped, ScreenBox::new(0.0, 10.0, 80.0, 50.0, 0));
    }

    #[test]
    fn test_clamp_shifts_inside() {
        let sb = ScreenBox::new(50.0, 70.0, 40.0, 20.0, 0);
        let clamped = clamp_to_image(&sb, ImageDimensions::new(80.0, 80.0));
        assert_eq!(clamped, ScreenBox::new(40.0, 60.0, 40.0, 20.0, 0));
    }

    #[test]
    fn test_clamp_idempotent() {
        let dims = ImageDimensions::new(80.0, 60.0);
        let samples = [
            ScreenBox::new(-20.0, 10.0, 100.0, 50.0, 0),
            ScreenBox::new(70.0, 55.0, 30.0, 30.0, 1),
            ScreenBox::new(10.0, 10.0, 5.0, 5.0, 2),
            ScreenBox::new(-500.0, -500.0, 1000.0, 1000.0, 3),
        ];
        for sb in samples {
            let once = clamp_to_image(&sb, dims);
            let twice = clamp_to_image(&once, dims);
            assert_eq!(once, twice);
            assert!(once.x >= 0.0 && once.y >= 0.0);
            assert!(once.right() <= dims.width && once.bottom() <= dims.height);
        }
    }

    #[test]
    fn test_clamp_normalized() {
        let bbox = NormalizedBox::new(0, 0.95, 0.5, 0.2, 0.2);
        let clamped = clamp_normalized(&bbox);
        assert!(approx_eq(clamped.x, 0.9));
        assert!(approx_eq(clamped.w, 0.2));

        let inside = NormalizedBox::new(3, 0.3, 0.7, 0.2, 0.1);
        assert_eq!(clamp_normalized(&inside), inside);
    }

    #[test]
    fn test_letterbox_fit_wide_container() {
        // 200x100 image into 800x800: scaled 4x, centered vertically.
        let layout = ImageLayout::fit(
            ImageDimensions::new(800.0, 800.0),
            ImageDimensions::new(200.0, 100.0),
        )
        .expect("valid sizes");
        assert!(approx_eq(layout.scale, 4.0));
        assert!(approx_eq(layout.dimensions.width, 800.0));
        assert!(approx_eq(layout.dimensions.height, 400.0));
        assert!(approx_eq(layout.offset.x, 0.0));
        assert!(approx_eq(layout.offset.y, 200.0));

        let p = layout.to_image_point(ScreenPoint::new(100.0, 250.0));
        assert!(approx_eq(p.x, 100.0));
        assert!(approx_eq(p.y, 50.0));
        assert_eq!(layout.to_container_point(p), ScreenPoint::new(100.0, 250.0));
    }

    #[test]
    fn test_letterbox_requires_dimensions() {
        assert!(ImageLayout::fit(ImageDimensions::new(800.0, 600.0), ImageDimensions::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_clamp_point() {
        let layout = ImageLayout::unscaled(ImageDimensions::new(100.0, 50.0));
        assert_eq!(layout.clamp_point(ScreenPoint::new(-5.0, 80.0)), ScreenPoint::new(0.0, 50.0));
        assert!(layout.contains(ScreenPoint::new(100.0, 50.0)));
        assert!(!layout.contains(ScreenPoint::new(100.1, 50.0)));
    }
}
