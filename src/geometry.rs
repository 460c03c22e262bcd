//! Projection of normalized touch samples into canvas pixel space.
//!
//! Sensor space has its origin at the bottom left with both axes in `[0, 1]`.
//! Canvas space has its origin at the top left and is measured in pixels.
//! Contact axes are expressed in a sensor unit where 100 units span the full
//! device width, so ellipse size follows the canvas width.

/// Sensor units spanning the full device width.
pub const SENSOR_UNITS_PER_WIDTH: f64 = 100.0;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(600.0, 400.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    Began,
    Moved,
    Ended,
    /// In range of the sensor but not touching
    Hovering,
    Other,
}

/// One contact at one sampling instant, as delivered by the device source.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TouchSample {
    /// Normalized position, origin bottom left
    pub x: f32,
    pub y: f32,
    pub axis_major: f32,
    pub axis_minor: f32,
    /// Contact ellipse orientation in radians
    pub angle: f32,
    /// Total contact signal in `[0, 1]`, drawn as opacity
    pub total: f32,
    pub id: Option<i32>,
    pub phase: Option<TouchPhase>,
}

impl TouchSample {
    pub fn new(x: f32, y: f32, axis_major: f32, axis_minor: f32, angle: f32, total: f32) -> Self {
        Self {
            x,
            y,
            axis_major,
            axis_minor,
            angle,
            total,
            id: None,
            phase: None,
        }
    }
}

/// An oriented ellipse in canvas pixels, ready to paint.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectedEllipse {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    /// Rotation about the center in radians, canvas orientation
    pub rotation: f64,
    /// In `[0, 1]`
    pub opacity: f64,
}

impl ProjectedEllipse {
    /// Whether `point` lies inside the ellipse. Degenerate ellipses contain nothing.
    pub fn contains(&self, point: Point) -> bool {
        let (a, b) = (self.width / 2.0, self.height / 2.0);
        if a <= 0.0 || b <= 0.0 {
            return false;
        }
        let (dx, dy) = (point.x - self.center.x, point.y - self.center.y);
        let (sin, cos) = self.rotation.sin_cos();
        // undo the rotation to get ellipse-local coordinates
        let lx = dx * cos + dy * sin;
        let ly = -dx * sin + dy * cos;
        (lx / a).powi(2) + (ly / b).powi(2) <= 1.0
    }

    /// Axis-aligned bounds as (top left, bottom right).
    pub fn bounding_box(&self) -> (Point, Point) {
        let (a, b) = (self.width / 2.0, self.height / 2.0);
        let (sin, cos) = self.rotation.sin_cos();
        let ex = ((a * cos).powi(2) + (b * sin).powi(2)).sqrt();
        let ey = ((a * sin).powi(2) + (b * cos).powi(2)).sqrt();
        (
            Point::new(self.center.x - ex, self.center.y - ey),
            Point::new(self.center.x + ex, self.center.y + ey),
        )
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Projects `sample` onto a canvas of `canvas` pixels. Never fails: non-finite
/// fields read as zero, negative axes collapse to a point, positions outside
/// `[0, 1]` pass through and land off canvas.
pub fn project(sample: &TouchSample, canvas: CanvasSize) -> ProjectedEllipse {
    let x = finite_or_zero(f64::from(sample.x));
    let y = finite_or_zero(f64::from(sample.y));
    let unit = canvas.width / SENSOR_UNITS_PER_WIDTH;

    let width = finite_or_zero(f64::from(sample.axis_major) * unit).max(0.0);
    let height = finite_or_zero(f64::from(sample.axis_minor) * unit).max(0.0);

    ProjectedEllipse {
        center: Point::new(
            finite_or_zero(x * canvas.width),
            finite_or_zero((1.0 - y) * canvas.height),
        ),
        width,
        height,
        // the sensor measures angles counter-clockwise with y up
        rotation: -finite_or_zero(f64::from(sample.angle)),
        opacity: finite_or_zero(f64::from(sample.total)).clamp(0.0, 1.0),
    }
}

/// Projects a batch, preserving its order.
pub fn project_all(samples: &[TouchSample], canvas: CanvasSize) -> Vec<ProjectedEllipse> {
    samples.iter().map(|s| project(s, canvas)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn centered_point_contact() {
        for (w, h) in [(600.0, 400.0), (1.0, 1.0), (1920.0, 1080.0), (37.5, 812.0)] {
            let canvas = CanvasSize::new(w, h);
            let e = project(&TouchSample::new(0.5, 0.5, 0.0, 0.0, 0.0, 1.0), canvas);
            assert_eq!(e.center, Point::new(0.5 * w, 0.5 * h));
            assert_eq!(e.width, 0.0);
            assert_eq!(e.height, 0.0);
        }
    }

    #[test]
    fn bottom_left_contact_on_debug_canvas() {
        let e = project(
            &TouchSample::new(0.0, 0.0, 10.0, 5.0, 0.0, 0.5),
            CanvasSize::new(600.0, 400.0),
        );
        assert_eq!(e.center, Point::new(0.0, 400.0));
        assert_eq!(e.width, 60.0);
        assert_eq!(e.height, 30.0);
        assert_eq!(e.rotation, 0.0);
        assert_eq!(e.opacity, 0.5);
    }

    #[test]
    fn vertical_flip_mirrors_center() {
        let canvas = CanvasSize::new(640.0, 480.0);
        for p in [0.0f32, 0.1, 0.25, 0.5, 0.73, 1.0] {
            let a = project(&TouchSample::new(0.3, p, 4.0, 2.0, 0.4, 0.8), canvas);
            let b = project(&TouchSample::new(0.3, 1.0 - p, 4.0, 2.0, 0.4, 0.8), canvas);
            assert!(approx(b.center.y, canvas.height - a.center.y), "p = {p}");
            assert_eq!(a.center.x, b.center.x);
        }
    }

    #[test]
    fn angle_sign_is_inverted() {
        let e = project(&TouchSample::new(0.5, 0.5, 10.0, 5.0, 0.75, 1.0), CanvasSize::default());
        assert!(approx(e.rotation, -0.75));
    }

    #[test]
    fn degenerate_inputs_do_not_fail() {
        let canvas = CanvasSize::default();

        let negative = project(&TouchSample::new(0.5, 0.5, -3.0, -1.0, 0.0, 0.5), canvas);
        assert_eq!((negative.width, negative.height), (0.0, 0.0));

        let outside = project(&TouchSample::new(1.5, -0.5, 1.0, 1.0, 0.0, 0.5), canvas);
        assert_eq!(outside.center, Point::new(900.0, 600.0));

        let nan = project(
            &TouchSample::new(f32::NAN, 0.5, f32::INFINITY, 1.0, f32::NAN, f32::NAN),
            canvas,
        );
        assert_eq!(nan.center.x, 0.0);
        assert_eq!(nan.width, 0.0);
        assert_eq!(nan.rotation, 0.0);
        assert_eq!(nan.opacity, 0.0);
    }

    #[test]
    fn opacity_is_clamped() {
        let canvas = CanvasSize::default();
        let bright = project(&TouchSample::new(0.5, 0.5, 1.0, 1.0, 0.0, 1.7), canvas);
        let faint = project(&TouchSample::new(0.5, 0.5, 1.0, 1.0, 0.0, -0.2), canvas);
        assert_eq!(bright.opacity, 1.0);
        assert_eq!(faint.opacity, 0.0);
    }

    #[test]
    fn contains_respects_rotation() {
        let e = ProjectedEllipse {
            center: Point::new(100.0, 100.0),
            width: 60.0,
            height: 20.0,
            rotation: 0.0,
            opacity: 1.0,
        };
        assert!(e.contains(Point::new(125.0, 100.0)));
        assert!(!e.contains(Point::new(100.0, 125.0)));

        let turned = ProjectedEllipse { rotation: FRAC_PI_2, ..e };
        assert!(!turned.contains(Point::new(125.0, 100.0)));
        assert!(turned.contains(Point::new(100.0, 125.0)));

        let point = ProjectedEllipse { width: 0.0, ..e };
        assert!(!point.contains(e.center));
    }

    #[test]
    fn bounding_box_of_rotated_ellipse() {
        let e = ProjectedEllipse {
            center: Point::new(50.0, 40.0),
            width: 60.0,
            height: 20.0,
            rotation: FRAC_PI_2,
            opacity: 1.0,
        };
        let (min, max) = e.bounding_box();
        assert!(approx(min.x, 40.0) && approx(max.x, 60.0));
        assert!(approx(min.y, 10.0) && approx(max.y, 70.0));
    }

    #[test]
    fn project_all_keeps_order() {
        let batch = [
            TouchSample::new(0.1, 0.9, 1.0, 1.0, 0.0, 1.0),
            TouchSample::new(0.9, 0.1, 1.0, 1.0, 0.0, 1.0),
        ];
        let projected = project_all(&batch, CanvasSize::new(100.0, 100.0));
        assert_eq!(projected.len(), 2);
        assert!(approx(projected[0].center.x, 10.0));
        assert!(approx(projected[1].center.x, 90.0));
    }
}
