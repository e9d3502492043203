//! Basic geometric types for PDF

use crate::objects::Object;

/// A point in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin point (0, 0)
    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// A rectangle defined by two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Lower-left corner
    pub lower_left: Point,
    /// Upper-right corner
    pub upper_right: Point,
}

impl Rectangle {
    /// Create a new rectangle from two points
    pub fn new(lower_left: Point, upper_right: Point) -> Self {
        Self {
            lower_left,
            upper_right,
        }
    }

    /// Create a rectangle from position and size
    pub fn from_position_and_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            lower_left: Point::new(x, y),
            upper_right: Point::new(x + width, y + height),
        }
    }

    /// Reads a `[llx lly urx ury]` array. Corners given in any order are
    /// normalized.
    pub fn from_array(values: &[Object]) -> Option<Self> {
        if values.len() != 4 {
            return None;
        }
        let mut coords = [0.0; 4];
        for (slot, value) in coords.iter_mut().zip(values) {
            *slot = value.as_real()?;
        }
        let [x1, y1, x2, y2] = coords;
        Some(Self::new(
            Point::new(x1.min(x2), y1.min(y2)),
            Point::new(x1.max(x2), y1.max(y2)),
        ))
    }

    pub fn to_object(&self) -> Object {
        Object::Array(vec![
            Object::from(self.lower_left.x),
            Object::from(self.lower_left.y),
            Object::from(self.upper_right.x),
            Object::from(self.upper_right.y),
        ])
    }

    /// Get the width
    pub fn width(&self) -> f64 {
        self.upper_right.x - self.lower_left.x
    }

    /// Get the height
    pub fn height(&self) -> f64 {
        self.upper_right.y - self.lower_left.y
    }

    /// Get the center point
    pub fn center(&self) -> Point {
        Point::new(
            (self.lower_left.x + self.upper_right.x) / 2.0,
            (self.lower_left.y + self.upper_right.y) / 2.0,
        )
    }
}

/// Affine transform `[a b c d e f]` in PDF's row-vector convention:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Reads a six-number array such as a form's `/Matrix`.
    pub fn from_array(values: &[Object]) -> Option<Self> {
        if values.len() != 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, value) in m.iter_mut().zip(values) {
            *slot = value.as_real()?;
        }
        Some(Self::new(m[0], m[1], m[2], m[3], m[4], m[5]))
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// `self × m`: apply `self` first, then `m`.
    ///
    /// The `cm` operator sets `CTM = M.concat(&CTM)`.
    pub fn concat(&self, m: &Matrix) -> Self {
        Self {
            a: self.a * m.a + self.b * m.c,
            b: self.a * m.b + self.b * m.d,
            c: self.c * m.a + self.d * m.c,
            d: self.c * m.b + self.d * m.d,
            e: self.e * m.a + self.f * m.c + m.e,
            f: self.e * m.b + self.f * m.d + m.f,
        }
    }

    pub fn transform_point(&self, p: Point) -> Point {
        Point {
            x: p.x * self.a + p.y * self.c + self.e,
            y: p.x * self.b + p.y * self.d + self.f,
        }
    }
}

/// Page rotation, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Up,
    Right,
    Down,
    Left,
}

impl Rotation {
    /// Normalizes any multiple of 90 (negative included). Other values
    /// fall back to no rotation.
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            0 => Rotation::Up,
            90 => Rotation::Right,
            180 => Rotation::Down,
            270 => Rotation::Left,
            other => {
                tracing::warn!(degrees = other, "rotation is not a multiple of 90");
                Rotation::Up
            }
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Up => 0,
            Rotation::Right => 90,
            Rotation::Down => 180,
            Rotation::Left => 270,
        }
    }

    /// Swaps width and height.
    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::Right | Rotation::Left)
    }

    /// Flip/rotation from user space to a y-down device canvas of
    /// `width` x `height`.
    pub fn device_matrix(self, width: f64, height: f64) -> Matrix {
        match self {
            Rotation::Up => Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, height),
            Rotation::Right => Matrix::new(0.0, 1.0, 1.0, 0.0, 0.0, 0.0),
            Rotation::Down => Matrix::new(-1.0, 0.0, 0.0, 1.0, width, 0.0),
            Rotation::Left => Matrix::new(0.0, -1.0, -1.0, 0.0, width, height),
        }
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFormat {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
}

impl PageFormat {
    pub fn size(self) -> (f64, f64) {
        match self {
            PageFormat::A3 => (842.0, 1191.0),
            PageFormat::A4 => (595.0, 842.0),
            PageFormat::A5 => (420.0, 595.0),
            PageFormat::Letter => (612.0, 792.0),
            PageFormat::Legal => (612.0, 1008.0),
        }
    }

    pub fn to_rectangle(self) -> Rectangle {
        let (width, height) = self.size();
        Rectangle::from_position_and_size(0.0, 0.0, width, height)
    }
}
