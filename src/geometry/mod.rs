//! Geometry in PDF user space (points, origin bottom-left).

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Lower-left x
    pub x: f64,
    /// Lower-left y
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from its lower-left corner and size.
    ///
    /// ```
    /// use pdf_seal::geometry::Rect;
    ///
    /// let a4 = Rect::new(0.0, 0.0, 595.0, 842.0);
    /// assert_eq!(a4.right(), 595.0);
    /// ```
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rectangle from two opposite corners in any order, as found in a
    /// PDF `/MediaBox` array.
    ///
    /// ```
    /// use pdf_seal::geometry::Rect;
    ///
    /// let r = Rect::from_points(612.0, 792.0, 0.0, 0.0);
    /// assert_eq!((r.x, r.y, r.width, r.height), (0.0, 0.0, 612.0, 792.0));
    /// ```
    pub fn from_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Left edge.
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y
    }

    /// Top edge.
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Centre point.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Shrink by `margin` on every side. Never produces a negative size.
    pub fn inset(&self, margin: f64) -> Rect {
        let dx = margin.min(self.width / 2.0);
        let dy = margin.min(self.height / 2.0);
        Rect::new(self.x + dx, self.y + dy, self.width - 2.0 * dx, self.height - 2.0 * dy)
    }

    /// Whether `other` lies entirely inside `self`, with `tolerance` slack.
    pub fn contains_rect(&self, other: &Rect, tolerance: f64) -> bool {
        other.left() >= self.left() - tolerance
            && other.right() <= self.right() + tolerance
            && other.bottom() >= self.bottom() - tolerance
            && other.top() <= self.top() + tolerance
    }

    /// The four corners, counter-clockwise from lower-left.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left(), self.bottom()),
            Point::new(self.right(), self.bottom()),
            Point::new(self.right(), self.top()),
            Point::new(self.left(), self.top()),
        ]
    }
}

/// Affine transform `[a b c d e f]` as used by the `cm` operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Coefficients in PDF order
    pub a: f64,
    /// b
    pub b: f64,
    /// c
    pub c: f64,
    /// d
    pub d: f64,
    /// e (x translation)
    pub e: f64,
    /// f (y translation)
    pub f: f64,
}

impl Matrix {
    /// Identity transform.
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    /// Pure translation.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self { e: tx, f: ty, ..Self::identity() }
    }

    /// Counter-clockwise rotation by `degrees` about `pivot`.
    pub fn rotation_about(degrees: f64, pivot: Point) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: pivot.x - cos * pivot.x + sin * pivot.y,
            f: pivot.y - sin * pivot.x - cos * pivot.y,
        }
    }

    /// Whether this is (numerically) the identity.
    pub fn is_identity(&self) -> bool {
        let id = Matrix::identity();
        [
            self.a - id.a,
            self.b - id.b,
            self.c - id.c,
            self.d - id.d,
            self.e - id.e,
            self.f - id.f,
        ]
        .iter()
        .all(|v| v.abs() < 1e-9)
    }

    /// Apply to a point.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(self.a * p.x + self.c * p.y + self.e, self.b * p.x + self.d * p.y + self.f)
    }

    /// Axis-aligned bounding box of `rect` after transformation.
    pub fn bounding_box(&self, rect: &Rect) -> Rect {
        let pts = rect.corners().map(|p| self.apply(p));
        let min_x = pts.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = pts.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = pts.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = pts.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Rect::from_points(min_x, min_y, max_x, max_y)
    }
}
