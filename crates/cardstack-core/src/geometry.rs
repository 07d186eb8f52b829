#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! All values are in points (logical pixels, origin at top-left, y grows
//! downward), matching what a touch UI host reports for pan translations.

use std::ops::{Add, Neg, Sub};

/// A point or a displacement vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise absolute value.
    #[inline]
    #[must_use]
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    /// Euclidean length when used as a vector.
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Scale both components.
    #[inline]
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Linear interpolation toward `other`.
    #[inline]
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Create a new size.
    #[inline]
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Check if either dimension is zero or negative.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An axis-aligned rectangle for card frames, snapshot regions, and the
/// container viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle at the origin with the given size.
    #[inline]
    #[must_use]
    pub const fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Origin (top-left corner).
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Size of the rectangle.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Center point.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if the rectangle has zero area.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size().is_empty()
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.max_x() && p.y >= self.y && p.y < self.max_y()
    }

    /// Same rectangle moved so its top edge sits at `y`.
    #[inline]
    #[must_use]
    pub const fn with_y(self, y: f64) -> Self {
        Self::new(self.x, y, self.width, self.height)
    }

    /// Same origin, different height.
    #[inline]
    #[must_use]
    pub const fn with_height(self, height: f64) -> Self {
        Self::new(self.x, self.y, self.width, height)
    }

    /// Rectangle of `size` centered on `center`.
    #[must_use]
    pub fn centered_at(center: Point, size: Size) -> Self {
        Self::new(
            center.x - size.width / 2.0,
            center.y - size.height / 2.0,
            size.width,
            size.height,
        )
    }

    /// Inset all edges by `dx` horizontally and `dy` vertically.
    ///
    /// Insets larger than the rectangle collapse it to zero size.
    #[must_use]
    pub fn inset(self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.x + dx,
            self.y + dy,
            (self.width - 2.0 * dx).max(0.0),
            (self.height - 2.0 * dy).max(0.0),
        )
    }
}

/// A 2D affine transform restricted to translate, rotate (radians, about the
/// element's center), and uniform scale.
///
/// This is all the visual state a card or the drag snapshot ever carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Point,
    pub rotation: f64,
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// No translation, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: Point::ZERO,
        rotation: 0.0,
        scale: 1.0,
    };

    /// Pure translation.
    #[must_use]
    pub const fn translation(dx: f64, dy: f64) -> Self {
        Self {
            translation: Point::new(dx, dy),
            rotation: 0.0,
            scale: 1.0,
        }
    }

    /// Add a rotation (builder pattern).
    #[must_use]
    pub const fn rotated(mut self, radians: f64) -> Self {
        self.rotation = radians;
        self
    }

    /// Set the uniform scale (builder pattern).
    #[must_use]
    pub const fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Whether this is the identity within a small tolerance.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        const EPS: f64 = 1e-9;
        self.translation.x.abs() < EPS
            && self.translation.y.abs() < EPS
            && self.rotation.abs() < EPS
            && (self.scale - 1.0).abs() < EPS
    }

    /// Component-wise interpolation toward `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation + (other.rotation - self.rotation) * t,
            scale: self.scale + (other.scale - self.scale) * t,
        }
    }
}
