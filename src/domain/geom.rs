//! Continuous-space geometry: axis-aligned rectangles and 2D vectors.
//!
//! Screen convention: +x right, +y DOWN. A body "above" a platform has a
//! smaller y. Velocities follow the same axes, so a jump is a negative vy.

/// Contact tolerance. Positions are f32 and per-tick motion is discrete, so
/// "resting exactly on a surface" is tested within this distance.
pub const CONTACT_EPS: f32 = 1e-3;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }
}

/// Axis-aligned bounding box, top-left anchored.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    /// Build a rect of size (w, h) whose bottom-center sits at `p`.
    pub fn from_midbottom(p: Vec2, w: f32, h: f32) -> Self {
        Rect { x: p.x - w / 2.0, y: p.y - h, w, h }
    }

    /// Build a rect of size (w, h) centered on `c`.
    pub fn from_center(c: Vec2, w: f32, h: f32) -> Self {
        Rect { x: c.x - w / 2.0, y: c.y - h / 2.0, w, h }
    }

    #[inline] pub fn left(&self) -> f32 { self.x }
    #[inline] pub fn right(&self) -> f32 { self.x + self.w }
    #[inline] pub fn top(&self) -> f32 { self.y }
    #[inline] pub fn bottom(&self) -> f32 { self.y + self.h }
    #[inline] pub fn center_x(&self) -> f32 { self.x + self.w / 2.0 }
    #[inline] pub fn center_y(&self) -> f32 { self.y + self.h / 2.0 }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.center_x(), self.center_y())
    }

    pub fn midbottom(&self) -> Vec2 {
        Vec2::new(self.center_x(), self.bottom())
    }

    pub fn set_left(&mut self, v: f32) { self.x = v; }
    pub fn set_right(&mut self, v: f32) { self.x = v - self.w; }
    pub fn set_top(&mut self, v: f32) { self.y = v; }
    pub fn set_bottom(&mut self, v: f32) { self.y = v - self.h; }

    pub fn set_center(&mut self, c: Vec2) {
        self.x = c.x - self.w / 2.0;
        self.y = c.y - self.h / 2.0;
    }

    pub fn translate(&mut self, d: Vec2) {
        self.x += d.x;
        self.y += d.y;
    }

    /// Strict interior overlap: touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Horizontal spans overlap (strictly).
    pub fn x_overlaps(&self, other: &Rect) -> bool {
        self.right() > other.left() && self.left() < other.right()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midbottom_roundtrip() {
        let r = Rect::from_midbottom(Vec2::new(100.0, 200.0), 40.0, 60.0);
        assert_eq!(r.left(), 80.0);
        assert_eq!(r.top(), 140.0);
        assert_eq!(r.midbottom(), Vec2::new(100.0, 200.0));
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        let c = Rect::new(9.5, 9.5, 10.0, 10.0);
        assert!(a.overlaps(&c));
    }

    #[test]
    fn edge_setters_keep_size() {
        let mut r = Rect::new(0.0, 0.0, 40.0, 60.0);
        r.set_bottom(315.0);
        assert_eq!(r.top(), 255.0);
        r.set_right(100.0);
        assert_eq!(r.left(), 60.0);
        assert_eq!(r.w, 40.0);
    }
}
