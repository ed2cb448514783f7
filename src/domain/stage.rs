//! Stage geometry: static platforms and the blast-zone bounds.

use super::geom::Rect;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlatformKind {
    /// Landable from above only; passable from below and the sides;
    /// drop-through on demand.
    Thin,
    /// Solid from above and below (head-bonk).
    Thick,
}

/// Index into `Stage::platforms`. Platforms never move or get removed during
/// a match, so the index is a stable handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PlatformId(pub usize);

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Platform {
    pub rect: Rect,
    pub kind: PlatformKind,
}

impl Platform {
    pub fn thin(rect: Rect) -> Self {
        Platform { rect, kind: PlatformKind::Thin }
    }

    pub fn thick(rect: Rect) -> Self {
        Platform { rect, kind: PlatformKind::Thick }
    }

    pub fn is_thin(&self) -> bool {
        self.kind == PlatformKind::Thin
    }
}

#[derive(Clone, Debug)]
pub struct Stage {
    pub width: f32,
    pub height: f32,
    /// Distance beyond the stage edges at which a body is knocked out.
    pub blast_padding: f32,
    pub platforms: Vec<Platform>,
}

impl Stage {
    /// A body is in the blast zone once it lies entirely beyond any edge of
    /// the padded stage.
    pub fn in_blast_zone(&self, body: &Rect) -> bool {
        let pad = self.blast_padding;
        body.right() < -pad
            || body.left() > self.width + pad
            || body.bottom() < -pad
            || body.top() > self.height + pad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> Stage {
        Stage { width: 960.0, height: 540.0, blast_padding: 50.0, platforms: vec![] }
    }

    #[test]
    fn blast_zone_needs_full_exit() {
        let s = stage();
        // Straddling the padded right edge: still alive.
        assert!(!s.in_blast_zone(&Rect::new(1000.0, 200.0, 40.0, 60.0)));
        assert!(s.in_blast_zone(&Rect::new(1011.0, 200.0, 40.0, 60.0)));
        assert!(s.in_blast_zone(&Rect::new(-91.0, 200.0, 40.0, 60.0)));
        assert!(s.in_blast_zone(&Rect::new(100.0, 591.0, 40.0, 60.0)));
        assert!(s.in_blast_zone(&Rect::new(100.0, -111.0, 40.0, 60.0)));
        assert!(!s.in_blast_zone(&Rect::new(100.0, -100.0, 40.0, 60.0)));
    }
}
