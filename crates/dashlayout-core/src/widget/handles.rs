//! Resize handles on the widget frame.

use crate::config::WidgetConfig;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// A resize handle: one of four corners or four edge midpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    Corner(Corner),
    Edge(Edge),
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::Corner(Corner::TopLeft),
        ResizeHandle::Edge(Edge::Top),
        ResizeHandle::Corner(Corner::TopRight),
        ResizeHandle::Edge(Edge::Right),
        ResizeHandle::Corner(Corner::BottomRight),
        ResizeHandle::Edge(Edge::Bottom),
        ResizeHandle::Corner(Corner::BottomLeft),
        ResizeHandle::Edge(Edge::Left),
    ];

    fn moves_left(self) -> bool {
        matches!(
            self,
            ResizeHandle::Edge(Edge::Left)
                | ResizeHandle::Corner(Corner::TopLeft | Corner::BottomLeft)
        )
    }

    fn moves_right(self) -> bool {
        matches!(
            self,
            ResizeHandle::Edge(Edge::Right)
                | ResizeHandle::Corner(Corner::TopRight | Corner::BottomRight)
        )
    }

    fn moves_top(self) -> bool {
        matches!(
            self,
            ResizeHandle::Edge(Edge::Top)
                | ResizeHandle::Corner(Corner::TopLeft | Corner::TopRight)
        )
    }

    fn moves_bottom(self) -> bool {
        matches!(
            self,
            ResizeHandle::Edge(Edge::Bottom)
                | ResizeHandle::Corner(Corner::BottomLeft | Corner::BottomRight)
        )
    }

    /// Handle position on `bounds`.
    pub fn position(self, bounds: Rect) -> Point {
        let x = if self.moves_left() {
            bounds.x0
        } else if self.moves_right() {
            bounds.x1
        } else {
            bounds.center().x
        };
        let y = if self.moves_top() {
            bounds.y0
        } else if self.moves_bottom() {
            bounds.y1
        } else {
            bounds.center().y
        };
        Point::new(x, y)
    }

    /// CSS cursor shown over the handle.
    pub fn cursor(self) -> &'static str {
        match self {
            ResizeHandle::Corner(Corner::TopLeft | Corner::BottomRight) => "nwse-resize",
            ResizeHandle::Corner(Corner::TopRight | Corner::BottomLeft) => "nesw-resize",
            ResizeHandle::Edge(Edge::Top | Edge::Bottom) => "ns-resize",
            ResizeHandle::Edge(Edge::Left | Edge::Right) => "ew-resize",
        }
    }

    /// Handle under `point`, if any. Corners win over edges.
    pub fn hit_test(bounds: Rect, point: Point, tolerance: f64) -> Option<ResizeHandle> {
        let hits = |handle: &ResizeHandle| {
            let p = handle.position(bounds);
            let dx = point.x - p.x;
            let dy = point.y - p.y;
            dx * dx + dy * dy <= tolerance * tolerance
        };
        let corners = Self::ALL.iter().filter(|h| matches!(h, ResizeHandle::Corner(_)));
        let edges = Self::ALL.iter().filter(|h| matches!(h, ResizeHandle::Edge(_)));
        corners.chain(edges).find(|h| hits(h)).copied()
    }

    /// Resize `original` by a pointer `delta` measured from the start of the gesture.
    ///
    /// Right and bottom edges stop at the viewport margin. Left and top edges
    /// move the anchor and stop at the margin too. Extents never drop below
    /// `min_extent`.
    pub fn apply(self, original: &WidgetConfig, delta: Vec2, viewport: Size, margin: f64, min_extent: f64) -> WidgetConfig {
        let o = original;
        let mut c = *original;

        if self.moves_right() {
            let cap = viewport.width - margin - o.x;
            c.width = (o.width + delta.x).min(cap).max(min_extent);
        }
        if self.moves_bottom() {
            let cap = viewport.height - margin - o.y;
            c.height = (o.height + delta.y).min(cap).max(min_extent);
        }
        if self.moves_left() {
            let right = o.x + o.width;
            let x = (o.x + delta.x).min(right - min_extent).max(margin);
            c.x = x;
            c.width = (right - x).max(min_extent);
        }
        if self.moves_top() {
            let bottom = o.y + o.height;
            let y = (o.y + delta.y).min(bottom - min_extent).max(margin);
            c.y = y;
            c.height = (bottom - y).max(min_extent);
        }
        c.sanitized()
    }
}
