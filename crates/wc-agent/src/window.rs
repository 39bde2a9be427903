//! Window model and the window-system collaborator trait.
//!
//! The OS primitives (enumeration, activation, geometry, close) live
//! behind [`WindowSystem`] so the tracker, injector and session can be
//! exercised against mock implementations.

use wc_protocol::WindowEntry;

/// Opaque native window handle (HWND value on Windows).
pub type WindowHandle = isize;

/// Window geometry in desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub fn center(&self) -> (i32, i32) {
        (self.left + self.width / 2, self.top + self.height / 2)
    }

    /// True when `other` lies fully inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// True for rectangles that cannot be captured.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// One resolvable window. Refreshed every resolution cycle, never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetWindow {
    pub title: String,
    pub handle: WindowHandle,
    pub rect: Rect,
    pub foreground: bool,
    pub minimized: bool,
}

impl TargetWindow {
    pub fn entry(&self) -> WindowEntry {
        WindowEntry {
            title: self.title.clone(),
            left: self.rect.left,
            top: self.rect.top,
            width: self.rect.width,
            height: self.rect.height,
            foreground: self.foreground,
            minimized: self.minimized,
        }
    }
}

/// OS window primitives. Implementations are platform modules; tests
/// substitute mocks.
pub trait WindowSystem: Send + Sync {
    /// All visible top-level windows with a non-empty title. No width
    /// filtering here; the tracker applies its own minimum.
    fn list_windows(&self) -> Vec<TargetWindow>;

    /// The current OS foreground window, if any.
    fn foreground_window(&self) -> Option<TargetWindow>;

    /// Bring a window to the foreground, restoring it if minimized.
    fn activate(&self, handle: WindowHandle) -> anyhow::Result<()>;

    /// Move/resize a window to the given desktop rect.
    fn move_window(&self, handle: WindowHandle, rect: Rect) -> anyhow::Result<()>;

    /// Ask a window to close (non-forceful).
    fn close_window(&self, handle: WindowHandle) -> anyhow::Result<()>;

    /// Work area (excluding taskbars) of the monitor containing the
    /// given desktop point.
    fn work_area_at(&self, x: i32, y: i32) -> Rect;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains() {
        let outer = Rect::new(0, 0, 1920, 1080);
        assert!(outer.contains(&Rect::new(100, 100, 200, 200)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&Rect::new(1800, 100, 200, 200)));
        assert!(!outer.contains(&Rect::new(-10, 0, 50, 50)));
    }

    #[test]
    fn test_rect_center_and_degenerate() {
        let r = Rect::new(100, 200, 400, 300);
        assert_eq!(r.center(), (300, 350));
        assert!(!r.is_degenerate());
        assert!(Rect::new(0, 0, 0, 10).is_degenerate());
        assert!(Rect::new(0, 0, 10, -5).is_degenerate());
    }
}
