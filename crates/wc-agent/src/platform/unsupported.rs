//! Stub window system for platforms without an implementation.

use crate::window::{Rect, TargetWindow, WindowHandle, WindowSystem};

pub struct StubWindowSystem;

impl WindowSystem for StubWindowSystem {
    fn list_windows(&self) -> Vec<TargetWindow> {
        Vec::new()
    }

    fn foreground_window(&self) -> Option<TargetWindow> {
        None
    }

    fn activate(&self, _: WindowHandle) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("window control is only available on Windows"))
    }

    fn move_window(&self, _: WindowHandle, _: Rect) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("window control is only available on Windows"))
    }

    fn close_window(&self, _: WindowHandle) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("window control is only available on Windows"))
    }

    fn work_area_at(&self, _: i32, _: i32) -> Rect {
        Rect::new(0, 0, 0, 0)
    }
}
