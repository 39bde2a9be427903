//! Input injection: window-relative commands mapped to absolute
//! coordinates and native mouse/keyboard actions via `enigo`.
//!
//! The OS primitives sit behind [`InputBackend`] so the injector logic
//! (coordinate mapping, focus-follow typing, verified close, geometry
//! adaptation) is testable without a display server.

use wc_common::AppError;
use wc_protocol::{CommandAction, ControlCommand};

use crate::window::{Rect, TargetWindow, WindowHandle, WindowSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Press,
    Release,
    Tap,
}

/// Absolute-coordinate input primitives.
pub trait InputBackend: Send {
    fn mouse_move(&mut self, x: i32, y: i32) -> anyhow::Result<()>;
    fn button(&mut self, button: MouseButton, dir: KeyDirection) -> anyhow::Result<()>;
    /// Wheel-style amount: negative scrolls content down.
    fn scroll(&mut self, amount: i32) -> anyhow::Result<()>;
    fn text(&mut self, text: &str) -> anyhow::Result<()>;
    fn key(&mut self, name: &str, dir: KeyDirection) -> anyhow::Result<()>;
}

// ─── enigo backend ───────────────────────────────────────────────

pub struct EnigoBackend {
    enigo: enigo::Enigo,
}

impl EnigoBackend {
    pub fn new() -> anyhow::Result<Self> {
        let enigo = enigo::Enigo::new(&enigo::Settings::default())
            .map_err(|e| anyhow::anyhow!("Failed to create Enigo instance: {:?}", e))?;
        Ok(Self { enigo })
    }
}

impl InputBackend for EnigoBackend {
    fn mouse_move(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        use enigo::{Coordinate, Mouse};
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| anyhow::anyhow!("move_mouse({x}, {y}): {e:?}"))
    }

    fn button(&mut self, button: MouseButton, dir: KeyDirection) -> anyhow::Result<()> {
        use enigo::Mouse;
        let button = match button {
            MouseButton::Left => enigo::Button::Left,
            MouseButton::Middle => enigo::Button::Middle,
            MouseButton::Right => enigo::Button::Right,
        };
        self.enigo
            .button(button, direction(dir))
            .map_err(|e| anyhow::anyhow!("button({button:?}): {e:?}"))
    }

    fn scroll(&mut self, amount: i32) -> anyhow::Result<()> {
        use enigo::{Axis, Mouse};
        // enigo counts positive lines downward; wheel deltas are the
        // opposite.
        self.enigo
            .scroll(-amount, Axis::Vertical)
            .map_err(|e| anyhow::anyhow!("scroll({amount}): {e:?}"))
    }

    fn text(&mut self, text: &str) -> anyhow::Result<()> {
        use enigo::Keyboard;
        self.enigo
            .text(text)
            .map_err(|e| anyhow::anyhow!("text: {e:?}"))
    }

    fn key(&mut self, name: &str, dir: KeyDirection) -> anyhow::Result<()> {
        use enigo::Keyboard;
        let key = map_key_name(name)
            .ok_or_else(|| anyhow::anyhow!("unknown key name: {name}"))?;
        self.enigo
            .key(key, direction(dir))
            .map_err(|e| anyhow::anyhow!("key({name}): {e:?}"))
    }
}

fn direction(dir: KeyDirection) -> enigo::Direction {
    match dir {
        KeyDirection::Press => enigo::Direction::Press,
        KeyDirection::Release => enigo::Direction::Release,
        KeyDirection::Tap => enigo::Direction::Click,
    }
}

/// Map a key name from the wire to an enigo `Key`.
fn map_key_name(name: &str) -> Option<enigo::Key> {
    use enigo::Key;

    let lower = name.trim().to_ascii_lowercase();
    let key = match lower.as_str() {
        "enter" | "return" => Key::Return,
        "backspace" => Key::Backspace,
        "tab" => Key::Tab,
        "escape" | "esc" => Key::Escape,
        "space" => Key::Space,
        "delete" | "del" => Key::Delete,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "ctrl" | "control" => Key::Control,
        "alt" => Key::Alt,
        "shift" => Key::Shift,
        "meta" | "win" | "super" | "cmd" => Key::Meta,
        "capslock" => Key::CapsLock,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => {
            let mut chars = lower.chars();
            let ch = chars.next()?;
            if chars.next().is_some() {
                tracing::debug!(name, "unmapped key name");
                return None;
            }
            Key::Unicode(ch)
        }
    };
    Some(key)
}

// ─── Injector ────────────────────────────────────────────────────

/// Interpolation steps for drag gestures.
const DRAG_STEPS: i32 = 8;

/// Pause between open-app steps while the OS search surface catches up.
const OPEN_APP_STEP_DELAY: std::time::Duration = std::time::Duration::from_millis(400);

pub struct InputInjector {
    backend: Box<dyn InputBackend>,
    /// Absolute position of the most recent click; `type` at (0,0)
    /// targets this instead of the window origin.
    last_click: Option<(i32, i32)>,
    /// Original geometry saved by adapt-phone, for restore.
    saved_rect: Option<(WindowHandle, Rect)>,
}

impl InputInjector {
    pub fn new(backend: Box<dyn InputBackend>) -> Self {
        Self {
            backend,
            last_click: None,
            saved_rect: None,
        }
    }

    /// Apply one command against the resolved target window.
    pub fn apply(
        &mut self,
        cmd: &ControlCommand,
        target: &TargetWindow,
        ws: &dyn WindowSystem,
    ) -> Result<(), AppError> {
        let ax = target.rect.left + cmd.x;
        let ay = target.rect.top + cmd.y;

        match cmd.action {
            CommandAction::Move => self.backend.mouse_move(ax, ay).map_err(inject_err),
            CommandAction::Click => self.click(ax, ay, MouseButton::Left),
            CommandAction::DoubleClick => {
                self.click(ax, ay, MouseButton::Left)?;
                self.backend
                    .button(MouseButton::Left, KeyDirection::Tap)
                    .map_err(inject_err)
            }
            CommandAction::RightClick => self.click(ax, ay, MouseButton::Right),
            CommandAction::MouseDown => {
                self.backend.mouse_move(ax, ay).map_err(inject_err)?;
                self.backend
                    .button(MouseButton::Left, KeyDirection::Press)
                    .map_err(inject_err)
            }
            CommandAction::MouseUp => self
                .backend
                .button(MouseButton::Left, KeyDirection::Release)
                .map_err(inject_err),
            CommandAction::Drag => self.drag(cmd, ax, ay),
            CommandAction::Scroll => {
                self.backend.mouse_move(ax, ay).map_err(inject_err)?;
                self.backend.scroll(cmd.scroll_amount()).map_err(inject_err)
            }
            CommandAction::Type => self.type_text(cmd, ax, ay),
            CommandAction::Key => {
                let name = cmd
                    .key
                    .as_deref()
                    .or(cmd.text.as_deref())
                    .ok_or_else(|| AppError::InjectionFailed("key command without key".into()))?;
                self.backend.key(name, KeyDirection::Tap).map_err(inject_err)
            }
            CommandAction::Hotkey => self.hotkey(cmd),
            CommandAction::CloseWindow => self.close_window(target, ws),
            CommandAction::AdaptPhone => self.adapt_phone(target, ws),
            CommandAction::ResizeWindow => self.resize_window(cmd, target, ws),
            CommandAction::RestoreWindow => self.restore_window(target, ws),
            _ => Err(AppError::InjectionFailed(format!(
                "not an input action: {:?}",
                cmd.action
            ))),
        }
    }

    fn click(&mut self, ax: i32, ay: i32, button: MouseButton) -> Result<(), AppError> {
        self.backend.mouse_move(ax, ay).map_err(inject_err)?;
        self.backend
            .button(button, KeyDirection::Tap)
            .map_err(inject_err)?;
        self.last_click = Some((ax, ay));
        Ok(())
    }

    fn drag(&mut self, cmd: &ControlCommand, ax: i32, ay: i32) -> Result<(), AppError> {
        let (dx, dy) = cmd
            .drag_delta()
            .ok_or_else(|| AppError::InjectionFailed("drag requires a dx,dy delta".into()))?;

        self.backend.mouse_move(ax, ay).map_err(inject_err)?;
        self.backend
            .button(MouseButton::Left, KeyDirection::Press)
            .map_err(inject_err)?;
        for step in 1..=DRAG_STEPS {
            let x = ax + dx * step / DRAG_STEPS;
            let y = ay + dy * step / DRAG_STEPS;
            self.backend.mouse_move(x, y).map_err(inject_err)?;
        }
        self.backend
            .button(MouseButton::Left, KeyDirection::Release)
            .map_err(inject_err)?;
        self.last_click = Some((ax + dx, ay + dy));
        Ok(())
    }

    /// Focus-follow typing: explicit coordinates click first; (0,0)
    /// reuses the last click position; no position at all types into
    /// whatever currently has focus.
    fn type_text(&mut self, cmd: &ControlCommand, ax: i32, ay: i32) -> Result<(), AppError> {
        let pos = if cmd.x == 0 && cmd.y == 0 {
            self.last_click
        } else {
            Some((ax, ay))
        };
        if let Some((px, py)) = pos {
            self.backend.mouse_move(px, py).map_err(inject_err)?;
            self.backend
                .button(MouseButton::Left, KeyDirection::Tap)
                .map_err(inject_err)?;
            self.last_click = Some((px, py));
        }

        let text = cmd.text.as_deref().unwrap_or_default();
        if text.is_empty() {
            return Ok(());
        }
        self.backend.text(text).map_err(inject_err)
    }

    fn hotkey(&mut self, cmd: &ControlCommand) -> Result<(), AppError> {
        let combo = cmd
            .text
            .as_deref()
            .ok_or_else(|| AppError::InjectionFailed("hotkey command without combo".into()))?;
        let parts: Vec<&str> = combo
            .split('+')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let (last, modifiers) = parts
            .split_last()
            .ok_or_else(|| AppError::InjectionFailed("empty hotkey combo".into()))?;

        for m in modifiers {
            self.backend.key(m, KeyDirection::Press).map_err(inject_err)?;
        }
        let result = self.backend.key(last, KeyDirection::Tap);
        // Modifiers are released even when the final key fails, so a
        // bad combo cannot leave Ctrl or Alt stuck down.
        for m in modifiers.iter().rev() {
            if let Err(e) = self.backend.key(m, KeyDirection::Release) {
                tracing::warn!(modifier = *m, error = %e, "modifier release failed");
            }
        }
        result.map_err(inject_err)
    }

    /// Launch an application by name through the OS search surface:
    /// meta key, type the name, enter. Needs no resolved target.
    pub fn open_app(&mut self, cmd: &ControlCommand) -> Result<(), AppError> {
        let name = cmd
            .text
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::InjectionFailed("open_app requires an app name".into()))?;

        tracing::info!(name, "launching application via search");
        self.backend.key("meta", KeyDirection::Tap).map_err(inject_err)?;
        std::thread::sleep(OPEN_APP_STEP_DELAY);
        self.backend.text(name).map_err(inject_err)?;
        std::thread::sleep(OPEN_APP_STEP_DELAY);
        self.backend.key("enter", KeyDirection::Tap).map_err(inject_err)
    }

    fn resize_window(
        &mut self,
        cmd: &ControlCommand,
        target: &TargetWindow,
        ws: &dyn WindowSystem,
    ) -> Result<(), AppError> {
        let (width, height) = cmd.dimensions().ok_or_else(|| {
            AppError::InjectionFailed("resize requires positive w,h dimensions".into())
        })?;
        tracing::info!(title = target.title.as_str(), width, height, "resizing window");
        let rect = Rect::new(target.rect.left, target.rect.top, width, height);
        ws.move_window(target.handle, rect).map_err(inject_err)
    }

    /// Destructive close: activate, verify the target is genuinely
    /// foreground, abort otherwise.
    fn close_window(
        &mut self,
        target: &TargetWindow,
        ws: &dyn WindowSystem,
    ) -> Result<(), AppError> {
        ws.activate(target.handle).map_err(inject_err)?;
        let foreground = ws.foreground_window().map(|w| w.handle);
        if foreground != Some(target.handle) {
            return Err(AppError::InjectionFailed(
                "close aborted: target failed foreground verification".into(),
            ));
        }
        tracing::info!(title = target.title.as_str(), "closing window");
        ws.close_window(target.handle).map_err(inject_err)
    }

    fn adapt_phone(
        &mut self,
        target: &TargetWindow,
        ws: &dyn WindowSystem,
    ) -> Result<(), AppError> {
        let (cx, cy) = target.rect.center();
        let work_area = ws.work_area_at(cx, cy);
        let new_rect = phone_rect(&work_area);

        match self.saved_rect {
            Some((handle, _)) if handle == target.handle => {}
            _ => self.saved_rect = Some((target.handle, target.rect)),
        }
        tracing::info!(
            title = target.title.as_str(),
            width = new_rect.width,
            height = new_rect.height,
            "adapting window to phone aspect"
        );
        ws.move_window(target.handle, new_rect).map_err(inject_err)
    }

    fn restore_window(
        &mut self,
        target: &TargetWindow,
        ws: &dyn WindowSystem,
    ) -> Result<(), AppError> {
        match self.saved_rect {
            Some((handle, rect)) if handle == target.handle => {
                self.saved_rect = None;
                ws.move_window(target.handle, rect).map_err(inject_err)
            }
            _ => Err(AppError::InjectionFailed(
                "no saved geometry for this window".into(),
            )),
        }
    }
}

fn inject_err(e: anyhow::Error) -> AppError {
    AppError::InjectionFailed(e.to_string())
}

/// Phone-like geometry within a monitor work area: landscape monitors
/// get a full-height right-aligned third; portrait monitors a
/// full-width bottom third.
fn phone_rect(work_area: &Rect) -> Rect {
    if work_area.width >= work_area.height {
        let width = work_area.width / 3;
        Rect::new(work_area.right() - width, work_area.top, width, work_area.height)
    } else {
        let height = work_area.height / 3;
        Rect::new(work_area.left, work_area.bottom() - height, work_area.width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Move(i32, i32),
        Button(MouseButton, KeyDirection),
        Scroll(i32),
        Text(String),
        Key(String, KeyDirection),
    }

    #[derive(Default)]
    struct RecordingBackend {
        ops: Arc<Mutex<Vec<Op>>>,
    }

    impl RecordingBackend {
        fn create() -> (Box<dyn InputBackend>, Arc<Mutex<Vec<Op>>>) {
            let ops = Arc::new(Mutex::new(Vec::new()));
            (Box::new(Self { ops: ops.clone() }), ops)
        }
    }

    impl InputBackend for RecordingBackend {
        fn mouse_move(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(Op::Move(x, y));
            Ok(())
        }
        fn button(&mut self, button: MouseButton, dir: KeyDirection) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(Op::Button(button, dir));
            Ok(())
        }
        fn scroll(&mut self, amount: i32) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(Op::Scroll(amount));
            Ok(())
        }
        fn text(&mut self, text: &str) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(Op::Text(text.to_string()));
            Ok(())
        }
        fn key(&mut self, name: &str, dir: KeyDirection) -> anyhow::Result<()> {
            self.ops.lock().unwrap().push(Op::Key(name.to_string(), dir));
            Ok(())
        }
    }

    struct MockWindows {
        foreground: Option<WindowHandle>,
        closed: Mutex<Vec<WindowHandle>>,
        moved: Mutex<Vec<(WindowHandle, Rect)>>,
        work_area: Rect,
    }

    impl MockWindows {
        fn new(foreground: Option<WindowHandle>) -> Self {
            Self {
                foreground,
                closed: Mutex::new(Vec::new()),
                moved: Mutex::new(Vec::new()),
                work_area: Rect::new(0, 0, 1920, 1040),
            }
        }
    }

    impl WindowSystem for MockWindows {
        fn list_windows(&self) -> Vec<TargetWindow> {
            Vec::new()
        }
        fn foreground_window(&self) -> Option<TargetWindow> {
            self.foreground.map(|handle| TargetWindow {
                title: "fg".into(),
                handle,
                rect: Rect::new(0, 0, 100, 100),
                foreground: true,
                minimized: false,
            })
        }
        fn activate(&self, _: WindowHandle) -> anyhow::Result<()> {
            Ok(())
        }
        fn move_window(&self, handle: WindowHandle, rect: Rect) -> anyhow::Result<()> {
            self.moved.lock().unwrap().push((handle, rect));
            Ok(())
        }
        fn close_window(&self, handle: WindowHandle) -> anyhow::Result<()> {
            self.closed.lock().unwrap().push(handle);
            Ok(())
        }
        fn work_area_at(&self, _: i32, _: i32) -> Rect {
            self.work_area
        }
    }

    fn target() -> TargetWindow {
        TargetWindow {
            title: "Editor".into(),
            handle: 7,
            rect: Rect::new(100, 200, 640, 480),
            foreground: true,
            minimized: false,
        }
    }

    fn cmd(action: CommandAction, x: i32, y: i32) -> ControlCommand {
        ControlCommand {
            action,
            x,
            y,
            text: None,
            key: None,
        }
    }

    #[test]
    fn test_click_maps_relative_to_absolute() {
        let (backend, ops) = RecordingBackend::create();
        let mut inj = InputInjector::new(backend);
        let ws = MockWindows::new(Some(7));
        inj.apply(&cmd(CommandAction::Click, 5, 5), &target(), &ws)
            .unwrap();
        assert_eq!(
            ops.lock().unwrap().as_slice(),
            &[
                Op::Move(105, 205),
                Op::Button(MouseButton::Left, KeyDirection::Tap)
            ]
        );
        assert_eq!(inj.last_click, Some((105, 205)));
    }

    #[test]
    fn test_type_at_origin_reuses_last_click() {
        let (backend, ops) = RecordingBackend::create();
        let mut inj = InputInjector::new(backend);
        let ws = MockWindows::new(Some(7));
        inj.apply(&cmd(CommandAction::Click, 50, 60), &target(), &ws)
            .unwrap();

        let mut type_cmd = cmd(CommandAction::Type, 0, 0);
        type_cmd.text = Some("hello".into());
        inj.apply(&type_cmd, &target(), &ws).unwrap();

        let ops = ops.lock().unwrap();
        // The type clicked at the previous click position, not (100,200).
        assert_eq!(ops[2], Op::Move(150, 260));
        assert_eq!(*ops.last().unwrap(), Op::Text("hello".into()));
    }

    #[test]
    fn test_type_without_any_position_skips_click() {
        let (backend, ops) = RecordingBackend::create();
        let mut inj = InputInjector::new(backend);
        let ws = MockWindows::new(Some(7));
        let mut type_cmd = cmd(CommandAction::Type, 0, 0);
        type_cmd.text = Some("raw".into());
        inj.apply(&type_cmd, &target(), &ws).unwrap();
        assert_eq!(ops.lock().unwrap().as_slice(), &[Op::Text("raw".into())]);
    }

    #[test]
    fn test_hotkey_releases_modifiers_in_reverse() {
        let (backend, ops) = RecordingBackend::create();
        let mut inj = InputInjector::new(backend);
        let ws = MockWindows::new(Some(7));
        let mut hot = cmd(CommandAction::Hotkey, 0, 0);
        hot.text = Some("ctrl+shift+a".into());
        inj.apply(&hot, &target(), &ws).unwrap();
        assert_eq!(
            ops.lock().unwrap().as_slice(),
            &[
                Op::Key("ctrl".into(), KeyDirection::Press),
                Op::Key("shift".into(), KeyDirection::Press),
                Op::Key("a".into(), KeyDirection::Tap),
                Op::Key("shift".into(), KeyDirection::Release),
                Op::Key("ctrl".into(), KeyDirection::Release),
            ]
        );
    }

    #[test]
    fn test_close_aborts_when_foreground_verification_fails() {
        let mut inj = InputInjector::new(RecordingBackend::create().0);
        // Foreground is a different window: close must not be issued.
        let ws = MockWindows::new(Some(99));
        let err = inj
            .apply(&cmd(CommandAction::CloseWindow, 0, 0), &target(), &ws)
            .unwrap_err();
        assert!(matches!(err, AppError::InjectionFailed(_)));
        assert!(ws.closed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_close_proceeds_when_verified() {
        let mut inj = InputInjector::new(RecordingBackend::create().0);
        let ws = MockWindows::new(Some(7));
        inj.apply(&cmd(CommandAction::CloseWindow, 0, 0), &target(), &ws)
            .unwrap();
        assert_eq!(ws.closed.lock().unwrap().as_slice(), &[7]);
    }

    #[test]
    fn test_open_app_drives_search_surface() {
        let (backend, ops) = RecordingBackend::create();
        let mut inj = InputInjector::new(backend);
        let mut open = cmd(CommandAction::OpenApp, 0, 0);
        open.text = Some("notepad".into());
        inj.open_app(&open).unwrap();
        assert_eq!(
            ops.lock().unwrap().as_slice(),
            &[
                Op::Key("meta".into(), KeyDirection::Tap),
                Op::Text("notepad".into()),
                Op::Key("enter".into(), KeyDirection::Tap),
            ]
        );
    }

    #[test]
    fn test_open_app_requires_name() {
        let mut inj = InputInjector::new(RecordingBackend::create().0);
        assert!(inj.open_app(&cmd(CommandAction::OpenApp, 0, 0)).is_err());
    }

    #[test]
    fn test_resize_window_keeps_top_left() {
        let mut inj = InputInjector::new(RecordingBackend::create().0);
        let ws = MockWindows::new(Some(7));
        let mut resize = cmd(CommandAction::ResizeWindow, 0, 0);
        resize.text = Some("800,600".into());
        inj.apply(&resize, &target(), &ws).unwrap();
        let moved = ws.moved.lock().unwrap();
        assert_eq!(moved[0], (7, Rect::new(100, 200, 800, 600)));
    }

    #[test]
    fn test_resize_window_rejects_degenerate_dimensions() {
        let mut inj = InputInjector::new(RecordingBackend::create().0);
        let ws = MockWindows::new(Some(7));
        let mut resize = cmd(CommandAction::ResizeWindow, 0, 0);
        resize.text = Some("0,600".into());
        assert!(inj.apply(&resize, &target(), &ws).is_err());
        assert!(ws.moved.lock().unwrap().is_empty());
    }

    #[test]
    fn test_adapt_phone_and_restore() {
        let mut inj = InputInjector::new(RecordingBackend::create().0);
        let ws = MockWindows::new(Some(7));
        let t = target();

        inj.apply(&cmd(CommandAction::AdaptPhone, 0, 0), &t, &ws)
            .unwrap();
        {
            let moved = ws.moved.lock().unwrap();
            // Landscape work area 1920x1040: right-aligned third.
            assert_eq!(moved[0], (7, Rect::new(1280, 0, 640, 1040)));
        }

        inj.apply(&cmd(CommandAction::RestoreWindow, 0, 0), &t, &ws)
            .unwrap();
        let moved = ws.moved.lock().unwrap();
        assert_eq!(moved[1], (7, t.rect));
    }

    #[test]
    fn test_restore_without_save_fails() {
        let mut inj = InputInjector::new(RecordingBackend::create().0);
        let ws = MockWindows::new(Some(7));
        assert!(inj
            .apply(&cmd(CommandAction::RestoreWindow, 0, 0), &target(), &ws)
            .is_err());
    }

    #[test]
    fn test_phone_rect_portrait_monitor() {
        let r = phone_rect(&Rect::new(0, 0, 1080, 1920));
        assert_eq!(r, Rect::new(0, 1280, 1080, 640));
    }

    #[test]
    fn test_map_key_names() {
        assert!(map_key_name("Enter").is_some());
        assert!(map_key_name("ctrl").is_some());
        assert!(map_key_name("F5").is_some());
        assert!(map_key_name("a").is_some());
        assert!(map_key_name("definitely-not-a-key").is_none());
    }
}
