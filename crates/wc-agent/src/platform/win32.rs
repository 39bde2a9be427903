//! Windows implementations: window enumeration/control plus the four
//! capture backends (DXGI desktop duplication, GDI region grab,
//! compositor PrintWindow, legacy window-DC blit).
//!
//! All unsafe FFI is confined to this module.

use windows::core::Interface;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAPPED_SUBRESOURCE,
    D3D11_MAP_READ, D3D11_SDK_VERSION, D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_SAMPLE_DESC};
use windows::Win32::Graphics::Dxgi::{
    IDXGIDevice, IDXGIOutput, IDXGIOutput1, IDXGIOutputDuplication,
    DXGI_ERROR_WAIT_TIMEOUT, DXGI_OUTDUPL_FRAME_INFO,
};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC,
    GetDIBits, GetMonitorInfoW, GetWindowDC, MonitorFromPoint, ReleaseDC, SelectObject,
    BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HDC, MONITORINFO,
    MONITOR_DEFAULTTONEAREST, SRCCOPY,
};
use windows::Win32::Storage::Xps::{PrintWindow, PRINT_WINDOW_FLAGS};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::AttachThreadInput;
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, EnumWindows, GetForegroundWindow, GetWindowRect, GetWindowTextW,
    GetWindowThreadProcessId, IsIconic, IsWindowVisible, MoveWindow, PostMessageW,
    SetForegroundWindow, ShowWindow, SW_RESTORE, WM_CLOSE,
};

use crate::capture::{
    CaptureBackend, CaptureError, CaptureMode, CaptureRequest, EngineKind, Frame, PixelFormat,
};
use crate::window::{Rect, TargetWindow, WindowHandle, WindowSystem};

/// Render the full window content even when layered/occluded
/// (PW_RENDERFULLCONTENT, absent from the generated bindings).
const PW_RENDERFULLCONTENT: PRINT_WINDOW_FLAGS = PRINT_WINDOW_FLAGS(2);

/// AcquireNextFrame timeout for the polling sub-mode.
const POLL_TIMEOUT_MS: u32 = 50;

fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle as *mut core::ffi::c_void)
}

// ─── Window system ───────────────────────────────────────────────

pub struct Win32WindowSystem;

impl Win32WindowSystem {
    pub fn new() -> Self {
        Self
    }
}

fn window_title(handle: HWND) -> String {
    let mut buf = [0u16; 512];
    let len = unsafe { GetWindowTextW(handle, &mut buf) };
    if len <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buf[..len as usize])
}

fn window_rect(handle: HWND) -> Rect {
    let mut rect = RECT::default();
    if unsafe { GetWindowRect(handle, &mut rect) }.is_err() {
        return Rect::new(0, 0, 0, 0);
    }
    Rect::new(
        rect.left,
        rect.top,
        rect.right - rect.left,
        rect.bottom - rect.top,
    )
}

fn describe_window(handle: HWND, foreground: HWND) -> TargetWindow {
    TargetWindow {
        title: window_title(handle),
        handle: handle.0 as isize,
        rect: window_rect(handle),
        foreground: handle == foreground,
        minimized: unsafe { IsIconic(handle) }.as_bool(),
    }
}

unsafe extern "system" fn enum_proc(handle: HWND, lparam: LPARAM) -> BOOL {
    let out = &mut *(lparam.0 as *mut Vec<TargetWindow>);
    if IsWindowVisible(handle).as_bool() {
        let title = window_title(handle);
        if !title.is_empty() {
            out.push(describe_window(handle, GetForegroundWindow()));
        }
    }
    BOOL(1)
}

impl WindowSystem for Win32WindowSystem {
    fn list_windows(&self) -> Vec<TargetWindow> {
        let mut out: Vec<TargetWindow> = Vec::new();
        let result =
            unsafe { EnumWindows(Some(enum_proc), LPARAM(&mut out as *mut _ as isize)) };
        if let Err(e) = result {
            tracing::warn!(error = %e, "EnumWindows failed");
        }
        out
    }

    fn foreground_window(&self) -> Option<TargetWindow> {
        let handle = unsafe { GetForegroundWindow() };
        if handle.is_invalid() {
            return None;
        }
        Some(describe_window(handle, handle))
    }

    fn activate(&self, handle: WindowHandle) -> anyhow::Result<()> {
        let target = hwnd(handle);
        unsafe {
            if IsIconic(target).as_bool() {
                let _ = ShowWindow(target, SW_RESTORE);
            }

            // Attaching to the foreground thread's input queue lifts
            // the SetForegroundWindow restriction for background
            // processes.
            let foreground = GetForegroundWindow();
            let fg_thread = GetWindowThreadProcessId(foreground, None);
            let own_thread = GetCurrentThreadId();
            let attached = fg_thread != 0
                && fg_thread != own_thread
                && AttachThreadInput(own_thread, fg_thread, BOOL::from(true)).as_bool();

            let raised = SetForegroundWindow(target).as_bool();
            let _ = BringWindowToTop(target);

            if attached {
                let _ = AttachThreadInput(own_thread, fg_thread, BOOL::from(false));
            }

            if raised {
                Ok(())
            } else {
                Err(anyhow::anyhow!("SetForegroundWindow failed"))
            }
        }
    }

    fn move_window(&self, handle: WindowHandle, rect: Rect) -> anyhow::Result<()> {
        unsafe {
            MoveWindow(hwnd(handle), rect.left, rect.top, rect.width, rect.height, BOOL::from(true))
                .map_err(|e| anyhow::anyhow!("MoveWindow failed: {e}"))
        }
    }

    fn close_window(&self, handle: WindowHandle) -> anyhow::Result<()> {
        unsafe {
            PostMessageW(hwnd(handle), WM_CLOSE, WPARAM(0), LPARAM(0))
                .map_err(|e| anyhow::anyhow!("WM_CLOSE post failed: {e}"))
        }
    }

    fn work_area_at(&self, x: i32, y: i32) -> Rect {
        let monitor = unsafe { MonitorFromPoint(POINT { x, y }, MONITOR_DEFAULTTONEAREST) };
        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
            let work = info.rcWork;
            Rect::new(
                work.left,
                work.top,
                work.right - work.left,
                work.bottom - work.top,
            )
        } else {
            Rect::new(0, 0, 0, 0)
        }
    }
}

// ─── Backend registry ────────────────────────────────────────────

pub fn capture_backends() -> Vec<Box<dyn CaptureBackend>> {
    let mut backends: Vec<Box<dyn CaptureBackend>> = Vec::new();
    match DuplicationBackend::new() {
        Ok(backend) => backends.push(Box::new(backend)),
        Err(e) => tracing::warn!(error = %e, "duplication backend unavailable"),
    }
    backends.push(Box::new(RegionBackend));
    backends.push(Box::new(CompositorBackend));
    backends.push(Box::new(BitmapBackend));
    backends
}

// ─── DXGI duplication backend ────────────────────────────────────

/// Desktop duplication of the primary output. Fast but confined to one
/// monitor; the selector bounds-checks against [`surface`] before
/// calling in.
pub struct DuplicationBackend {
    surface: Rect,
    width: u32,
    height: u32,
    _device: ID3D11Device,
    context: ID3D11DeviceContext,
    duplication: IDXGIOutputDuplication,
    staging: ID3D11Texture2D,
}

impl DuplicationBackend {
    pub fn new() -> Result<Self, CaptureError> {
        unsafe { Self::init() }
    }

    unsafe fn init() -> Result<Self, CaptureError> {
        let backend_err = |msg: String| CaptureError::Unavailable(msg);

        let mut device = None;
        let mut context = None;
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )
        .map_err(|e| backend_err(format!("D3D11CreateDevice failed: {e}")))?;

        let device = device.ok_or_else(|| backend_err("D3D11 device is None".into()))?;
        let context = context.ok_or_else(|| backend_err("D3D11 context is None".into()))?;

        let dxgi_device: IDXGIDevice = device
            .cast()
            .map_err(|e| backend_err(format!("cast to IDXGIDevice failed: {e}")))?;
        let adapter = dxgi_device
            .GetAdapter()
            .map_err(|e| backend_err(format!("GetAdapter failed: {e}")))?;
        let output: IDXGIOutput = adapter
            .EnumOutputs(0)
            .map_err(|e| backend_err(format!("EnumOutputs(0) failed: {e}")))?;

        let output_desc = output
            .GetDesc()
            .map_err(|e| backend_err(format!("output GetDesc failed: {e}")))?;
        let coords = output_desc.DesktopCoordinates;
        let surface = Rect::new(
            coords.left,
            coords.top,
            coords.right - coords.left,
            coords.bottom - coords.top,
        );

        let output1: IDXGIOutput1 = output
            .cast()
            .map_err(|e| backend_err(format!("cast to IDXGIOutput1 failed: {e}")))?;
        let duplication = output1
            .DuplicateOutput(&device)
            .map_err(|e| backend_err(format!("DuplicateOutput failed: {e}")))?;

        let dup_desc = duplication.GetDesc();
        let width = dup_desc.ModeDesc.Width;
        let height = dup_desc.ModeDesc.Height;

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: width,
            Height: height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT_B8G8R8A8_UNORM,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_STAGING,
            BindFlags: 0,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: 0,
        };
        let mut staging = None;
        device
            .CreateTexture2D(&staging_desc, None, Some(&mut staging))
            .map_err(|e| backend_err(format!("CreateTexture2D failed: {e}")))?;
        let staging = staging.ok_or_else(|| backend_err("staging texture is None".into()))?;

        tracing::info!(
            width,
            height,
            left = surface.left,
            top = surface.top,
            "duplication backend initialized"
        );

        Ok(Self {
            surface,
            width,
            height,
            _device: device,
            context,
            duplication,
            staging,
        })
    }

    /// Copy the next desktop frame into the staging texture and crop
    /// `rect` (desktop coordinates) out of it as packed BGRA.
    unsafe fn grab(&mut self, rect: &Rect, timeout_ms: u32) -> Result<Vec<u8>, CaptureError> {
        let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource = None;

        match self
            .duplication
            .AcquireNextFrame(timeout_ms, &mut frame_info, &mut resource)
        {
            Ok(()) => {}
            Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => {
                return Err(CaptureError::NoNewFrame);
            }
            Err(e) => {
                return Err(CaptureError::Backend(format!("AcquireNextFrame failed: {e}")));
            }
        }

        let resource = match resource {
            Some(r) => r,
            None => {
                let _ = self.duplication.ReleaseFrame();
                return Err(CaptureError::Backend("acquired resource is None".into()));
            }
        };
        let texture: ID3D11Texture2D = match resource.cast() {
            Ok(t) => t,
            Err(e) => {
                let _ = self.duplication.ReleaseFrame();
                return Err(CaptureError::Backend(format!(
                    "cast to ID3D11Texture2D failed: {e}"
                )));
            }
        };

        self.context.CopyResource(&self.staging, &texture);
        let _ = self.duplication.ReleaseFrame();

        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        self.context
            .Map(&self.staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
            .map_err(|e| CaptureError::Backend(format!("Map failed: {e}")))?;

        let stride = mapped.RowPitch as usize;
        let src = std::slice::from_raw_parts(
            mapped.pData as *const u8,
            stride * self.height as usize,
        );

        // Crop in surface-local coordinates.
        let x0 = (rect.left - self.surface.left) as usize;
        let y0 = (rect.top - self.surface.top) as usize;
        let w = rect.width as usize;
        let h = rect.height as usize;
        let mut out = Vec::with_capacity(w * h * 4);
        for row in 0..h {
            let start = (y0 + row) * stride + x0 * 4;
            out.extend_from_slice(&src[start..start + w * 4]);
        }

        self.context.Unmap(&self.staging, 0);
        Ok(out)
    }
}

impl CaptureBackend for DuplicationBackend {
    fn kind(&self) -> EngineKind {
        EngineKind::Duplication
    }

    fn surface(&self) -> Option<Rect> {
        Some(self.surface)
    }

    fn capture(&mut self, req: &CaptureRequest, mode: CaptureMode) -> Result<Frame, CaptureError> {
        // Streaming sub-mode never waits; polling gives the compositor
        // a short window to publish a frame.
        let timeout = match mode {
            CaptureMode::Fast => 0,
            CaptureMode::Default => POLL_TIMEOUT_MS,
        };
        let bgra = unsafe { self.grab(&req.rect, timeout) }?;

        let frame = Frame {
            data: bgra,
            width: req.rect.width as u32,
            height: req.rect.height as u32,
            format: PixelFormat::Bgra8,
        };
        Ok(frame)
    }
}

// ─── GDI helpers ─────────────────────────────────────────────────

/// A memory DC plus bitmap sized for one capture, with RAII cleanup.
struct GdiCanvas {
    source: HDC,
    /// Window owning `source`, or None for the screen DC.
    owner: Option<HWND>,
    memory: HDC,
    bitmap: HBITMAP,
    width: i32,
    height: i32,
}

impl GdiCanvas {
    fn new(owner: Option<HWND>, width: i32, height: i32) -> Result<Self, CaptureError> {
        unsafe {
            let source = match owner {
                Some(handle) => GetWindowDC(handle),
                None => GetDC(None),
            };
            if source.is_invalid() {
                return Err(CaptureError::Backend("source DC unavailable".into()));
            }
            let memory = CreateCompatibleDC(source);
            let bitmap = CreateCompatibleBitmap(source, width, height);
            SelectObject(memory, bitmap);
            Ok(Self {
                source,
                owner,
                memory,
                bitmap,
                width,
                height,
            })
        }
    }

    /// Read the memory bitmap as packed top-down BGRA.
    fn read_pixels(&self) -> Result<Vec<u8>, CaptureError> {
        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: self.width,
                // Negative height requests a top-down DIB.
                biHeight: -self.height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut data = vec![0u8; self.width as usize * self.height as usize * 4];
        let rows = unsafe {
            GetDIBits(
                self.memory,
                self.bitmap,
                0,
                self.height as u32,
                Some(data.as_mut_ptr() as *mut core::ffi::c_void),
                &mut info,
                DIB_RGB_COLORS,
            )
        };
        if rows <= 0 {
            return Err(CaptureError::Backend("GetDIBits failed".into()));
        }
        Ok(data)
    }

    fn frame(&self) -> Result<Frame, CaptureError> {
        Ok(Frame {
            data: self.read_pixels()?,
            width: self.width as u32,
            height: self.height as u32,
            format: PixelFormat::Bgra8,
        })
    }
}

impl Drop for GdiCanvas {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.bitmap);
            let _ = DeleteDC(self.memory);
            let _ = ReleaseDC(self.owner, self.source);
        }
    }
}

// ─── Region-grab backend ─────────────────────────────────────────

/// Screen-DC BitBlt of an arbitrary desktop rectangle. Crosses monitor
/// boundaries but cannot see occluded content.
pub struct RegionBackend;

impl CaptureBackend for RegionBackend {
    fn kind(&self) -> EngineKind {
        EngineKind::Region
    }

    fn capture(&mut self, req: &CaptureRequest, _: CaptureMode) -> Result<Frame, CaptureError> {
        let canvas = GdiCanvas::new(None, req.rect.width, req.rect.height)?;
        unsafe {
            BitBlt(
                canvas.memory,
                0,
                0,
                req.rect.width,
                req.rect.height,
                canvas.source,
                req.rect.left,
                req.rect.top,
                SRCCOPY,
            )
            .map_err(|e| CaptureError::Backend(format!("BitBlt failed: {e}")))?;
        }
        canvas.frame()
    }
}

// ─── Compositor backend ──────────────────────────────────────────

/// PrintWindow with full-content rendering: slower, but captures
/// windows occluded by the client's own display surface.
pub struct CompositorBackend;

impl CaptureBackend for CompositorBackend {
    fn kind(&self) -> EngineKind {
        EngineKind::Compositor
    }

    fn capture(&mut self, req: &CaptureRequest, _: CaptureMode) -> Result<Frame, CaptureError> {
        let target = hwnd(req.handle);
        let canvas = GdiCanvas::new(None, req.rect.width, req.rect.height)?;
        let rendered = unsafe { PrintWindow(target, canvas.memory, PW_RENDERFULLCONTENT) };
        if !rendered.as_bool() {
            return Err(CaptureError::Backend("PrintWindow failed".into()));
        }
        canvas.frame()
    }
}

// ─── Legacy bitmap backend ───────────────────────────────────────

/// Window-DC BitBlt. Works when occluded but silently produces black
/// frames for some window classes; the selector validates luminance.
pub struct BitmapBackend;

impl CaptureBackend for BitmapBackend {
    fn kind(&self) -> EngineKind {
        EngineKind::Bitmap
    }

    fn capture(&mut self, req: &CaptureRequest, _: CaptureMode) -> Result<Frame, CaptureError> {
        let target = hwnd(req.handle);
        let canvas = GdiCanvas::new(Some(target), req.rect.width, req.rect.height)?;
        unsafe {
            BitBlt(
                canvas.memory,
                0,
                0,
                req.rect.width,
                req.rect.height,
                canvas.source,
                0,
                0,
                SRCCOPY,
            )
            .map_err(|e| CaptureError::Backend(format!("window BitBlt failed: {e}")))?;
        }
        canvas.frame()
    }
}
