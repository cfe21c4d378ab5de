// X11 integration module
// Connection setup, the transparency visual, window creation, and the
// EWMH hints that keep the window borderless and on top.

use crate::layout::Layout;
use log::debug;
use thiserror::Error;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ColormapAlloc, ConfigureWindowAux, ConnectionExt,
    CreateWindowAux, Depth, EventMask, PropMode, Screen, Visualid, Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;
// change_property8/32 live on the wrapper trait, not the xproto one.
use x11rb::wrapper::ConnectionExt as _;

/// Pixel depth required for true per-pixel transparency.
pub const ALPHA_DEPTH: u8 = 32;

/// _NET_WM_DESKTOP sentinel meaning "all desktops".
const ALL_DESKTOPS: u32 = u32::MAX;

x11rb::atom_manager! {
    /// The EWMH atoms the window needs, interned in a single batch: all
    /// lookup requests go out before any reply is collected.
    Atoms: AtomsCookie {
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_WM_STATE,
        _NET_WM_STATE_ABOVE,
        _NET_WM_DESKTOP,
    }
}

/// Startup failures. All of them are fatal and share exit status 1;
/// they differ only in their message.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("couldn't connect to X")]
    Connection(#[source] ConnectError),
    #[error("couldn't find the screen")]
    ScreenNotFound,
    #[error("transparency support not found")]
    NoTransparencyVisual,
    #[error("couldn't create the window")]
    WindowCreation(#[source] ReplyOrIdError),
    #[error("failed to find atoms")]
    AtomResolution(#[source] ReplyError),
    #[error("lost connection to X")]
    Io(#[from] ConnectionError),
}

/// Connection, screen and visual, opened once at startup and passed by
/// reference to every component that talks to the display.
pub struct DisplaySession {
    pub conn: RustConnection,
    pub screen: Screen,
    pub visual_id: Visualid,
}

impl DisplaySession {
    /// Connect to the default display, take its default screen and find a
    /// visual with an alpha channel. There is no fallback to an opaque
    /// visual: without transparency the overlay is pointless.
    pub fn open() -> Result<Self, SetupError> {
        let (conn, screen_num) = x11rb::connect(None).map_err(SetupError::Connection)?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .cloned()
            .ok_or(SetupError::ScreenNotFound)?;
        let visual_id =
            alpha_visual(&screen.allowed_depths).ok_or(SetupError::NoTransparencyVisual)?;
        debug!(
            "connected: screen {} ({}x{}), visual 0x{:x}",
            screen_num, screen.width_in_pixels, screen.height_in_pixels, visual_id
        );
        Ok(Self {
            conn,
            screen,
            visual_id,
        })
    }
}

/// First visual of the first depth-32 entry, in server-provided order.
fn alpha_visual(depths: &[Depth]) -> Option<Visualid> {
    depths
        .iter()
        .find(|depth| depth.depth == ALPHA_DEPTH)
        .and_then(|depth| depth.visuals.first())
        .map(|visual| visual.visual_id)
}

/// Create the overlay window. The default colormap cannot represent the
/// alpha visual, so a dedicated one is allocated for the window and its id
/// freed again right after creation; the window keeps its own server-side
/// reference to the colormap.
pub fn create_window(
    session: &DisplaySession,
    layout: Layout,
    override_redirect: bool,
) -> Result<Window, SetupError> {
    let conn = &session.conn;

    let colormap = conn.generate_id().map_err(SetupError::WindowCreation)?;
    conn.create_colormap(
        ColormapAlloc::NONE,
        colormap,
        session.screen.root,
        session.visual_id,
    )?;

    let window = conn.generate_id().map_err(SetupError::WindowCreation)?;
    let aux = CreateWindowAux::new()
        .background_pixel(0)
        .border_pixel(0)
        .override_redirect(u32::from(override_redirect))
        .event_mask(EventMask::EXPOSURE | EventMask::BUTTON_PRESS)
        .colormap(colormap);
    conn.create_window(
        ALPHA_DEPTH,
        window,
        session.screen.root,
        layout.x,
        layout.y,
        layout.width,
        layout.height,
        0,
        WindowClass::INPUT_OUTPUT,
        session.visual_id,
        &aux,
    )?
    .check()
    .map_err(|e| SetupError::WindowCreation(e.into()))?;

    conn.free_colormap(colormap)?;

    debug!("created window 0x{:08x}", window);
    Ok(window)
}

/// Stamp the window-manager hints onto the window, map it if requested and
/// reassert its position. Everything here is a one-way request; the final
/// flush makes sure it all reaches the server before the event loop starts.
pub fn apply_hints(
    session: &DisplaySession,
    window: Window,
    layout: Layout,
    title: &str,
    should_map: bool,
) -> Result<(), SetupError> {
    let conn = &session.conn;

    let atoms = Atoms::new(conn)?
        .reply()
        .map_err(SetupError::AtomResolution)?;

    // Dock type: no decoration or placement on compliant window managers.
    conn.change_property32(
        PropMode::REPLACE,
        window,
        atoms._NET_WM_WINDOW_TYPE,
        AtomEnum::ATOM,
        &[atoms._NET_WM_WINDOW_TYPE_DOCK],
    )?;
    // Keep the window on top of the stacking order.
    conn.change_property32(
        PropMode::APPEND,
        window,
        atoms._NET_WM_STATE,
        AtomEnum::ATOM,
        &[atoms._NET_WM_STATE_ABOVE],
    )?;
    // Stay visible across virtual desktop switches.
    conn.change_property32(
        PropMode::REPLACE,
        window,
        atoms._NET_WM_DESKTOP,
        AtomEnum::CARDINAL,
        &[ALL_DESKTOPS],
    )?;
    conn.change_property8(
        PropMode::REPLACE,
        window,
        AtomEnum::WM_NAME,
        AtomEnum::STRING,
        title.as_bytes(),
    )?;

    // Window managers that ignore the hints above still honour
    // override-redirect, so force it at the attribute level too.
    conn.change_window_attributes(
        window,
        &ChangeWindowAttributesAux::new().override_redirect(1),
    )?;

    if should_map {
        conn.map_window(window)?;
    }

    // Some window managers move windows right after mapping them; reassert
    // the requested position.
    conn.configure_window(
        window,
        &ConfigureWindowAux::new()
            .x(i32::from(layout.x))
            .y(i32::from(layout.y)),
    )?;

    conn.flush()?;
    Ok(())
}
