// Rendering module
// Uploads the decoded pixels to a server-side pixmap once; every redraw is
// a full copy of that pixmap onto the window.

use crate::image_loader::ImageData;
use crate::x11::{DisplaySession, ALPHA_DEPTH};
use anyhow::{Context, Result};
use log::debug;
use std::borrow::Cow;
use x11rb::connection::Connection;
use x11rb::image::{BitsPerPixel, Image, ImageOrder, ScanlinePad};
use x11rb::protocol::xproto::{ConnectionExt, CreateGCAux, Gcontext, Pixmap, Window};

/// A drawing surface bound to the window.
pub struct Canvas {
    window: Window,
    pixmap: Pixmap,
    gc: Gcontext,
    width: u16,
    height: u16,
}

impl Canvas {
    /// Bind a surface to the window and upload the image pixels. Scaling
    /// already happened at load time, so the pixmap holds exactly what each
    /// redraw paints.
    pub fn new(session: &DisplaySession, window: Window, image: &ImageData) -> Result<Self> {
        let conn = &session.conn;
        let width = image.width as u16;
        let height = image.height as u16;

        let pixmap = conn.generate_id().context("failed to allocate a pixmap id")?;
        conn.create_pixmap(ALPHA_DEPTH, pixmap, window, width, height)?;

        let gc = conn.generate_id().context("failed to allocate a gc id")?;
        conn.create_gc(gc, pixmap, &CreateGCAux::new().graphics_exposures(0))?;

        // The loader produces BGRA bytes, i.e. ARGB for a little-endian
        // server. `native` reorders for big-endian servers and `put` splits
        // the transfer across requests when the image exceeds the server's
        // maximum request length.
        let upload = wire_image(image)?;
        upload
            .native(conn.setup())
            .context("failed to convert the image to the server format")?
            .put(conn, pixmap, gc, 0, 0)?;
        conn.flush()?;

        debug!("uploaded {}x{} pixels to pixmap 0x{:08x}", width, height, pixmap);
        Ok(Self {
            window,
            pixmap,
            gc,
            width,
            height,
        })
    }

    /// Repaint the whole window from the pixmap. Idempotent: the pixmap
    /// never changes, so this is safe on every expose event, including
    /// partial ones; there is no damage tracking.
    pub fn redraw(&self, session: &DisplaySession) -> Result<()> {
        session.conn.copy_area(
            self.pixmap,
            self.window,
            self.gc,
            0,
            0,
            0,
            0,
            self.width,
            self.height,
        )?;
        session.conn.flush()?;
        Ok(())
    }
}

/// Wrap the loader's pixel buffer as a wire image: 32 bits per pixel,
/// 32-bit scanline padding, little-endian byte order.
fn wire_image(image: &ImageData) -> Result<Image<'_>> {
    Image::new(
        image.width as u16,
        image.height as u16,
        ScanlinePad::Pad32,
        ALPHA_DEPTH,
        BitsPerPixel::B32,
        ImageOrder::LsbFirst,
        Cow::Borrowed(&image.pixels[..]),
    )
    .context("pixel buffer does not match the image dimensions")
}
