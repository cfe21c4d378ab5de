// n30f - display an image in a borderless, transparent, non-wm-managed X11 window

mod cli;
mod events;
mod image_loader;
mod layout;
mod renderer;
mod x11;

use anyhow::{Context, Result};
use log::info;
use std::io::Write;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let opts = cli::parse_args()?;

    let image = image_loader::load_image(&opts.file, opts.scale)?;
    info!(
        "image loaded: {}x{} pixels (scale {})",
        image.natural_width, image.natural_height, opts.scale
    );

    let session = x11::DisplaySession::open()?;
    let layout = layout::Layout::compute(
        opts.x,
        opts.y,
        opts.bottom,
        &image,
        session.screen.height_in_pixels,
    );

    let window = x11::create_window(&session, layout, opts.ignored)?;
    let canvas = renderer::Canvas::new(&session, window, &image)?;
    x11::apply_hints(&session, window, layout, &opts.title, !opts.unmapped)?;

    if opts.print {
        println!("0x{:08x}", window);
        std::io::stdout().flush().context("failed to flush stdout")?;
    }

    if opts.daemonise {
        daemonise()?;
    }

    let mut spawner = events::ShellSpawner;
    events::run_event_loop(&session, &canvas, opts.command.as_deref(), &mut spawner)
}

/// Detach from the controlling terminal, keeping the current working
/// directory and redirecting stdio to /dev/null. Runs only after the window
/// is up and its id has been printed.
fn daemonise() -> Result<()> {
    // SAFETY: plain daemon(3); the process is still single-threaded here.
    let rc = unsafe { libc::daemon(1, 0) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error()).context("failed to daemonise");
    }
    Ok(())
}
