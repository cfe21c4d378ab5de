// Command line interface module
// Handles parsing and post-processing of command line arguments

use anyhow::{bail, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use std::process;

/// n30f - display an image in a borderless, transparent, non-wm-managed window
#[derive(Parser, Debug)]
#[command(name = "n30f")]
#[command(about, long_about = None)]
struct Args {
    /// Path to the image file
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Set the x position
    #[arg(short = 'x', default_value_t = 0, allow_negative_numbers = true)]
    x: i32,

    /// Set the y position
    #[arg(short = 'y', default_value_t = 0, allow_negative_numbers = true)]
    y: i32,

    /// Set the image scaling
    #[arg(short = 's', default_value_t = 1.0)]
    scale: f64,

    /// Put the window at the bottom of the screen
    #[arg(short = 'b', long)]
    bottom: bool,

    /// Force the window to be ignored for non-EWMH window managers
    #[arg(short = 'i', long)]
    ignored: bool,

    /// Run daemonised
    #[arg(short = 'd', long)]
    daemonise: bool,

    /// Set the command to run on click
    #[arg(short = 'c', long, value_name = "COMMAND")]
    command: Option<String>,

    /// Set the window title
    #[arg(short = 't', long, default_value = "n30f")]
    title: String,

    /// Start with the window unmapped (hidden)
    #[arg(short = 'u', long)]
    unmapped: bool,

    /// Print the window id to stdout after starting
    #[arg(short = 'p', long)]
    print: bool,
}

/// Arguments after post-parse resolution
#[derive(Debug)]
pub struct Options {
    pub file: PathBuf,
    pub x: i32,
    pub y: i32,
    pub scale: f64,
    pub bottom: bool,
    pub ignored: bool,
    pub daemonise: bool,
    /// Click command with the detaching " &" suffix already appended
    pub command: Option<String>,
    pub title: String,
    pub unmapped: bool,
    pub print: bool,
}

/// Parse command line arguments. Help and usage errors never return:
/// help exits 0, anything else clap rejects exits 1.
pub fn parse_args() -> Result<Options> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };
    resolve(args)
}

fn resolve(args: Args) -> Result<Options> {
    let mut files = args.files;
    if files.is_empty() {
        bail!("no file specified");
    }
    if files.len() > 1 {
        println!("warning: unexpected argument");
    }
    let file = files.swap_remove(0);

    // The suffix backgrounds the command inside the shell so the spawned
    // shell exits immediately and the event loop never blocks on it.
    let command = args.command.map(|c| format!("{} &", c));

    Ok(Options {
        file,
        x: args.x,
        y: args.y,
        scale: args.scale,
        bottom: args.bottom,
        ignored: args.ignored,
        daemonise: args.daemonise,
        command,
        title: args.title,
        unmapped: args.unmapped,
        print: args.print,
    })
}
