// Event dispatch module
// Blocks on the X connection and reacts to exposes and button presses.

use crate::renderer::Canvas;
use crate::x11::DisplaySession;
use anyhow::{Context, Result};
use log::debug;
use std::process::Command;
use x11rb::connection::Connection;
use x11rb::protocol::Event;

/// What the loop does in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reaction {
    Redraw,
    RunCommand,
    Ignore,
}

fn classify(event: &Event) -> Reaction {
    match event {
        Event::Expose(_) => Reaction::Redraw,
        Event::ButtonPress(_) => Reaction::RunCommand,
        _ => Reaction::Ignore,
    }
}

/// Launches the click command without waiting on it. A trait so tests can
/// record invocations instead of touching a real shell.
pub trait CommandSpawner {
    fn spawn(&mut self, command: &str);
}

/// Runs the command through the shell. The " &" suffix appended at parse
/// time backgrounds the real work, so the shell itself exits immediately;
/// waiting on it reaps the process table entry without blocking the event
/// loop. The exit status is discarded.
pub struct ShellSpawner;

impl CommandSpawner for ShellSpawner {
    fn spawn(&mut self, command: &str) {
        match Command::new("sh").arg("-c").arg(command).spawn() {
            Ok(mut child) => {
                let _ = child.wait();
                debug!("spawned click command: {}", command);
            }
            Err(e) => debug!("failed to spawn click command: {}", e),
        }
    }
}

/// Classify one event and run the click command if it asks for one. Every
/// button press spawns a fresh command; there is no debounce and no cap on
/// how many children may be running at once.
fn dispatch(event: &Event, command: Option<&str>, spawner: &mut impl CommandSpawner) -> Reaction {
    let reaction = classify(event);
    if reaction == Reaction::RunCommand {
        if let Some(command) = command {
            spawner.spawn(command);
        }
    }
    reaction
}

/// Block on the event queue until the connection dies. Exposes repaint the
/// window; button presses run the click command, if one is configured.
pub fn run_event_loop(
    session: &DisplaySession,
    canvas: &Canvas,
    command: Option<&str>,
    spawner: &mut impl CommandSpawner,
) -> Result<()> {
    loop {
        let event = session
            .conn
            .wait_for_event()
            .context("lost connection to X")?;
        if dispatch(&event, command, spawner) == Reaction::Redraw {
            canvas.redraw(session)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{ButtonPressEvent, ExposeEvent, KeyButMask, MapNotifyEvent};

    #[derive(Default)]
    struct RecordingSpawner {
        commands: Vec<String>,
    }

    impl CommandSpawner for RecordingSpawner {
        fn spawn(&mut self, command: &str) {
            self.commands.push(command.to_owned());
        }
    }

    fn expose() -> Event {
        Event::Expose(ExposeEvent {
            response_type: 12,
            sequence: 0,
            window: 1,
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            count: 0,
        })
    }

    fn button_press() -> Event {
        Event::ButtonPress(ButtonPressEvent {
            response_type: 4,
            detail: 1,
            sequence: 0,
            time: 0,
            root: 1,
            event: 1,
            child: 0,
            root_x: 0,
            root_y: 0,
            event_x: 0,
            event_y: 0,
            state: KeyButMask::from(0u16),
            same_screen: true,
        })
    }

    fn map_notify() -> Event {
        Event::MapNotify(MapNotifyEvent {
            response_type: 19,
            sequence: 0,
            event: 1,
            window: 1,
            override_redirect: true,
        })
    }

    #[test]
    fn expose_asks_for_a_redraw_without_spawning() {
        let mut spawner = RecordingSpawner::default();
        let reaction = dispatch(&expose(), Some("foo &"), &mut spawner);
        assert_eq!(reaction, Reaction::Redraw);
        assert!(spawner.commands.is_empty());
    }

    #[test]
    fn each_press_spawns_exactly_one_command() {
        let mut spawner = RecordingSpawner::default();
        for _ in 0..5 {
            dispatch(&button_press(), Some("foo &"), &mut spawner);
        }
        assert_eq!(spawner.commands, vec!["foo &"; 5]);
    }

    #[test]
    fn no_command_means_no_spawns() {
        let mut spawner = RecordingSpawner::default();
        for _ in 0..3 {
            let reaction = dispatch(&button_press(), None, &mut spawner);
            assert_eq!(reaction, Reaction::RunCommand);
        }
        assert!(spawner.commands.is_empty());
    }

    #[test]
    fn shell_spawner_leaves_no_zombie_behind() {
        let mut spawner = ShellSpawner;
        spawner.spawn("true &");
        // The shell was reaped inside spawn; the backgrounded command was
        // reparented away from us, so no waitable child may remain.
        let pid = unsafe { libc::waitpid(-1, std::ptr::null_mut(), libc::WNOHANG) };
        assert!(pid <= 0, "child pid {} left unreaped", pid);
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let mut spawner = RecordingSpawner::default();
        let reaction = dispatch(&map_notify(), Some("foo &"), &mut spawner);
        assert_eq!(reaction, Reaction::Ignore);
        assert!(spawner.commands.is_empty());
    }
}
