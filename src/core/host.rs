//! Side effects the session delegates to its surroundings

use std::io;
use std::process::{Command, Stdio};

use tracing::debug;

pub trait Host {
    /// Show external documentation to the user
    fn open_docs(&mut self, url: &str) -> io::Result<()>;
}

/// Opens URLs with the platform's default handler
pub struct SystemHost;

impl Host for SystemHost {
    fn open_docs(&mut self, url: &str) -> io::Result<()> {
        debug!("Opening {}", url);
        let mut command = opener(url);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }
}

#[cfg(windows)]
fn opener(url: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", url]);
    command
}

#[cfg(target_os = "macos")]
fn opener(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(not(any(windows, target_os = "macos")))]
fn opener(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}
