//! The system-info panel: run an external command under a pseudo terminal
//! and keep its colored output as lines.

use std::env;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Run `command` and return its non-empty output lines, escape codes intact.
///
/// Mentions of this program's binary name are replaced with the name of the
/// shell that launched it. Any failure yields no lines.
pub fn collect_lines(command: &str) -> Vec<Vec<u8>> {
    let output = run_command(command);
    let binary = env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();
    split_lines(&output, &binary, &parent_shell_name())
}

fn run_command(command: &str) -> String {
    if command.is_empty() {
        return String::new();
    }

    // `script` gives the command a tty so it keeps its colors.
    let mut cmd = Command::new("script");
    if cfg!(target_os = "macos") {
        cmd.args(["-q", "/dev/null", "sh", "-c", command]);
    } else {
        cmd.args(["-qec", command, "/dev/null"]);
    }
    cmd.env("TERM", "xterm-256color")
        .env("COLORTERM", "truecolor")
        .stdin(Stdio::null());

    match cmd.output() {
        Ok(out) => {
            debug!(status = %out.status, "info command finished");
            let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&out.stderr));
            text
        }
        Err(e) => {
            warn!("could not run info command {command:?}: {e}");
            String::new()
        }
    }
}

/// Name of the parent process, falling back to `$SHELL`, then `sh`.
fn parent_shell_name() -> String {
    let ppid = std::os::unix::process::parent_id();
    let from_ps = Command::new("ps")
        .args(["-p", &ppid.to_string(), "-o", "comm="])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_owned())
        .filter(|name| !name.is_empty());

    from_ps.unwrap_or_else(|| {
        env::var("SHELL")
            .ok()
            .and_then(|s| {
                Path::new(&s)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "sh".to_owned())
    })
}

fn split_lines(output: &str, binary: &str, shell: &str) -> Vec<Vec<u8>> {
    let replaced;
    let text = if !binary.is_empty() && binary != shell {
        replaced = output.replace(binary, shell);
        replaced.as_str()
    } else {
        output
    };

    text.split('\n')
        .map(|l| l.trim_end_matches(['\r', '\n']))
        .filter(|l| !l.is_empty())
        .map(|l| l.as_bytes().to_vec())
        .collect()
}
