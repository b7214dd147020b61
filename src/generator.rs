use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// External text generator (an LLM behind some interface)
pub trait TextGenerator {
    /// Answer `prompt`, optionally looking at an image. `None` on any failure;
    /// there is no retry.
    fn generate(&self, prompt: &str, image: Option<&Path>) -> Option<String>;
}

// =============================================================================
// CommandGenerator - shell command adapter
// =============================================================================

/// Runs a shell command with the prompt on stdin and the image path in
/// `WARDROBE_IMAGE`; stdout is the response
pub struct CommandGenerator {
    command: String,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl TextGenerator for CommandGenerator {
    fn generate(&self, prompt: &str, image: Option<&Path>) -> Option<String> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(path) = image {
            cmd.env("WARDROBE_IMAGE", path);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start generator `{}`: {}", self.command, e);
                return None;
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(prompt.as_bytes()) {
                // The command may legitimately ignore stdin
                debug!("Generator closed stdin early: {}", e);
            }
        }

        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(e) => {
                warn!("Generator `{}` failed: {}", self.command, e);
                return None;
            }
        };

        if !output.status.success() {
            warn!("Generator `{}` exited with {}", self.command, output.status);
            return None;
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
