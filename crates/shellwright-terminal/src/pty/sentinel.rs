//! Completion markers for commands written to an unframed terminal stream.

use std::sync::LazyLock;

use regex::Regex;

use shellwright_common::new_token;

/// CSI, OSC and two-byte escape sequences.
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]").unwrap()
});

const MARKER_PREFIX: &str = "__SW_";
const MARKER_SUFFIX: &str = "__";

/// A per-command terminator. The marker only appears in the stream once the
/// shell has executed the trailing `echo`.
#[derive(Debug, Clone)]
pub struct Sentinel {
    token: String,
    marker: String,
    echoed: String,
}

impl Sentinel {
    pub fn new() -> Self {
        Self::with_token(new_token())
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let marker = format!("{MARKER_PREFIX}{token}{MARKER_SUFFIX}");
        let echoed = format!("{MARKER_PREFIX}\"\"{token}{MARKER_SUFFIX}");
        Self {
            token,
            marker,
            echoed,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// The line written to the shell: the command followed by an echo of
    /// the marker. The echoed literal is split with `""` so the marker is
    /// only produced by the shell, never by terminal echo.
    ///
    /// A trailing `;` is dropped. When the last line ends in a comment the
    /// echo goes on its own line.
    pub fn command_line(&self, command: &str) -> String {
        let mut command = command.trim_end();
        if command.ends_with(';') && !command.ends_with(";;") {
            command = command[..command.len() - 1].trim_end();
        }
        let last_line = command.rsplit('\n').next().unwrap_or_default();
        let separator = if has_comment(last_line) {
            "\n"
        } else if command.ends_with('&') && !command.ends_with("&&") {
            " "
        } else {
            "; "
        };
        format!("{command}{separator}echo {}\n", self.echoed)
    }

    /// Return the command output if the marker has been seen in `buf`.
    ///
    /// Output is everything before the last occurrence of the marker, with
    /// a leading echoed-command line dropped, CRLF normalized, escape
    /// sequences removed and whitespace trimmed.
    pub fn extract(&self, buf: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(buf);
        let end = text.rfind(&self.marker)?;
        let normalized = text[..end].replace("\r\n", "\n").replace('\r', "");
        let mut lines: Vec<&str> = normalized.split('\n').collect();
        if lines.first().is_some_and(|l| l.contains(&self.echoed)) {
            lines.remove(0);
        }
        Some(clean_output(&lines.join("\n")))
    }
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `line` contains a `#` in word-initial position. Quoting is not
/// tracked, so a quoted ` #` also counts.
fn has_comment(line: &str) -> bool {
    line.char_indices()
        .any(|(i, c)| c == '#' && (i == 0 || line[..i].ends_with(char::is_whitespace)))
}

/// Strip terminal escape sequences and surrounding whitespace.
pub fn clean_output(raw: &str) -> String {
    ANSI_RE.replace_all(raw, "").trim().to_string()
}
