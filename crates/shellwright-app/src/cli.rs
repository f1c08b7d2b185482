use std::path::PathBuf;

use clap::Parser;

/// shellwright: an agent that answers prompts by driving a persistent shell.
#[derive(Parser, Debug)]
#[command(name = "shellwright", version, about)]
pub struct Args {
    /// Prompt to answer. Without one, read prompts from stdin line by line.
    pub prompt: Vec<String>,

    /// Conversation to continue (defaults to `agent.default_session`).
    #[arg(short, long)]
    pub session: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Confirm shell commands and file edits before they run.
    #[arg(short, long)]
    pub interactive: bool,

    /// Log filter directive, e.g. `debug` or `shellwright_terminal=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Shorthand for `--log-level debug`.
    #[arg(long, conflicts_with = "log_level")]
    pub debug: bool,

    /// Summarize the session into long-term memory and exit.
    #[arg(long, conflicts_with = "list_sessions")]
    pub distill: bool,

    /// Print known sessions as `id<TAB>name` and exit.
    #[arg(long)]
    pub list_sessions: bool,
}

impl Args {
    pub fn prompt(&self) -> Option<String> {
        let prompt = self.prompt.join(" ");
        let prompt = prompt.trim();
        (!prompt.is_empty()).then(|| prompt.to_string())
    }

    /// The log directive requested on the command line, if any.
    pub fn log_directive(&self) -> Option<&str> {
        if self.debug {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("shellwright").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn prompt_words_are_joined() {
        let args = parse_from(&["list", "files", "in", "/tmp"]);
        assert_eq!(args.prompt().as_deref(), Some("list files in /tmp"));
        assert!(parse_from(&[]).prompt().is_none());
    }

    #[test]
    fn flags() {
        let args = parse_from(&["-s", "work", "--interactive", "--config", "/tmp/c.toml", "hi"]);
        assert_eq!(args.session.as_deref(), Some("work"));
        assert!(args.interactive);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(args.prompt().as_deref(), Some("hi"));
    }

    #[test]
    fn debug_is_log_level_shorthand() {
        assert_eq!(parse_from(&["--debug"]).log_directive(), Some("debug"));
        assert_eq!(parse_from(&["--log-level", "warn"]).log_directive(), Some("warn"));
        assert_eq!(parse_from(&[]).log_directive(), None);
        let both = ["shellwright", "--debug", "--log-level", "warn"];
        assert!(Args::try_parse_from(both).is_err());
    }

    #[test]
    fn distill_conflicts_with_list() {
        let args = ["shellwright", "--distill", "--list-sessions"];
        assert!(Args::try_parse_from(args).is_err());
    }
}
