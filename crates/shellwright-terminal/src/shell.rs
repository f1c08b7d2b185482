//! Shell detection helpers.

/// Detect the user's default shell.
///
/// - On Unix: reads the `SHELL` environment variable, falling back to `/bin/sh`.
/// - On Windows: reads the `COMSPEC` environment variable, falling back to `cmd.exe`.
pub fn detect_shell() -> String {
    #[cfg(unix)]
    {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }

    #[cfg(windows)]
    {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    }

    #[cfg(not(any(unix, windows)))]
    {
        "/bin/sh".to_string()
    }
}

/// Resolve the configured program, detecting from the environment when
/// the configuration leaves it empty.
pub fn resolve_program(configured: &str) -> String {
    if configured.trim().is_empty() {
        detect_shell()
    } else {
        configured.to_string()
    }
}

/// Arguments that keep a shell from sourcing user startup files, so the
/// captured stream starts clean. Empty for shells without such flags.
pub fn quiet_args(shell: &str) -> Vec<String> {
    if shell.ends_with("bash") {
        vec!["--noprofile".to_string(), "--norc".to_string()]
    } else if shell.ends_with("zsh") {
        vec!["-f".to_string()]
    } else {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_shell_returns_non_empty() {
        assert!(!detect_shell().is_empty());
    }

    #[test]
    fn resolve_program_keeps_explicit_value() {
        assert_eq!(resolve_program("/bin/dash"), "/bin/dash");
    }

    #[test]
    fn resolve_program_detects_when_empty() {
        assert_eq!(resolve_program("  "), detect_shell());
    }

    #[test]
    fn quiet_args_per_shell() {
        assert_eq!(quiet_args("/bin/bash"), vec!["--noprofile", "--norc"]);
        assert_eq!(quiet_args("zsh"), vec!["-f"]);
        assert!(quiet_args("/usr/bin/fish").is_empty());
        assert!(quiet_args("/bin/sh").is_empty());
    }
}
