//! Configuration validation.
//!
//! Every check pushes onto a shared error list so all problems are
//! reported together in one `ConfigError::ValidationError`.

use crate::schema::ShellwrightConfig;
use shellwright_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ShellwrightConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_model(&mut errors, config);
    validate_agent(&mut errors, config);
    validate_shell(&mut errors, config);
    validate_security(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Push an error if `value` is outside `[min, max]`.
fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

fn validate_model(errors: &mut Vec<String>, config: &ShellwrightConfig) {
    if config.model.name.trim().is_empty() {
        errors.push("model.name must not be empty".into());
    }
    validate_range(
        errors,
        "model.max_attempts",
        config.model.max_attempts as u64,
        1,
        10,
    );
    if !(0.0..=2.0).contains(&config.model.temperature) {
        errors.push(format!(
            "model.temperature = {} is out of range [0, 2]",
            config.model.temperature
        ));
    }
}

fn validate_agent(errors: &mut Vec<String>, config: &ShellwrightConfig) {
    validate_range(
        errors,
        "agent.recall_limit",
        config.agent.recall_limit as u64,
        1,
        50,
    );
    if config.agent.default_session.trim().is_empty() {
        errors.push("agent.default_session must not be empty".into());
    }
}

fn validate_shell(errors: &mut Vec<String>, config: &ShellwrightConfig) {
    let shell = &config.shell;
    validate_range(
        errors,
        "shell.command_timeout_secs",
        shell.command_timeout_secs,
        1,
        3600,
    );
    validate_range(
        errors,
        "shell.init_timeout_secs",
        shell.init_timeout_secs,
        1,
        60,
    );
    if shell.cols == 0 || shell.rows == 0 {
        errors.push(format!(
            "shell size {}x{} must be non-zero",
            shell.cols, shell.rows
        ));
    }
}

fn validate_security(errors: &mut Vec<String>, config: &ShellwrightConfig) {
    for entry in &config.security.command_allowlist {
        if entry.is_empty() || entry.chars().any(char::is_whitespace) {
            errors.push(format!(
                "security.command_allowlist entry {entry:?} must be a single command name"
            ));
        }
    }
}
