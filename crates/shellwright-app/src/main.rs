mod cli;
mod logging;
mod runtime;

use std::io::{BufRead, Write};
use std::process::ExitCode;

use shellwright_agent::History;
use shellwright_common::{SessionId, ShellwrightError};
use shellwright_config::ShellwrightConfig;
use tracing::{error, info, warn};

use crate::cli::Args;
use crate::runtime::Runtime;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let config = shellwright_config::load_config(args.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.logging.level)
        .unwrap_or_default();
    let env_directive = std::env::var("RUST_LOG").ok();
    logging::init(&logging::resolve_directive(
        args.log_directive(),
        env_directive.as_deref(),
        level,
    ));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load config");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("shellwright v{} starting", env!("CARGO_PKG_VERSION"));

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "shellwright failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: ShellwrightConfig) -> Result<(), ShellwrightError> {
    let session = SessionId::new(
        args.session
            .clone()
            .unwrap_or_else(|| config.agent.default_session.clone()),
    );

    if args.list_sessions {
        let history = runtime::open_history(&config).await?;
        let sessions = history
            .list_sessions()
            .await
            .map_err(|e| ShellwrightError::Storage(e.to_string()))?;
        for s in sessions {
            println!("{}\t{}", s.id, s.name);
        }
        return Ok(());
    }

    let runtime = Runtime::build(&config, args.interactive).await?;
    let sessions = runtime.sessions.clone();

    let result = tokio::select! {
        result = drive(&runtime, &args, &session) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, closing shell sessions");
            sessions.cleanup();
            // A pending stdin read would otherwise keep the runtime alive.
            std::process::exit(130);
        }
    };

    sessions.cleanup();
    info!("shutdown complete");
    result
}

async fn drive(runtime: &Runtime, args: &Args, session: &SessionId) -> Result<(), ShellwrightError> {
    let agent = &runtime.agent;

    if args.distill {
        let stored = agent
            .distill(session.as_str())
            .await
            .map_err(|e| ShellwrightError::Agent(e.to_string()))?;
        match stored {
            Some(id) => println!("Stored distilled memory {id}"),
            None => println!("Session {session} is too short to distill"),
        }
        return Ok(());
    }

    if let Some(prompt) = args.prompt() {
        let answer = agent
            .run(session.as_str(), &prompt)
            .await
            .map_err(|e| ShellwrightError::Agent(e.to_string()))?;
        println!("{answer}");
        return Ok(());
    }

    repl(runtime, session).await
}

/// Read prompts from stdin until `exit`, `quit` or end of input. A failed
/// turn is reported and the loop continues.
async fn repl(runtime: &Runtime, session: &SessionId) -> Result<(), ShellwrightError> {
    info!(session = %session, "starting interactive session");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = read_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if matches!(prompt, "exit" | "quit") {
            break;
        }

        match runtime.agent.run(session.as_str(), prompt).await {
            Ok(answer) => println!("{answer}"),
            Err(e) => {
                warn!(session = %session, error = %e, "turn failed");
                eprintln!("error: {e}");
            }
        }
    }
    Ok(())
}

/// One line from stdin, `None` at end of input. Reads through the shared
/// std handle so interactive confirmations see the same buffer.
async fn read_line() -> Result<Option<String>, ShellwrightError> {
    let read = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map(|n| (n > 0).then_some(line))
    })
    .await
    .map_err(|e| ShellwrightError::Other(e.to_string()))?;
    Ok(read?)
}
