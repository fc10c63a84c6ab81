use std::io::Write;

use terminal_coding_agent::agent::{Agent, AgentDeps, StdinInput};
use terminal_coding_agent::config::{AgentConfig, LlmConfig};
use terminal_coding_agent::error::{ConfigError, Error};
use terminal_coding_agent::llm::create_provider;
use terminal_coding_agent::tools::ToolRegistry;
use terminal_coding_agent::tools::builtin::shell::ShellTool;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the variables may come from the shell.
    let dotenv = dotenvy::dotenv();

    // Initialize tracing. Logs go to stderr so the REPL on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!(error = %e, "No .env loaded"),
    }

    let llm_config = LlmConfig::from_env().unwrap_or_else(|e| exit_with_hint(&e));
    let agent_config = AgentConfig::from_env().unwrap_or_else(|e| exit_with_hint(&e));

    let llm = create_provider(&llm_config)?;
    let shell = ShellTool::new().with_working_dir(std::env::current_dir()?);
    let deps = AgentDeps {
        llm,
        tools: ToolRegistry::builtin().with_shell(shell),
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            ctrl_c.cancel();
        }
    });

    let mut agent = Agent::new(agent_config, deps, StdinInput::spawn(), std::io::stdout());
    let result = agent.run(&cancel).await;
    std::io::stdout().flush()?;

    match result {
        Ok(()) => Ok(()),
        // Already shown to the user by the loop.
        Err(Error::Llm(e)) => {
            tracing::debug!(error = %e, "Chat ended by inference failure");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn exit_with_hint(err: &ConfigError) -> ! {
    eprintln!("Error: {}", err);
    if let ConfigError::MissingEnvVar(key) = err
        && key == "ANTHROPIC_API_KEY"
    {
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        eprintln!("  or add it to a .env file in the current directory");
    }
    std::process::exit(1);
}
