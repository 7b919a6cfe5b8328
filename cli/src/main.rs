use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use sandbot_core::agent::{SessionEvent, SessionState};
use sandbot_core::{AgentError, AgentLoop, ContextBuilder, Sandbox, Session, ToolRegistry, config};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sandbot")]
#[command(about = "sandbot - a file-organizing chat agent confined to one directory", long_about = None)]
struct Cli {
    /// Config file (defaults to ./sandbot.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log agent internals at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Chat with the agent (default)
    Chat {
        #[arg(short, long)]
        message: Option<String>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        sandbox: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,sandbot_core=debug"
    } else {
        "warn,sandbot_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Chat {
        message: None,
        provider: None,
        model: None,
        sandbox: None,
    });

    match command {
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::get_config_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            config::save_config(&config::Config::default(), &path)?;
            println!("✅ Wrote {}", path.display());
        }
        Commands::Chat {
            message,
            provider,
            model,
            sandbox,
        } => {
            let mut config = config::Config::load_or_default(cli.config.as_deref())?;
            if provider.is_some() {
                config.provider = provider;
            }
            if model.is_some() {
                config.model = model;
            }
            if let Some(sandbox) = sandbox {
                config.sandbox_dir = sandbox;
            }
            config.validate()?;

            let mut session = build_session(&config)?;

            if let Some(msg) = message {
                println!("\n🤔 Processing...\n");
                match session.handle_input(&msg).await {
                    SessionEvent::Reply(response) => println!("{}", response),
                    SessionEvent::Failed(e) => {
                        report_error(&e);
                        anyhow::bail!("Agent processing failed: {}", e);
                    }
                    _ => {}
                }
            } else {
                run_interactive(&mut session, &config).await?;
            }
        }
    }

    Ok(())
}

fn build_session(config: &config::Config) -> Result<Session> {
    let sandbox = Arc::new(Sandbox::open(&config.sandbox_dir)?);
    let provider = sandbot_core::create_provider(config)?;

    let mut registry = ToolRegistry::new();
    sandbot_core::register_filesystem_tools(&mut registry, Arc::clone(&sandbox))?;

    let context_builder =
        ContextBuilder::new(sandbox.root()).with_system_prompt(config.system_prompt.clone());
    let agent = AgentLoop::new(provider, context_builder, Arc::new(registry))
        .with_max_steps(config.max_steps)
        .with_max_turns(config.max_turns);

    Ok(Session::new(agent))
}

async fn run_interactive(session: &mut Session, config: &config::Config) -> Result<()> {
    let tools = session.agent().tool_registry().names().join(", ");
    println!("{}", style("🤖 sandbot").bold());
    println!("📁 Sandbox: {}", config.sandbox_dir.display());
    println!("🛠️  Tools: {}", tools);
    println!("💡 Type 'exit' to quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while session.state() == SessionState::AwaitingUserInput {
        print!("{} ", style(">").cyan().bold());
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            session.shutdown();
            println!("\n👋 Goodbye!");
            break;
        };

        if line.trim().is_empty() {
            continue;
        }
        if !Session::is_exit_command(&line) {
            println!("\n🤔 Processing...\n");
        }

        match session.handle_input(&line).await {
            SessionEvent::Reply(response) => println!("{}\n", response),
            SessionEvent::Failed(e) => {
                report_error(&e);
                println!();
            }
            SessionEvent::Farewell => println!("👋 Goodbye!"),
            SessionEvent::Ignored | SessionEvent::Closed => {}
        }
    }

    Ok(())
}

fn report_error(error: &AgentError) {
    eprintln!("{} {}", style("❌ Error:").red().bold(), error);
    if let Some(hint) = hint_for(error) {
        eprintln!("💡 {}", hint);
    }
}

fn hint_for(error: &AgentError) -> Option<&'static str> {
    match error {
        AgentError::Backend(e) => {
            let text = format!("{e:#}").to_lowercase();
            if text.contains("401") || text.contains("invalid api key") {
                Some("Check the API key for this provider (environment variable or api_key in the config).")
            } else if text.contains("429") || text.contains("quota") {
                Some("The provider is rate limiting or out of quota. Wait, top up, or switch provider with --provider.")
            } else if text.contains("cannot connect") || text.contains("connection") {
                Some("Network connection failed. Check connectivity or set HTTPS_PROXY.")
            } else {
                None
            }
        }
        AgentError::StepLimitExceeded(_) => {
            Some("The request needed too many tool steps. Try a narrower request or raise max_steps.")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_match_backend_failures() {
        let auth = AgentError::Backend(anyhow::anyhow!("openai API error 401: Invalid API Key"));
        assert!(hint_for(&auth).unwrap().contains("API key"));

        let quota = AgentError::Backend(anyhow::anyhow!("You exceeded your current quota"));
        assert!(hint_for(&quota).unwrap().contains("quota"));

        let other = AgentError::UnknownTool("delete_file".to_string());
        assert!(hint_for(&other).is_none());
    }

    #[test]
    fn cli_parses_chat_overrides() {
        let cli = Cli::parse_from(["sandbot", "chat", "--provider", "deepseek", "-m", "hi"]);
        let Some(Commands::Chat {
            message, provider, ..
        }) = cli.command
        else {
            panic!("expected chat");
        };
        assert_eq!(message.as_deref(), Some("hi"));
        assert_eq!(provider.as_deref(), Some("deepseek"));
    }
}
