use anyhow::Result;
use companion_app::bootstrap::{self, env_key};
use companion_app::cli::{CliArgs, USAGE};
use companion_app::config::Config;
use companion_app::repl::ChatRepl;
use companion_core::{ChatSession, EventBus, TaskBoard};
use companion_interfaces::TerminalInterface;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("companion=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = CliArgs::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::load_or_default(&args.config_path)?.with_env_overrides(env_key);
    if let Some(user) = args.user {
        config.user_id = user;
    }
    if let Err(e) = config.validate() {
        eprintln!("❌ Invalid configuration: {}", e);
        return Err(e);
    }

    let store = bootstrap::build_store(&config.store, env_key).await?;
    let model = bootstrap::build_model(&config, env_key);

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║              Companion - wellness chat                           ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!("Signed in as {} · {}", config.user_id, config.provider.display_name());
    if env_key(config.provider.api_key_var()).is_none() {
        println!(
            "💡 {} is not set; task commands work, assistant replies will not.",
            config.provider.api_key_var()
        );
    }
    println!();

    let events = EventBus::default();
    let session = ChatSession::new(
        store.clone(),
        model,
        config.user_id.clone(),
        config.session.clone(),
    )
    .with_events(events.clone());
    let board = TaskBoard::new(store, config.user_id.clone()).with_events(events.clone());

    let mut repl = ChatRepl::new(TerminalInterface::new(), session, board, events.subscribe());
    repl.run().await
}
