use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use colloquy::{ClientFactory, ConversationEngine, LocalSession, PersistClientBuilder};
use colloquy_app::{config::Config, Repl};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(model = %config.llm.model, "Starting Colloquy");

    // Initialize LLM client
    let llm_client = ClientFactory::create_client(config.anthropic_config())?;

    // Initialize persistence client
    let persistence = PersistClientBuilder::new()
        .mongodb_uri_opt(config.mongodb_uri.clone())
        .database(&config.mongodb.database)
        .build()
        .await?;

    let session = Arc::new(match &config.session.user_id {
        Some(user_id) => LocalSession::signed_in(user_id.clone()),
        None => LocalSession::new(),
    });

    let mut builder = ConversationEngine::builder()
        .llm_client(llm_client)
        .persistence(persistence)
        .credentials(session.clone())
        .default_model(config.llm.model.clone());
    if let Some(model) = &config.llm.summary_model {
        builder = builder.summary_model(model.clone());
    }
    let engine = builder.build()?;

    let user_id = engine.current_user_id();
    if let Err(e) = engine.load_all(&user_id).await {
        eprintln!("Could not load saved chats: {}", e);
    }

    println!();
    println!("Colloquy • {} ({} chats)", config.llm.model, engine.threads().len());
    println!("Type /help for commands, Ctrl+D or /quit to exit.");
    println!();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut repl = Repl::new(engine.clone(), session, std::io::stdout());
    let result = repl.run(stdin).await;

    // Give queued writes a chance to land before exiting
    engine.flush().await;
    result
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so they do not interleave with the chat transcript
    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
