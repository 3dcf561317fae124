use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use beauty_advisor::chat::{run_chat, ChatOptions};
use beauty_advisor::constants::{
    DEFAULT_CATALOG, DEFAULT_COMPLETION_API_URL, DEFAULT_COMPLETION_MODEL, DEFAULT_MAX_TOKENS,
    DEFAULT_RELAY_PORT, DEFAULT_RELAY_URL, DEFAULT_STORAGE_FILE, DEFAULT_TEMPERATURE,
};
use beauty_advisor::relay::{start_relay_server, RelayConfig};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the edge relay that forwards chat requests to the completion API.
    Relay {
        #[arg(long, env = "RELAY_PORT", default_value_t = DEFAULT_RELAY_PORT, help = "Port for the relay.")]
        port: u16,
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, help = "Completion API key.")]
        api_key: Option<String>,
        #[arg(long, env = "COMPLETION_API_URL", default_value = DEFAULT_COMPLETION_API_URL)]
        api_url: String,
        #[arg(long, env = "COMPLETION_MODEL", default_value = DEFAULT_COMPLETION_MODEL)]
        model: String,
        #[arg(long, env = "COMPLETION_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: u32,
        #[arg(long, env = "COMPLETION_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
        temperature: f32,
        #[arg(long, env = "RELAY_STREAM", help = "Stream completions back as server-sent events.")]
        stream: bool,
        #[arg(long, env = "RELAY_MAX_MESSAGE_CHARS", help = "Cut forwarded messages to this many characters.")]
        max_message_chars: Option<usize>,
    },
    /// Browse products, build a selection and chat with the beauty advisor.
    Chat {
        #[arg(long, env = "RELAY_URL", default_value = DEFAULT_RELAY_URL)]
        relay_url: String,
        #[arg(long, env = "PRODUCT_CATALOG", default_value = DEFAULT_CATALOG, help = "Catalog file path or URL.")]
        catalog: String,
        #[arg(long, env = "ADVISOR_STORAGE", default_value = DEFAULT_STORAGE_FILE, help = "File holding the saved selection.")]
        storage: PathBuf,
        #[arg(long, help = "Write the session as an HTML page on exit.")]
        transcript: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like API keys)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g. RUST_LOG=info,beauty_advisor=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Relay {
            port,
            api_key,
            api_url,
            model,
            max_tokens,
            temperature,
            stream,
            max_message_chars,
        } => {
            info!("Starting relay on port {}...", port);
            let config = RelayConfig {
                api_key,
                api_url,
                model,
                max_tokens,
                temperature,
                stream,
                max_message_chars,
            };
            start_relay_server(port, config).await?;
        }
        Commands::Chat {
            relay_url,
            catalog,
            storage,
            transcript,
        } => {
            run_chat(ChatOptions {
                relay_url,
                catalog,
                storage,
                transcript,
            })
            .await?;
        }
    }

    info!("beauty-advisor finished.");
    Ok(())
}
