use clap::{Parser, Subcommand};

/// SSE token streaming: producer, relay gateway and client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the token-producing service (POST /chat)
    Producer {
        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the relaying gateway (GET /stream)
    Gateway {
        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Producer base URL (overrides config)
        #[arg(long)]
        upstream: Option<String>,
    },
    /// Stream a prompt through the gateway and print the reply
    Stream {
        /// Prompt text
        prompt: String,

        /// Gateway base URL (overrides config)
        #[arg(long)]
        gateway: Option<String>,
    },
}
