pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "repodoc")]
#[command(about = "Repodoc - Webhook-driven repository documentation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the webhook server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// Run the documentation pipeline once, without a webhook
    Run {
        /// Repository owner
        owner: String,

        /// Repository name
        repo: String,

        /// Branch to snapshot
        #[arg(short, long, default_value = "main")]
        branch: String,
    },
}
