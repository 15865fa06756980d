use clap::{Parser, Subcommand};

/// modgate: token-gated image moderation API
#[derive(Parser)]
#[command(name = "modgate", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to bind (defaults to PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply pending database migrations and exit
    Migrate,

    /// Manage bearer tokens directly against the store
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Issue a new token and print its secret
    Create {
        /// Grant admin privileges
        #[arg(long)]
        admin: bool,
        #[arg(long)]
        description: Option<String>,
    },
    /// List token metadata (secrets are never shown)
    List,
    /// Delete a token by its secret
    Revoke {
        token: String,
    },
}
