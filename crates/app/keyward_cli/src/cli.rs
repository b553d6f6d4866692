use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "keyward", version, about = "Sign in to the auth backend and manage the stored session")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the environment-derived client configuration.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Backend base URL.
    #[arg(long, global = true, env = "KEYWARD_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Encrypted credential file.
    #[arg(long, global = true, env = "KEYWARD_STORE_PATH")]
    pub store_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KEYWARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KEYWARD_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Fetch the signed-in user from the backend.
    Whoami,
    /// Check whether the stored session is still usable.
    Status,
    /// Sign out and clear stored credentials.
    Logout,
    /// Read or change single credential entries.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
    /// Print version.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum StoreAction {
    /// Print a stored value.
    Get { key: String },
    /// Replace a stored value.
    Set { key: String, value: String },
    /// Remove a stored value.
    Delete { key: String },
    /// Remove every stored value.
    Clear,
}
