// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands, GlobalArgs, StoreAction};
use keyward_core::models::auth::RegisterRequest;
use keyward_core::storage::{CredentialStore, EncryptedFileStore, StorageKey};
use keyward_core::{AuthError, AuthSession, AuthStatus, ClientConfig};

mod cli;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    let _logger = logging::init()?;

    if let Err(e) = run(Cli::parse()).await {
        log::error!("{}", e);
        if let Error::Auth(auth) = &e {
            println!("{}", serde_json::to_string(&auth.payload())?);
        }
        std::process::exit(1);
    }
    Ok(())
}

fn config(global: &GlobalArgs) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &global.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(path) = &global.store_path {
        config.store_path = path.clone();
    }
    config
}

async fn run(args: Cli) -> Result<()> {
    let config = config(&args.global);

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), keyward_core::version());
        }
        Commands::Login { email, password } => {
            let session = AuthSession::from_config(&config)?;
            let user = session.login(&email, &password).await?;
            println!("Signed in as {}", user.display_name());
        }
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
        } => {
            let session = AuthSession::from_config(&config)?;
            let user = session
                .register(&RegisterRequest {
                    email,
                    password,
                    first_name,
                    last_name,
                })
                .await?;
            println!("Registered {}", user.display_name());
        }
        Commands::Whoami => {
            let session = AuthSession::from_config(&config)?;
            if session.auth_state().await.token.is_none() {
                return Err(AuthError::Unauthenticated.into());
            }
            let user = session.current_user().await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Commands::Status => {
            let session = AuthSession::from_config(&config)?;
            match session.check_auth_status().await {
                AuthStatus::Authenticated(user) => {
                    let expires = session.auth_state().await.token_expires.unwrap_or_default();
                    println!(
                        "Signed in as {} (token expires at {expires})",
                        user.display_name()
                    );
                }
                AuthStatus::SignedOut => println!("Signed out"),
            }
        }
        Commands::Logout => {
            let session = AuthSession::from_config(&config)?;
            session.logout().await?;
            println!("Signed out");
        }
        Commands::Store { action } => {
            let store = EncryptedFileStore::new(&config.store_path, &config.encryption_key)?;
            run_store(&store, action).await?;
        }
    }

    Ok(())
}

async fn run_store(store: &dyn CredentialStore, action: StoreAction) -> Result<()> {
    match action {
        StoreAction::Get { key } => match store.get(key.parse::<StorageKey>()?).await? {
            Some(value) => println!("{value}"),
            None => return Err(Error::Custom(format!("{key} is not set"))),
        },
        StoreAction::Set { key, value } => {
            store.set(key.parse::<StorageKey>()?, &value).await?;
        }
        StoreAction::Delete { key } => {
            store.delete(key.parse::<StorageKey>()?).await?;
        }
        StoreAction::Clear => {
            store.clear().await?;
        }
    }
    Ok(())
}
