use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use roastify::auth::callback_server::CallbackServer;
use roastify::auth::{self, Authenticator};
use roastify::spotify::analysis::{self, ListeningProfile};
use roastify::{db, Error, Gateway, SpotifyConfig, TokenStore};

const DEFAULT_CALLBACK_PORT: u16 = 5173;

fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ROASTIFY_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let base = dirs::data_dir().context("failed to resolve a data directory")?;
    Ok(base.join("roastify"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = SpotifyConfig::from_env()?;
    let pool = db::init_db(&data_dir()?.join("roastify.sqlite")).await?;
    let store = Arc::new(TokenStore::load(pool).await?);
    let gateway = Gateway::new(config.clone(), store.clone())?;

    if store.get().await.is_none() {
        login(&config, &store, &gateway).await?;
    }

    let profile = match analysis::analyze(&gateway).await {
        Ok(profile) => profile,
        // session-fatal: the stored tokens are dead, start over
        Err(Error::Authentication | Error::RefreshRejected { .. }) => {
            login(&config, &store, &gateway).await?;
            analysis::analyze(&gateway).await?
        }
        Err(err) => return Err(err.into()),
    };

    print_profile(&profile);
    Ok(())
}

async fn login(
    config: &SpotifyConfig,
    store: &Arc<TokenStore>,
    gateway: &Gateway,
) -> Result<()> {
    let authenticator = Authenticator::new(config.clone())?;
    let auth_url = authenticator.begin()?;

    println!("Open this URL in your browser to connect Spotify:\n\n{}\n", auth_url);

    let port = config.callback_port().unwrap_or(DEFAULT_CALLBACK_PORT);
    let server = CallbackServer::bind(port).await?;
    let params = server.capture().await?;

    let code_verifier = authenticator.verify_callback(&params.state)?;
    let token_set = auth::exchange_code_for_tokens(
        &gateway.http_client(),
        config,
        &params.code,
        &code_verifier,
    )
    .await?;

    store.replace(token_set).await?;
    tracing::info!("Spotify account connected");
    Ok(())
}

fn print_profile(profile: &ListeningProfile) {
    if let Some(name) = &profile.display_name {
        println!("Listening profile for {}", name);
    } else {
        println!("Listening profile");
    }
    println!(
        "Popularity: {} ({:?})",
        profile.popularity.score, profile.popularity.category
    );
    println!(
        "Diversity: {} genres, {:.1} per artist",
        profile.diversity.total_genres, profile.diversity.average_genres_per_artist
    );
    println!("Recent plays sampled: {}", profile.recent_activity);

    println!("\nTop genres:");
    for genre in &profile.top_genres {
        println!("  {} ({})", genre.genre, genre.count);
    }
    println!("\nTop artists:");
    for name in profile.top_artists.iter().take(10) {
        println!("  {}", name);
    }
    println!("\nTop tracks:");
    for label in profile.top_tracks.iter().take(10) {
        println!("  {}", label);
    }
}
