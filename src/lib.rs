pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod spotify;
pub mod token_store;

pub use config::SpotifyConfig;
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use token_store::{TokenSet, TokenStore};
