pub mod callback_server;
pub mod oauth;
pub mod pkce;
pub mod token_client;

pub use oauth::{generate_auth_url, AuthState, Authenticator};
pub use token_client::{exchange_code_for_tokens, refresh_access_token};
