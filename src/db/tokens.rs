use sqlx::FromRow;

use super::Pool;
use crate::error::Result;
use crate::token_store::TokenSet;

#[derive(Debug, FromRow)]
struct TokenRow {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: i64,
}

pub async fn get_tokens(pool: &Pool) -> Result<Option<TokenSet>> {
    let row = sqlx::query_as::<_, TokenRow>(
        "SELECT access_token, refresh_token, expires_at FROM tokens WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| TokenSet {
        access_token: r.access_token,
        refresh_token: r.refresh_token,
        expires_at: r.expires_at,
    }))
}

pub async fn set_tokens(pool: &Pool, set: &TokenSet) -> Result<()> {
    sqlx::query(
        r#"
      INSERT INTO tokens (id, access_token, refresh_token, expires_at)
      VALUES (1, ?, ?, ?)
      ON CONFLICT(id) DO UPDATE
      SET access_token = excluded.access_token,
          refresh_token = excluded.refresh_token,
          expires_at = excluded.expires_at
    "#,
    )
    .bind(&set.access_token)
    .bind(set.refresh_token.as_deref())
    .bind(set.expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_tokens(pool: &Pool) -> Result<()> {
    sqlx::query("DELETE FROM tokens WHERE id = 1")
        .execute(pool)
        .await?;

    Ok(())
}
