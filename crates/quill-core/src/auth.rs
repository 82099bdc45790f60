//! Login and registration flows, and the author-only gate.

use anyhow::Result;

use crate::api::{BlogApi, Post, TokenPair};
use crate::session::{Session, SessionAction, SessionStore, User};
use crate::token::decode_claims;

/// Logs in and commits the new session.
///
/// The user identity comes from the access token's claims; a token that
/// cannot be decoded still logs in, with no known user.
///
/// # Errors
/// Returns an error if the request fails or the response has no access
/// token. The session is left untouched in both cases.
pub async fn login(
    api: &BlogApi,
    store: &mut SessionStore,
    username: &str,
    password: &str,
) -> Result<Session> {
    let payload = api.login(username, password).await?;
    let TokenPair { access, refresh } = TokenPair::from_payload(&payload);
    let Some(access) = access else {
        anyhow::bail!("No access token");
    };

    let user = decode_claims(&access).map(|claims| claims.to_user());
    if user.is_none() {
        tracing::warn!("access token payload could not be decoded; user identity unknown");
    }

    let session = store
        .dispatch(SessionAction::LoginSuccess {
            access,
            refresh,
            user,
        })
        .clone();
    tracing::info!(user_id = ?session.user_id(), "logged in");
    Ok(session)
}

/// Registers an account. When the response names the created user, it is
/// committed with a `RegisterSuccess` transition.
///
/// # Errors
/// Returns an error if the request fails.
pub async fn register(
    api: &BlogApi,
    store: &mut SessionStore,
    username: &str,
    password: &str,
) -> Result<Option<User>> {
    let payload = api.register(username, password).await?;
    let user = payload
        .as_json()
        .and_then(|body| body.get("user"))
        .and_then(User::from_json);

    if user.is_some() {
        store.dispatch(SessionAction::RegisterSuccess { user: user.clone() });
    }
    tracing::info!("registered account");
    Ok(user)
}

/// Clears the session.
pub fn logout(store: &mut SessionStore) {
    store.dispatch(SessionAction::Logout);
    tracing::info!("logged out");
}

/// Returns the access token, or fails with `message` when logged out.
///
/// # Errors
/// Returns an error if the session is not authenticated.
pub fn require_login<'a>(session: &'a Session, message: &str) -> Result<&'a str> {
    session
        .access
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("{message}"))
}

/// Fails unless the session belongs to the post's author.
///
/// # Errors
/// Returns an error if the session user is not the author.
pub fn ensure_author(session: &Session, post: &Post) -> Result<()> {
    if !session.is_author_of(post.author) {
        anyhow::bail!("You are not the author of this post.");
    }
    Ok(())
}
