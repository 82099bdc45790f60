//! Session command handlers.

use anyhow::{Context, Result};
use quill_core::auth;
use quill_core::session::Session;

use super::App;
use crate::views;

/// Notice printed instead of re-authenticating an active session.
fn already_logged_in(session: &Session) -> Option<String> {
    session.is_authenticated().then(|| {
        format!(
            "Already logged in as {}. Run `quill logout` first.",
            session.username().unwrap_or("user")
        )
    })
}

pub async fn login(app: &mut App, username: &str, password: &str) -> Result<()> {
    if let Some(notice) = already_logged_in(app.store.state()) {
        println!("{notice}");
        return Ok(());
    }

    let session = auth::login(&app.api, &mut app.store, username, password)
        .await
        .context("Login failed")?;
    println!("Logged in as {}", session.username().unwrap_or(username));
    Ok(())
}

pub async fn register(app: &mut App, username: &str, password: &str) -> Result<()> {
    if let Some(notice) = already_logged_in(app.store.state()) {
        println!("{notice}");
        return Ok(());
    }

    auth::register(&app.api, &mut app.store, username, password)
        .await
        .context("Registration failed")?;
    println!("Registered successfully. Please login now.");
    Ok(())
}

pub fn logout(app: &mut App) {
    auth::logout(&mut app.store);
    println!("Logged out.");
}

pub fn whoami(app: &App) {
    println!("{}", views::whoami(app.store.state(), app.time));
}
