//! Shared helpers for CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};

/// `quill` isolated in `home` and pointed at `base_url`.
pub fn quill(home: &Path, base_url: &str) -> Command {
    let mut cmd = cargo_bin_cmd!("quill");
    cmd.env("QUILL_HOME", home)
        .env("PUBLIC_API_BASE", base_url)
        .env("QUILL_ENVIRONMENT", "client")
        .env_remove("INTERNAL_API_BASE")
        .env_remove("QUILL_PASSWORD");
    cmd
}

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Unsigned token with the given claim set.
pub fn jwt(claims: &Value) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// Writes a logged-in session for `user_id` into `home`.
pub fn write_session(home: &Path, user_id: i64, username: &str) -> String {
    let access = jwt(&json!({"sub": user_id.to_string(), "username": username}));
    let session = json!({
        "access": access,
        "refresh": "refresh-token",
        "user": {"id": user_id, "username": username}
    });
    fs::write(home.join("auth.json"), session.to_string()).unwrap();
    access
}

pub fn read_session(home: &Path) -> Value {
    let raw = fs::read_to_string(home.join("auth.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

pub fn post_json(id: i64, author: i64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "content": format!("Content of {title}"),
        "author": author,
        "created_at": "2025-01-05T09:42:00Z"
    })
}
