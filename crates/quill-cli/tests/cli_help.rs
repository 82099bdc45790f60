use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("quill")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("posts"));
}

#[test]
fn test_posts_help_shows_subcommands() {
    cargo_bin_cmd!("quill")
        .args(["posts", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("new"))
        .stdout(predicate::str::contains("edit"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn test_posts_list_rejects_page_zero() {
    cargo_bin_cmd!("quill")
        .args(["posts", "list", "--page", "0"])
        .assert()
        .failure();
}

#[test]
fn test_login_requires_password() {
    cargo_bin_cmd!("quill")
        .env_remove("QUILL_PASSWORD")
        .args(["login", "-u", "amy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--password"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("quill")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
