//! Terminal renderers. Everything renders to a `String` so commands only
//! decide where it goes.

use std::fmt::Write;

use quill_core::api::{Page, Pager, Post};
use quill_core::config::TimeDisplay;
use quill_core::datetime::{TimeLabel, Timestamp};
use quill_core::session::Session;
use quill_core::token::{decode_claims, mask_token};

const PREVIEW_LINES: usize = 3;

/// How timestamps are labelled in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMode {
    Utc,
    Local,
}

impl TimeMode {
    pub fn new(force_utc: bool, display: TimeDisplay) -> Self {
        if force_utc || display == TimeDisplay::Utc {
            Self::Utc
        } else {
            Self::Local
        }
    }

    pub fn label<T: Timestamp + ?Sized>(self, value: &T) -> TimeLabel {
        let mut label = TimeLabel::new(value);
        if self == Self::Local {
            label.localize();
        }
        label
    }
}

/// Greeting line shown above command output.
pub fn nav_line(session: &Session) -> String {
    if session.is_authenticated() {
        format!("Hello, {}", session.username().unwrap_or("user"))
    } else {
        "Not logged in".to_string()
    }
}

pub fn whoami(session: &Session, time: TimeMode) -> String {
    let mut out = nav_line(session);
    let Some(access) = session.access.as_deref() else {
        return out;
    };

    let user_id = session
        .user_id()
        .map_or_else(|| "unknown".to_string(), |id| id.to_string());
    let _ = writeln!(out);
    let _ = writeln!(out, "User id:       {user_id}");
    let _ = write!(out, "Access token:  {}", mask_token(access));

    if let Some(expiry) = decode_claims(access).and_then(|claims| claims.expiry()) {
        let _ = write!(out, "\nToken expires: {}", time.label(&expiry));
    }
    out
}

/// First lines of a post body, with an ellipsis when cut.
pub fn preview(content: &str, max_lines: usize) -> String {
    let mut lines = content.lines();
    let mut text = lines.by_ref().take(max_lines).collect::<Vec<_>>().join("\n");
    if lines.next().is_some() {
        text.push_str(" ...");
    }
    text
}

fn byline(post: &Post, time: TimeMode) -> String {
    let label = time.label(post.created_at.as_str());
    if label.text().is_empty() {
        format!("by user {}", post.author)
    } else {
        format!("by user {} on {label}", post.author)
    }
}

/// `Page P / T (C)` followed by the navigation targets that are enabled.
pub fn pager_line(pager: &Pager) -> String {
    let mut line = format!(
        "Page {} / {} ({})",
        pager.page, pager.total_pages, pager.count
    );
    let hints = [
        ("first", pager.first()),
        ("prev", pager.prev()),
        ("next", pager.next()),
        ("last", pager.last()),
    ];
    for (name, target) in hints {
        if let Some(page) = target {
            let _ = write!(line, "  {name}: --page {page}");
        }
    }
    line
}

pub fn post_list(page: &Page, time: TimeMode) -> String {
    let mut out = String::new();
    if page.results.is_empty() {
        out.push_str("No posts yet.\n");
    }

    for post in &page.results {
        let _ = writeln!(out, "#{}  {}", post.id, post.title);
        let _ = writeln!(out, "    {}", byline(post, time));
        for line in preview(&post.content, PREVIEW_LINES).lines() {
            let _ = writeln!(out, "    {line}");
        }
        out.push('\n');
    }

    out.push_str(&pager_line(&Pager::new(page)));
    out
}

/// Full post. Edit and delete hints are shown only to the author.
pub fn post_detail(post: &Post, session: &Session, time: TimeMode) -> String {
    let mut out = format!("{}\n{}\n\n{}\n", post.title, byline(post, time), post.content);
    if session.is_author_of(post.author) {
        let _ = write!(
            out,
            "\nEdit:   quill posts edit {id} --title <TITLE> --content <CONTENT>\nDelete: quill posts delete {id}\n",
            id = post.id
        );
    }
    out
}
