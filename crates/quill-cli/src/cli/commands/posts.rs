//! Post command handlers.

use anyhow::{Context, Result};
use quill_core::api::{Page, PostDraft};
use quill_core::auth;

use super::App;
use crate::views;

/// Prints one page of posts. A failed fetch is reported on stderr and the
/// empty page is shown.
pub async fn list(app: &App, page: u32, page_size: Option<u32>) {
    let page_size = page_size.unwrap_or(app.page_size);
    let listing = match app.api.list_posts(page, page_size).await {
        Ok(listing) => listing,
        Err(e) => {
            tracing::warn!(error = %e, page, page_size, "failed to load posts");
            eprintln!("Load posts failed: {e}");
            Page::empty(page_size)
        }
    };

    println!("{}", views::nav_line(app.store.state()));
    println!();
    println!("{}", views::post_list(&listing, app.time));
}

pub async fn show(app: &App, id: i64) -> Result<()> {
    let post = app.api.get_post(id).await.context("Load post failed")?;
    print!("{}", views::post_detail(&post, app.store.state(), app.time));
    Ok(())
}

pub async fn create(app: &App, title: &str, content: &str) -> Result<()> {
    let created = async {
        let token = auth::require_login(app.store.state(), "Please login to create posts")?;
        let draft = PostDraft::new(title, content);
        draft.validate()?;
        Ok::<_, anyhow::Error>(app.api.create_post(&draft, Some(token)).await?)
    }
    .await
    .context("Create post failed")?;

    tracing::info!(post_id = created.id, "created post");
    println!("Created post #{}", created.id);
    Ok(())
}

pub async fn edit(app: &App, id: i64, title: Option<&str>, content: Option<&str>) -> Result<()> {
    let updated = async {
        let session = app.store.state();
        let token = auth::require_login(session, "Please login to edit posts")?;
        let post = app.api.get_post(id).await?;
        auth::ensure_author(session, &post)?;

        let draft = PostDraft::merged_over(&post, title, content);
        draft.validate()?;
        Ok::<_, anyhow::Error>(app.api.update_post(id, &draft, Some(token)).await?)
    }
    .await
    .context("Update post failed")?;

    tracing::info!(post_id = updated.id, "updated post");
    println!("Updated post #{}", updated.id);
    Ok(())
}

pub async fn delete(app: &App, id: i64) -> Result<()> {
    async {
        let session = app.store.state();
        let token = auth::require_login(session, "Please login to delete posts")?;
        let post = app.api.get_post(id).await?;
        auth::ensure_author(session, &post)?;
        app.api.delete_post(id, Some(token)).await?;
        Ok::<_, anyhow::Error>(())
    }
    .await
    .context("Delete post failed")?;

    tracing::info!(post_id = id, "deleted post");
    println!("Deleted post #{id}");
    Ok(())
}
