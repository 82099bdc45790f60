//! Typed blog endpoints on top of [`ApiClient`].

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::{ApiClient, ApiResult, Payload, RequestOptions};

/// A blog post as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Id of the owning user
    pub author: i64,
    /// ISO 8601 creation time
    #[serde(default)]
    pub created_at: String,
}

/// One page of the post listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub results: Vec<Post>,
}

impl Default for Page {
    fn default() -> Self {
        Self::empty(10)
    }
}

impl Page {
    /// Page shown when the listing cannot be fetched.
    pub fn empty(page_size: u32) -> Self {
        Self {
            count: 0,
            page: 1,
            page_size,
            total_pages: 0,
            results: Vec::new(),
        }
    }
}

/// Navigation state of a page: which neighbours can be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub page: u32,
    pub total_pages: u32,
    pub count: u64,
    pub page_size: u32,
}

impl Pager {
    pub fn new(page: &Page) -> Self {
        Self {
            page: page.page,
            total_pages: page.total_pages,
            count: page.count,
            page_size: page.page_size,
        }
    }

    pub fn first(&self) -> Option<u32> {
        (self.page != 1).then_some(1)
    }

    pub fn prev(&self) -> Option<u32> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn next(&self) -> Option<u32> {
        (self.page < self.total_pages).then(|| self.page + 1)
    }

    pub fn last(&self) -> Option<u32> {
        let last = self.total_pages.max(1);
        (self.page != last).then_some(last)
    }
}

/// Title and content of a post being created or edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    /// Creates a draft with surrounding whitespace trimmed.
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        }
    }

    /// Builds an edit draft: omitted or blank fields keep the post's values.
    pub fn merged_over(post: &Post, title: Option<&str>, content: Option<&str>) -> Self {
        let pick = |new: Option<&str>, current: &str| {
            new.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(current)
                .to_string()
        };
        Self {
            title: pick(title, &post.title),
            content: pick(content, &post.content),
        }
    }

    /// # Errors
    /// Returns an error if the title or content is empty.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.title.is_empty() || self.content.is_empty() {
            anyhow::bail!("Title and content are required");
        }
        Ok(())
    }
}

/// Access and refresh tokens from a login response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPair {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl TokenPair {
    /// Reads `tokens.access` / `tokens.refresh`; anything missing or
    /// non-string is `None`.
    pub fn from_payload(payload: &Payload) -> Self {
        let tokens = payload.as_json().and_then(|v| v.get("tokens"));
        let field = |key: &str| {
            tokens
                .and_then(|t| t.get(key))
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        };
        Self {
            access: field("access"),
            refresh: field("refresh"),
        }
    }
}

/// Blog API endpoints.
#[derive(Debug, Clone)]
pub struct BlogApi {
    client: ApiClient,
}

impl BlogApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `POST /login/`; the body carries `tokens.access` / `tokens.refresh`.
    ///
    /// # Errors
    /// Returns an [`crate::http::ApiError`] if the request fails.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Payload> {
        let body = json!({ "username": username, "password": password });
        self.client
            .post("/login/", Some(&body), &RequestOptions::default())
            .await
    }

    /// `POST /register/`.
    ///
    /// # Errors
    /// Returns an [`crate::http::ApiError`] if the request fails.
    pub async fn register(&self, username: &str, password: &str) -> ApiResult<Payload> {
        let body = json!({ "username": username, "password": password });
        self.client
            .post("/register/", Some(&body), &RequestOptions::default())
            .await
    }

    /// `GET /posts/?page=&page_size=`.
    ///
    /// # Errors
    /// Returns an [`crate::http::ApiError`] if the request fails or the body
    /// is not a page.
    pub async fn list_posts(&self, page: u32, page_size: u32) -> ApiResult<Page> {
        let path = format!("/posts/?page={page}&page_size={page_size}");
        self.client
            .get(&path, &RequestOptions::default())
            .await?
            .decode()
    }

    /// `GET /posts/{id}`.
    ///
    /// # Errors
    /// Returns an [`crate::http::ApiError`] if the request fails or the body
    /// is not a post.
    pub async fn get_post(&self, id: i64) -> ApiResult<Post> {
        self.client
            .get(&format!("/posts/{id}"), &RequestOptions::default())
            .await?
            .decode()
    }

    /// `POST /posts/` (authenticated).
    ///
    /// # Errors
    /// Returns an [`crate::http::ApiError`] if the request fails.
    pub async fn create_post(&self, draft: &PostDraft, token: Option<&str>) -> ApiResult<Post> {
        let body = json!({ "title": draft.title, "content": draft.content });
        self.client
            .post("/posts/", Some(&body), &RequestOptions::bearer(token))
            .await?
            .decode()
    }

    /// `PUT /posts/{id}` (authenticated, author only).
    ///
    /// # Errors
    /// Returns an [`crate::http::ApiError`] if the request fails.
    pub async fn update_post(
        &self,
        id: i64,
        draft: &PostDraft,
        token: Option<&str>,
    ) -> ApiResult<Post> {
        let body = json!({ "title": draft.title, "content": draft.content });
        self.client
            .put(&format!("/posts/{id}"), Some(&body), &RequestOptions::bearer(token))
            .await?
            .decode()
    }

    /// `DELETE /posts/{id}` (authenticated, author only). The response body
    /// is ignored.
    ///
    /// # Errors
    /// Returns an [`crate::http::ApiError`] if the request fails.
    pub async fn delete_post(&self, id: i64, token: Option<&str>) -> ApiResult<()> {
        self.client
            .delete(&format!("/posts/{id}"), &RequestOptions::bearer(token))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::context::ClientContext;
    use crate::http::ApiErrorKind;

    fn post_json(id: i64, author: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": format!("Post {id}"),
            "content": "Body",
            "author": author,
            "created_at": "2025-01-05T09:42:00Z"
        })
    }

    fn api_for(server: &MockServer) -> BlogApi {
        BlogApi::new(ApiClient::new(&ClientContext::client(server.uri())).unwrap())
    }

    #[tokio::test]
    async fn test_list_posts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 25,
                "page": 2,
                "page_size": 10,
                "total_pages": 3,
                "results": [post_json(11, 1), post_json(12, 2)]
            })))
            .mount(&server)
            .await;

        let page = api_for(&server).list_posts(2, 10).await.unwrap();
        assert_eq!(page.count, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[1].author, 2);
    }

    #[tokio::test]
    async fn test_get_post_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/7"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
            .mount(&server)
            .await;

        let err = api_for(&server).get_post(7).await.unwrap_err();
        assert_eq!(err.message, "not found");
        assert_eq!(err.status, Some(404));
    }

    #[tokio::test]
    async fn test_get_post_wrong_shape_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "seven"})))
            .mount(&server)
            .await;

        let err = api_for(&server).get_post(7).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_create_post_sends_token_and_draft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/posts/"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({"title": "Hello", "content": "World"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(post_json(5, 1)))
            .expect(1)
            .mount(&server)
            .await;

        let draft = PostDraft::new("  Hello ", "World\n");
        let post = api_for(&server)
            .create_post(&draft, Some("tok"))
            .await
            .unwrap();
        assert_eq!(post.id, 5);
    }

    #[tokio::test]
    async fn test_update_and_delete_post() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/posts/5"))
            .and(body_json(json!({"title": "New", "content": "Body"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(post_json(5, 1)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/posts/5"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let draft = PostDraft::new("New", "Body");
        api.update_post(5, &draft, Some("tok")).await.unwrap();
        api.delete_post(5, Some("tok")).await.unwrap();
    }

    #[test]
    fn test_pager_middle_page() {
        let pager = Pager {
            page: 2,
            total_pages: 3,
            count: 25,
            page_size: 10,
        };
        assert_eq!(pager.prev(), Some(1));
        assert_eq!(pager.next(), Some(3));
        assert_eq!(pager.first(), Some(1));
        assert_eq!(pager.last(), Some(3));
    }

    #[test]
    fn test_pager_first_and_last_pages() {
        let first = Pager {
            page: 1,
            total_pages: 3,
            count: 25,
            page_size: 10,
        };
        assert_eq!(first.prev(), None);
        assert_eq!(first.first(), None);
        assert_eq!(first.next(), Some(2));

        let last = Pager { page: 3, ..first };
        assert_eq!(last.next(), None);
        assert_eq!(last.last(), None);
        assert_eq!(last.prev(), Some(2));
    }

    #[test]
    fn test_pager_empty_listing() {
        let pager = Pager::new(&Page::empty(10));
        assert_eq!(pager.first(), None);
        assert_eq!(pager.prev(), None);
        assert_eq!(pager.next(), None);
        assert_eq!(pager.last(), None);
    }

    #[test]
    fn test_page_defaults_for_missing_fields() {
        let page: Page = serde_json::from_value(json!({"results": []})).unwrap();
        assert_eq!(page, Page::empty(10));
    }

    #[test]
    fn test_draft_validation() {
        assert!(PostDraft::new("  ", "x").validate().is_err());
        assert!(PostDraft::new("x", "").validate().is_err());
        assert!(PostDraft::new("x", "y").validate().is_ok());
    }

    #[test]
    fn test_draft_merged_over_post() {
        let post: Post = serde_json::from_value(post_json(1, 1)).unwrap();
        let draft = PostDraft::merged_over(&post, Some(" New title "), None);
        assert_eq!(draft.title, "New title");
        assert_eq!(draft.content, "Body");

        let draft = PostDraft::merged_over(&post, Some("  "), Some("Text"));
        assert_eq!(draft.title, "Post 1");
        assert_eq!(draft.content, "Text");
    }

    #[test]
    fn test_token_pair_from_payload() {
        let payload = Payload::Json(json!({"tokens": {"access": "a", "refresh": "r"}}));
        assert_eq!(
            TokenPair::from_payload(&payload),
            TokenPair {
                access: Some("a".to_string()),
                refresh: Some("r".to_string()),
            }
        );

        let payload = Payload::Json(json!({"tokens": {"access": 5}}));
        assert_eq!(TokenPair::from_payload(&payload), TokenPair::default());
        assert_eq!(
            TokenPair::from_payload(&Payload::Text("ok".to_string())),
            TokenPair::default()
        );
    }
}
