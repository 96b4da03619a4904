//! Discord REST v10 client implementation.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::DiscordError;
use crate::types::{CurrentUser, Guild, GuildSnapshot, Member, Message, Role};

/// Default Discord API base URL.
pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// Page size for `GET /users/@me/guilds` (Discord's maximum).
const GUILD_PAGE_LIMIT: usize = 200;

/// Page size for `GET /guilds/{id}/members` (Discord's maximum).
const MEMBER_PAGE_LIMIT: usize = 1000;

/// Longest `retry_after` the client will sleep through before giving up and
/// surfacing the rate limit to the caller.
const MAX_RETRY_AFTER_SECS: f64 = 5.0;

/// Client for the Discord REST API, authenticated as a bot.
pub struct DiscordClient {
    http: Client,
    base_url: String,
    token: String,
}

impl DiscordClient {
    /// Create a new client for the given API base URL and bot token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// The API base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    /// Fetch the bot's own user. Used as a startup liveness/credentials check.
    pub async fn current_user(&self) -> Result<CurrentUser, DiscordError> {
        let response = self
            .execute(self.http.get(self.url("/users/@me")))
            .await?;
        Ok(response.json().await?)
    }

    /// List every guild the bot has joined, following pagination.
    pub async fn list_joined_guilds(&self) -> Result<Vec<Guild>, DiscordError> {
        let mut guilds: Vec<Guild> = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.url("/users/@me/guilds"))
                .query(&[("limit", GUILD_PAGE_LIMIT.to_string())]);
            if let Some(ref after) = after {
                request = request.query(&[("after", after)]);
            }

            let page: Vec<Guild> = self.execute(request).await?.json().await?;
            let full_page = page.len() >= GUILD_PAGE_LIMIT;
            after = page.last().map(|g| g.id.clone());
            guilds.extend(page);

            if !full_page {
                break;
            }
        }

        debug!(count = guilds.len(), "listed joined guilds");
        Ok(guilds)
    }

    /// List every member of a guild, following pagination.
    ///
    /// Requires the guild-members privileged intent on the bot application.
    pub async fn list_members(&self, guild_id: &str) -> Result<Vec<Member>, DiscordError> {
        let mut members: Vec<Member> = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.url(&format!("/guilds/{}/members", guild_id)))
                .query(&[("limit", MEMBER_PAGE_LIMIT.to_string())]);
            if let Some(ref after) = after {
                request = request.query(&[("after", after)]);
            }

            let page: Vec<Member> = self.execute(request).await?.json().await?;
            let full_page = page.len() >= MEMBER_PAGE_LIMIT;
            after = page.last().map(|m| m.user.id.clone());
            members.extend(page);

            if !full_page {
                break;
            }
        }

        debug!(guild_id, count = members.len(), "listed guild members");
        Ok(members)
    }

    /// Fetch the full member roster of a guild as a reconciliation snapshot.
    pub async fn guild_snapshot(&self, guild_id: &str) -> Result<GuildSnapshot, DiscordError> {
        let members = self.list_members(guild_id).await?;
        Ok(GuildSnapshot {
            guild_id: guild_id.to_string(),
            members,
        })
    }

    /// List a guild's roles.
    pub async fn guild_roles(&self, guild_id: &str) -> Result<Vec<Role>, DiscordError> {
        let response = self
            .execute(self.http.get(self.url(&format!("/guilds/{}/roles", guild_id))))
            .await?;
        Ok(response.json().await?)
    }

    /// Grant a role to a guild member.
    pub async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), DiscordError> {
        let path = format!("/guilds/{}/members/{}/roles/{}", guild_id, user_id, role_id);
        self.execute(self.http.put(self.url(&path))).await?;
        Ok(())
    }

    /// Revoke a role from a guild member.
    pub async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), DiscordError> {
        let path = format!("/guilds/{}/members/{}/roles/{}", guild_id, user_id, role_id);
        self.execute(self.http.delete(self.url(&path))).await?;
        Ok(())
    }

    /// Post a message to a channel.
    pub async fn create_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<Message, DiscordError> {
        let response = self
            .execute(
                self.http
                    .post(self.url(&format!("/channels/{}/messages", channel_id)))
                    .json(&serde_json::json!({ "content": content })),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// Send a request with the bot authorization header, retrying once on a
    /// short rate limit.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, DiscordError> {
        let request = request.header("Authorization", self.authorization());
        let retry = request.try_clone();

        match Self::check(request.send().await?).await {
            Err(DiscordError::RateLimited { retry_after_secs })
                if retry_after_secs <= MAX_RETRY_AFTER_SECS =>
            {
                let Some(retry) = retry else {
                    return Err(DiscordError::RateLimited { retry_after_secs });
                };
                debug!(retry_after_secs, "rate limited, retrying once");
                tokio::time::sleep(Duration::from_secs_f64(retry_after_secs)).await;
                Self::check(retry.send().await?).await
            }
            other => other,
        }
    }

    /// Map non-success statuses onto `DiscordError`.
    async fn check(response: Response) -> Result<Response, DiscordError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            #[derive(Deserialize)]
            struct RateLimitBody {
                retry_after: f64,
            }

            let retry_after_secs = response
                .json::<RateLimitBody>()
                .await
                .map(|b| b.retry_after)
                .unwrap_or(1.0);
            return Err(DiscordError::RateLimited { retry_after_secs });
        }

        let resource = response.url().path().to_string();

        #[derive(Deserialize)]
        struct ApiErrorBody {
            #[serde(default)]
            code: u64,
            #[serde(default)]
            message: String,
        }

        let body: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
            code: 0,
            message: String::new(),
        });

        if status == StatusCode::NOT_FOUND {
            return Err(DiscordError::NotFound { resource });
        }

        Err(DiscordError::Api {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn member_json(id: u64, roles: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "user": {"id": id.to_string(), "username": format!("user-{}", id)},
            "roles": roles,
        })
    }

    #[test]
    fn test_client_creation_trims_trailing_slash() {
        let client = DiscordClient::new("https://example.com/api/", "token");
        assert_eq!(client.base_url(), "https://example.com/api");
    }

    #[tokio::test]
    async fn test_current_user() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .and(header("Authorization", "Bot test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "12345",
                "username": "polpetta"
            })))
            .mount(&mock_server)
            .await;

        let client = DiscordClient::new(mock_server.uri(), "test-token");
        let user = client.current_user().await.unwrap();

        assert_eq!(user.id, "12345");
        assert_eq!(user.username, "polpetta");
    }

    #[tokio::test]
    async fn test_api_error_mapping() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "code": 50013,
                "message": "Missing Permissions"
            })))
            .mount(&mock_server)
            .await;

        let client = DiscordClient::new(mock_server.uri(), "test-token");
        let err = client.add_member_role("1", "2", "3").await.unwrap_err();

        match err {
            DiscordError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 403);
                assert_eq!(code, 50013);
                assert_eq!(message, "Missing Permissions");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_mapping() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": 10007,
                "message": "Unknown Member"
            })))
            .mount(&mock_server)
            .await;

        let client = DiscordClient::new(mock_server.uri(), "test-token");
        let err = client.remove_member_role("1", "2", "3").await.unwrap_err();

        assert!(matches!(err, DiscordError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_add_member_role_no_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/guilds/1/members/2/roles/3"))
            .and(header("Authorization", "Bot test-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = DiscordClient::new(mock_server.uri(), "test-token");
        client.add_member_role("1", "2", "3").await.unwrap();
    }

    #[tokio::test]
    async fn test_create_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/channels/55/messages"))
            .and(body_json(serde_json::json!({"content": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "900",
                "channel_id": "55",
                "content": "hello"
            })))
            .mount(&mock_server)
            .await;

        let client = DiscordClient::new(mock_server.uri(), "test-token");
        let message = client.create_message("55", "hello").await.unwrap();

        assert_eq!(message.id, "900");
        assert_eq!(message.channel_id, "55");
    }

    #[tokio::test]
    async fn test_list_members_single_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/guilds/1/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                member_json(1, &["10"]),
                member_json(2, &[]),
            ])))
            .mount(&mock_server)
            .await;

        let client = DiscordClient::new(mock_server.uri(), "test-token");
        let members = client.list_members("1").await.unwrap();

        assert_eq!(members.len(), 2);
        assert!(members[0].has_role("10"));
    }

    #[tokio::test]
    async fn test_list_members_paginates() {
        let mock_server = MockServer::start().await;

        // First page: a full MEMBER_PAGE_LIMIT entries.
        let first_page: Vec<serde_json::Value> = (1..=MEMBER_PAGE_LIMIT as u64)
            .map(|id| member_json(id, &[]))
            .collect();
        let last_id = MEMBER_PAGE_LIMIT.to_string();

        Mock::given(method("GET"))
            .and(path("/guilds/1/members"))
            .and(query_param_is_missing("after"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
            .expect(1)
            .mount(&mock_server)
            .await;

        // Second page: cursor after the last id of the first page.
        Mock::given(method("GET"))
            .and(path("/guilds/1/members"))
            .and(query_param("after", last_id))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                member_json(MEMBER_PAGE_LIMIT as u64 + 1, &[]),
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = DiscordClient::new(mock_server.uri(), "test-token");
        let members = client.list_members("1").await.unwrap();

        assert_eq!(members.len(), MEMBER_PAGE_LIMIT + 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_once() {
        let mock_server = MockServer::start().await;

        // 429 for the first call only, then 204.
        Mock::given(method("PUT"))
            .and(path("/guilds/1/members/2/roles/3"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({"retry_after": 0.01})),
            )
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/guilds/1/members/2/roles/3"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = DiscordClient::new(mock_server.uri(), "test-token");
        client.add_member_role("1", "2", "3").await.unwrap();
    }

    #[tokio::test]
    async fn test_long_rate_limit_surfaces() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(serde_json::json!({"retry_after": 120.0})),
            )
            .mount(&mock_server)
            .await;

        let client = DiscordClient::new(mock_server.uri(), "test-token");
        let err = client.add_member_role("1", "2", "3").await.unwrap_err();

        match err {
            DiscordError::RateLimited { retry_after_secs } => {
                assert_eq!(retry_after_secs, 120.0);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }
}
