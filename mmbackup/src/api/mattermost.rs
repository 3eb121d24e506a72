use crate::credentials::{AuthMethod, Credentials};
use crate::models::*;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

const API_PATH: &str = "/api/v4";

#[async_trait]
pub trait MattermostApi: Send + Sync {
    async fn login(&mut self, credentials: &Credentials) -> Result<()>;
    async fn logout(&self) -> Result<()>;
    async fn get_user(&self, user_id: &str) -> Result<User>;
    async fn get_user_teams(&self, user_id: &str) -> Result<Vec<Team>>;
    async fn get_channels_for_user(&self, user_id: &str, team_id: &str) -> Result<Vec<Channel>>;
    async fn get_posts_for_channel(&self, channel_id: &str, page: u32) -> Result<PostList>;
    async fn get_file(&self, file_id: &str) -> Result<Vec<u8>>;
}

pub struct MattermostClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl MattermostClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// `url` is normally a bare host name; one that already carries a scheme
    /// is used unchanged and `scheme`/`port` are ignored.
    pub fn base_url_for(scheme: &str, url: &str, port: u16) -> String {
        let url = url.trim_end_matches('/');
        if url.contains("://") {
            url.to_string()
        } else {
            format!("{}://{}:{}", scheme, url, port)
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PATH, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.endpoint(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.endpoint(path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = check_status(self.get(path).send().await?, path).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to decode response of {}", path))
    }
}

async fn check_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(anyhow!(
            "request {} failed with status {}: {}",
            path,
            status,
            error_text
        ));
    }

    Ok(response)
}

#[async_trait]
impl MattermostApi for MattermostClient {
    async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        match credentials.auth_method()? {
            AuthMethod::Token(token) => {
                self.token = Some(token.to_string());
                let me: User = self
                    .get_json("/users/me")
                    .await
                    .context("Token authentication failed")?;
                debug!("authenticated by token as {}", me.id);
            }
            AuthMethod::Password {
                login_id,
                password,
                mfa_token,
            } => {
                let mut body = serde_json::json!({
                    "login_id": login_id,
                    "password": password,
                });

                if let Some(mfa_token) = mfa_token {
                    body["token"] = serde_json::Value::String(mfa_token.to_string());
                }

                let response = self.post("/users/login").json(&body).send().await?;
                let response = check_status(response, "/users/login")
                    .await
                    .context("Login failed")?;

                let token = response
                    .headers()
                    .get("Token")
                    .and_then(|h| h.to_str().ok())
                    .ok_or_else(|| anyhow!("Login response carries no session token"))?
                    .to_string();
                self.token = Some(token);
                debug!("logged in as {}", login_id);
            }
        }

        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let response = self.post("/users/logout").send().await?;
        check_status(response, "/users/logout").await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<User> {
        self.get_json(&format!("/users/{}", user_id)).await
    }

    async fn get_user_teams(&self, user_id: &str) -> Result<Vec<Team>> {
        self.get_json(&format!("/users/{}/teams", user_id)).await
    }

    async fn get_channels_for_user(&self, user_id: &str, team_id: &str) -> Result<Vec<Channel>> {
        self.get_json(&format!("/users/{}/teams/{}/channels", user_id, team_id))
            .await
    }

    async fn get_posts_for_channel(&self, channel_id: &str, page: u32) -> Result<PostList> {
        self.get_json(&format!("/channels/{}/posts?page={}", channel_id, page))
            .await
    }

    async fn get_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let path = format!("/files/{}", file_id);
        let response = check_status(self.get(&path).send().await?, &path).await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to download file {}", file_id))?;
        Ok(bytes.to_vec())
    }
}
