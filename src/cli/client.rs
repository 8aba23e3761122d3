use anyhow::{anyhow, Context};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::auth::TOKEN_HEADER;
use crate::database::models::Battle;
use crate::filter::SearchFilter;

/// Thin HTTP client over the Battle Stats API.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(server: &str, token: Option<String>) -> anyhow::Result<Self> {
        let mut base = Url::parse(server).with_context(|| format!("invalid server URL '{}'", server))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("invalid server URL '{}'", server));
        }
        // Paths are joined relative to the base, so it must end in a slash
        // for a mount prefix like `/battles` to survive.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            token,
        })
    }

    /// `path` is relative (`api/count`) and resolves under the server base.
    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).with_context(|| format!("invalid path '{}'", path))
    }

    fn authorized(&self, request: RequestBuilder) -> anyhow::Result<RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("no access token; pass --token or set BATTLE_API_TOKEN"))?;
        Ok(request.header(TOKEN_HEADER, token))
    }

    pub async fn generate_token(&self, uname: &str) -> anyhow::Result<String> {
        let response = self
            .http
            .post(self.url("api/generate-token")?)
            .json(&json!({ "uname": uname }))
            .send()
            .await?;
        let body: Value = checked(response).await?.json().await?;
        body.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("response carried no token"))
    }

    pub async fn count(&self) -> anyhow::Result<String> {
        let response = self.authorized(self.http.get(self.url("api/count")?))?.send().await?;
        Ok(checked(response).await?.text().await?)
    }

    pub async fn list(&self) -> anyhow::Result<Vec<String>> {
        self.get_json("api/list", &[]).await
    }

    pub async fn search(&self, search: &SearchFilter) -> anyhow::Result<Vec<Battle>> {
        let mut query = Vec::new();
        if let Some(king) = &search.king {
            query.push(("king", king.as_str()));
        }
        if let Some(location) = &search.location {
            query.push(("location", location.as_str()));
        }
        if let Some(battle_type) = &search.battle_type {
            query.push(("type", battle_type.as_str()));
        }
        self.get_json("api/search", &query).await
    }

    /// Raw JSON so the `""` sentinels survive printing.
    pub async fn stats(&self) -> anyhow::Result<Value> {
        self.get_json("api/stats", &[]).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<T> {
        let request = self.authorized(self.http.get(self.url(path)?).query(query))?;
        let response = checked(request.send().await?).await?;
        Ok(response.json().await?)
    }
}

/// Turns a non-2xx response into an error carrying status and server message.
async fn checked(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"));
    Err(anyhow!("{} {}", status.as_u16(), message))
}
