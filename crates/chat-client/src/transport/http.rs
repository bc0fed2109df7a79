//! REST backend over reqwest

use std::time::Duration;

use async_trait::async_trait;
use chat_core::protocol::{ChatResponse, MessagePage};
use chat_core::Snowflake;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ChatBackend;
use crate::error::{ClientError, ClientResult};

const CALLER_HEADER: &str = "x-user-id";

/// Talks to the gateway's REST surface as one user
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    client: Client,
    base_url: String,
    user_id: Snowflake,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenChatBody {
    friend_id: Snowflake,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl HttpChatBackend {
    /// `base_url` is the gateway origin, e.g. `http://127.0.0.1:5000`
    pub fn new(base_url: impl Into<String>, user_id: Snowflake) -> ClientResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self::with_client(client, base_url, user_id))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, user_id: Snowflake) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id,
        }
    }

    pub fn user_id(&self) -> Snowflake {
        self.user_id
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { error }) => {
                ClientError::rejected(Some(status.as_u16()), error.code, error.message)
            }
            Err(_) => ClientError::rejected(Some(status.as_u16()), "HTTP_ERROR", body),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn get_or_create_chat(&self, friend_id: Snowflake) -> ClientResult<ChatResponse> {
        let response = self
            .client
            .post(self.url("/chats"))
            .header(CALLER_HEADER, self.user_id.to_string())
            .json(&OpenChatBody { friend_id })
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn list_messages(
        &self,
        chat_id: Snowflake,
        cursor: Option<Snowflake>,
        limit: i64,
    ) -> ClientResult<MessagePage> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let response = self
            .client
            .get(self.url(&format!("/chats/{chat_id}/messages")))
            .header(CALLER_HEADER, self.user_id.to_string())
            .query(&query)
            .send()
            .await?;
        Self::parse(response).await
    }
}
