//! Bitable field API gateway.
//!
//! Uses the `open-apis/bitable/v1` field endpoints for list, create and update.

use super::remote::RemoteFieldGateway;
use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use fieldsync_types::{FieldConfiguration, FieldDescriptor, Properties, TableRef};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Envelope code the service uses for request frequency limits.
const RATE_LIMIT_CODE: i64 = 99991400;
/// Header carrying the seconds until the rate-limit window resets.
const RATELIMIT_RESET_HEADER: &str = "x-ogw-ratelimit-reset";

/// Bitable gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BitableConfig {
    /// Base URL of the open API (e.g. `https://open.feishu.cn`).
    pub api_base_url: String,
    /// Items requested per list page.
    pub page_size: u32,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for BitableConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://open.feishu.cn".to_string(),
            page_size: 100,
            request_timeout_secs: 30,
        }
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct FieldPage {
    #[serde(default)]
    items: Vec<WireField>,
    #[serde(default)]
    has_more: bool,
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FieldEnvelope {
    field: WireField,
}

#[derive(Debug, Deserialize)]
struct WireField {
    field_id: String,
    field_name: String,
    #[serde(rename = "type")]
    type_code: i32,
    #[serde(default)]
    ui_type: Option<String>,
    #[serde(default)]
    is_primary: bool,
    #[serde(default)]
    property: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
}

#[derive(Debug, Serialize)]
struct WireFieldRequest<'a> {
    field_name: &'a str,
    #[serde(rename = "type")]
    type_code: i32,
    #[serde(skip_serializing_if = "str::is_empty")]
    ui_type: &'a str,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    property: &'a Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<WireDescription<'a>>,
}

#[derive(Debug, Serialize)]
struct WireDescription<'a> {
    text: &'a str,
}

impl<'a> From<&'a FieldConfiguration> for WireFieldRequest<'a> {
    fn from(config: &'a FieldConfiguration) -> Self {
        Self {
            field_name: &config.name,
            type_code: config.type_code,
            ui_type: &config.ui_type,
            property: &config.properties,
            description: config
                .description
                .as_deref()
                .map(|text| WireDescription { text }),
        }
    }
}

impl From<WireField> for FieldDescriptor {
    fn from(field: WireField) -> Self {
        let properties = match field.property {
            Some(Value::Object(map)) => map,
            _ => Properties::new(),
        };
        // Descriptions arrive either as `{ "text": ... }` or as a bare string.
        let description = match field.description {
            Some(Value::Object(obj)) => obj
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string),
            Some(Value::String(text)) => Some(text),
            _ => None,
        };

        FieldDescriptor {
            id: field.field_id,
            name: field.field_name,
            type_code: field.type_code,
            ui_type: field.ui_type.unwrap_or_default(),
            is_primary: field.is_primary,
            properties,
            description,
        }
    }
}

/// HTTP gateway for the Bitable field API.
pub struct BitableGateway {
    config: BitableConfig,
    client: Client,
    access_token: Arc<RwLock<Option<String>>>,
}

impl BitableGateway {
    /// Creates a new gateway without credentials.
    pub fn new(config: BitableConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self {
            config,
            client,
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets the bearer token applied to every call.
    pub async fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().await = Some(token.into());
    }

    /// Returns whether a token has been set.
    pub async fn is_authenticated(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    pub fn config(&self) -> &BitableConfig {
        &self.config
    }

    async fn token(&self) -> GatewayResult<String> {
        self.access_token
            .read()
            .await
            .clone()
            .ok_or_else(|| GatewayError::Unauthorized("no access token set".to_string()))
    }

    fn fields_url(&self, table: &TableRef) -> String {
        format!(
            "{}/open-apis/bitable/v1/apps/{}/tables/{}/fields",
            self.config.api_base_url.trim_end_matches('/'),
            urlencoding::encode(&table.app_token),
            urlencoding::encode(&table.table_id)
        )
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    ["retry-after", RATELIMIT_RESET_HEADER]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.trim().parse().ok())
}

/// Classifies a response and unwraps the envelope's `data`.
async fn read_envelope<T: DeserializeOwned>(response: Response, action: &str) -> GatewayResult<T> {
    let status = response.status();
    let retry_after = retry_after_secs(response.headers());
    let body = response.text().await?;

    let envelope = serde_json::from_str::<Envelope<T>>(&body);
    let (code, message) = match &envelope {
        Ok(env) => (Some(env.code), env.msg.clone()),
        Err(_) => (None, body.clone()),
    };

    if status == StatusCode::TOO_MANY_REQUESTS || code == Some(RATE_LIMIT_CODE) {
        return Err(GatewayError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if status.is_server_error() {
        return Err(GatewayError::Server {
            status: status.as_u16(),
            message: format!("{action}: {message}"),
        });
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(GatewayError::Unauthorized(format!("{action}: {message}")));
        }
        StatusCode::NOT_FOUND => {
            return Err(GatewayError::NotFound(format!("{action}: {message}")));
        }
        s if !s.is_success() => {
            return Err(GatewayError::Validation(format!("{action}: {message}")));
        }
        _ => {}
    }

    let envelope = envelope?;
    if envelope.code != 0 {
        return Err(GatewayError::Api {
            code: envelope.code,
            message: envelope.msg,
        });
    }
    envelope.data.ok_or_else(|| GatewayError::Api {
        code: envelope.code,
        message: format!("{action}: response has no data"),
    })
}

#[async_trait]
impl RemoteFieldGateway for BitableGateway {
    fn provider_name(&self) -> &'static str {
        "Bitable"
    }

    async fn list_fields(&self, table: &TableRef) -> GatewayResult<Vec<FieldDescriptor>> {
        let token = self.token().await?;
        let url = self.fields_url(table);
        let page_size = self.config.page_size.to_string();

        let mut fields = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .query(&[("page_size", page_size.as_str())]);

            if let Some(pt) = &page_token {
                request = request.query(&[("page_token", pt.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(GatewayError::Http)?;

            let page: FieldPage = read_envelope(response, "list fields").await?;
            fields.extend(page.items.into_iter().map(FieldDescriptor::from));

            page_token = page.page_token.filter(|t| !t.is_empty());
            if !page.has_more || page_token.is_none() {
                break;
            }
        }

        debug!(table = %table, count = fields.len(), "Listed fields");
        Ok(fields)
    }

    async fn create_field(
        &self,
        table: &TableRef,
        config: &FieldConfiguration,
    ) -> GatewayResult<FieldDescriptor> {
        let token = self.token().await?;

        let response = self
            .client
            .post(self.fields_url(table))
            .bearer_auth(&token)
            .json(&WireFieldRequest::from(config))
            .send()
            .await
            .map_err(GatewayError::Http)?;

        let created: FieldEnvelope = read_envelope(response, "create field").await?;
        let field = FieldDescriptor::from(created.field);
        info!(table = %table, field = %field.name, id = %field.id, "Created field");
        Ok(field)
    }

    async fn update_field(
        &self,
        table: &TableRef,
        field_id: &str,
        config: &FieldConfiguration,
    ) -> GatewayResult<FieldDescriptor> {
        let token = self.token().await?;

        let response = self
            .client
            .put(format!(
                "{}/{}",
                self.fields_url(table),
                urlencoding::encode(field_id)
            ))
            .bearer_auth(&token)
            .json(&WireFieldRequest::from(config))
            .send()
            .await
            .map_err(GatewayError::Http)?;

        let updated: FieldEnvelope = read_envelope(response, "update field").await?;
        let field = FieldDescriptor::from(updated.field);
        info!(table = %table, field = %field.name, id = %field.id, "Updated field");
        Ok(field)
    }
}
