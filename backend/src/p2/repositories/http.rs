//! ESO P2 REST API repository implementation.
//!
//! Talks JSON over HTTPS with bearer-token authentication. Versions travel
//! as `ETag` response headers and are presented back as `If-Match` on saves;
//! the service answers a stale tag with `412 Precondition Failed`.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{ETAG, IF_MATCH};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::api::{
    ContainerId, ContainerItem, ItemType, ObDocument, ObId, RunInfo, TemplateDocument,
    TemplateParam, Version,
};
use crate::p2::repository::{ErrorContext, P2Repository, RemoteError, RemoteResult};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Repository backed by the P2 web service.
#[derive(Clone)]
pub struct HttpP2Repository {
    client: Client,
    base_url: String,
    access_token: String,
}

impl HttpP2Repository {
    /// Log in and return an authenticated repository.
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://www.eso.org/copdemo/api/v1`
    /// * `username`, `password` - P2 credentials
    /// * `timeout` - Per-request timeout
    pub async fn connect(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::transport(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let response = client
            .post(format!("{}/login", base_url))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|e| RemoteError::from(e).with_operation("login"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    RemoteError::authentication(format!("Login refused for user {}", username))
                }
                _ => RemoteError::transport(format!("Login failed ({}): {}", status, body.trim())),
            }
            .with_operation("login"));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::decode(e.to_string()).with_operation("login"))?;

        debug!("Logged in to {} as {}", base_url, username);
        Ok(Self {
            client,
            base_url,
            access_token: login.access_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.access_token)
    }

    /// Send a request and map non-success statuses onto [`RemoteError`].
    async fn send(&self, builder: RequestBuilder, context: ErrorContext) -> RemoteResult<Response> {
        let response = self.authorized(builder).send().await.map_err(|e| {
            let err = RemoteError::from(e);
            attach(err, &context)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("HTTP {}: {}", status, body.trim());
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                attach(RemoteError::authentication(message), &context)
            }
            StatusCode::NOT_FOUND => RemoteError::not_found_with_context(message, context),
            StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => {
                RemoteError::version_conflict_with_context(message, context)
            }
            s if s.is_client_error() => RemoteError::rejected_with_context(message, context),
            _ => attach(RemoteError::transport(message), &context),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response, context: &ErrorContext) -> RemoteResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| attach(RemoteError::decode(e.to_string()), context))
    }

    async fn decode_versioned<T: DeserializeOwned>(
        response: Response,
        context: &ErrorContext,
    ) -> RemoteResult<(T, Version)> {
        let version = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(Version::new)
            .ok_or_else(|| attach(RemoteError::decode("Response carries no ETag"), context))?;
        let body = Self::decode(response, context).await?;
        Ok((body, version))
    }

    async fn create_item<T: DeserializeOwned>(
        &self,
        parent_id: ContainerId,
        item_type: ItemType,
        name: &str,
        operation: &str,
    ) -> RemoteResult<(T, Version)> {
        let context = ErrorContext::new(operation)
            .with_entity("container")
            .with_entity_id(parent_id)
            .with_details(name);
        debug!("POST /containers/{}/items {} '{}'", parent_id, item_type, name);
        let builder = self
            .client
            .post(self.url(&format!("/containers/{}/items", parent_id)))
            .json(&json!({ "itemType": item_type, "name": name }));
        let response = self.send(builder, context.clone()).await?;
        Self::decode_versioned(response, &context).await
    }
}

fn attach(mut err: RemoteError, context: &ErrorContext) -> RemoteError {
    if let Some(ref op) = context.operation {
        err = err.with_operation(op.clone());
    }
    if let (Some(entity), Some(id)) = (&context.entity, &context.entity_id) {
        err = err.with_entity(entity.clone(), id);
    }
    err
}

#[async_trait]
impl P2Repository for HttpP2Repository {
    async fn list_runs(&self) -> RemoteResult<Vec<RunInfo>> {
        let context = ErrorContext::new("list_runs");
        let response = self
            .send(self.client.get(self.url("/obsRuns")), context.clone())
            .await?;
        Self::decode(response, &context).await
    }

    async fn list_items(&self, container_id: ContainerId) -> RemoteResult<Vec<ContainerItem>> {
        let context = ErrorContext::new("list_items")
            .with_entity("container")
            .with_entity_id(container_id);
        let builder = self
            .client
            .get(self.url(&format!("/containers/{}/items", container_id)));
        let response = self.send(builder, context.clone()).await?;
        Self::decode(response, &context).await
    }

    async fn create_folder(
        &self,
        parent_id: ContainerId,
        name: &str,
    ) -> RemoteResult<(ContainerItem, Version)> {
        self.create_item(parent_id, ItemType::Folder, name, "create_folder")
            .await
    }

    async fn create_concatenation(
        &self,
        parent_id: ContainerId,
        name: &str,
    ) -> RemoteResult<(ContainerItem, Version)> {
        self.create_item(parent_id, ItemType::Concatenation, name, "create_concatenation")
            .await
    }

    async fn create_ob(
        &self,
        parent_id: ContainerId,
        label: &str,
    ) -> RemoteResult<(ObDocument, Version)> {
        self.create_item(parent_id, ItemType::OB, label, "create_ob")
            .await
    }

    async fn save_ob(
        &self,
        ob: &ObDocument,
        version: &Version,
    ) -> RemoteResult<(ObDocument, Version)> {
        let context = ErrorContext::new("save_ob")
            .with_entity("ob")
            .with_entity_id(ob.ob_id);
        debug!("PUT /obsBlocks/{} If-Match {}", ob.ob_id, version);
        let builder = self
            .client
            .put(self.url(&format!("/obsBlocks/{}", ob.ob_id)))
            .header(IF_MATCH, version.as_str())
            .json(ob);
        let response = self.send(builder, context.clone()).await?;
        Self::decode_versioned(response, &context).await
    }

    async fn create_template(
        &self,
        ob_id: ObId,
        template_name: &str,
    ) -> RemoteResult<(TemplateDocument, Version)> {
        let context = ErrorContext::new("create_template")
            .with_entity("ob")
            .with_entity_id(ob_id)
            .with_details(template_name);
        debug!("POST /obsBlocks/{}/templates {}", ob_id, template_name);
        let builder = self
            .client
            .post(self.url(&format!("/obsBlocks/{}/templates", ob_id)))
            .json(&json!({ "templateName": template_name }));
        let response = self.send(builder, context.clone()).await?;
        Self::decode_versioned(response, &context).await
    }

    async fn save_template(
        &self,
        ob_id: ObId,
        template: &TemplateDocument,
        params: &[TemplateParam],
        version: &Version,
    ) -> RemoteResult<(TemplateDocument, Version)> {
        let context = ErrorContext::new("save_template")
            .with_entity("template")
            .with_entity_id(template.template_id);

        let mut body = template.clone();
        for param in params {
            match body.parameters.iter_mut().find(|p| p.name == param.name) {
                Some(existing) => existing.value = param.value.clone(),
                None => body.parameters.push(param.clone()),
            }
        }

        debug!(
            "PUT /obsBlocks/{}/templates/{} If-Match {}",
            ob_id, template.template_id, version
        );
        let builder = self
            .client
            .put(self.url(&format!(
                "/obsBlocks/{}/templates/{}",
                ob_id, template.template_id
            )))
            .header(IF_MATCH, version.as_str())
            .json(&body);
        let response = self.send(builder, context.clone()).await?;
        Self::decode_versioned(response, &context).await
    }
}
