//! # Vault Operations
//!
//! Implementation of the `VaultManagement` trait for the Azure Resource Manager REST API.
//!
//! Every mutation returns only after the provider reports it terminal: a
//! synchronous 2xx, or a long-running operation polled to completion.

use super::polling::{retry_after, PollTarget};
use super::ArmClient;
use crate::constants::{KEY_VAULT_API_VERSION, RESOURCE_GROUP_API_VERSION};
use crate::error::ClientError;
use crate::observability::metrics;
use crate::provider::{
    DeletedVault, ResourceGroup, ResourceGroupParameters, ResourceId, Vault,
    VaultCreateOrUpdateParameters, VaultManagement, VaultPatchParameters,
};
use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

/// Record duration on success, error count by status on failure
fn record_outcome<T>(operation: &str, start: Instant, result: &Result<T, ClientError>) {
    match result {
        Ok(_) => metrics::record_operation(operation, start.elapsed().as_secs_f64()),
        Err(e) => {
            let status = e
                .status()
                .map_or_else(|| "error".to_string(), |s| s.as_u16().to_string());
            metrics::increment_operation_errors(operation, &status);
        }
    }
}

impl ArmClient {
    /// Send a request and return the response if its status is 2xx
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: &str,
        api_version: &str,
        body: Option<&B>,
    ) -> Result<Response, ClientError> {
        let mut request = self
            .make_request(method.clone(), url, Some(api_version))
            .await?;
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(self.handle_error_response(&method, url, status, &error_text))
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, ClientError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Wait out an accepted operation, if the response started one
    ///
    /// Returns `true` when the caller must re-read the resource.
    async fn settle(&self, response: &Response) -> Result<bool, ClientError> {
        let status = response.status();
        if status != StatusCode::CREATED && status != StatusCode::ACCEPTED {
            return Ok(false);
        }
        match PollTarget::from_headers(response.headers()) {
            Some(target) => {
                info!(url = target.url(), "Waiting for long-running operation");
                self.wait_for_completion(target, retry_after(response.headers()))
                    .await?;
                Ok(true)
            }
            None => Ok(status == StatusCode::ACCEPTED),
        }
    }

    /// PUT or PATCH a resource and return its final representation
    async fn write_resource<B, T>(
        &self,
        method: Method,
        url: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, ClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(method, url, api_version, Some(body)).await?;
        if self.settle(&response).await? {
            let response = self
                .send::<()>(Method::GET, url, api_version, None)
                .await?;
            return Self::decode(url, response).await;
        }
        Self::decode(url, response).await
    }

    /// Issue a mutation without a meaningful response body
    async fn mutate(&self, method: Method, url: &str, api_version: &str) -> Result<(), ClientError> {
        let response = self.send::<()>(method, url, api_version, None).await?;
        self.settle(&response).await?;
        Ok(())
    }
}

#[async_trait]
impl VaultManagement for ArmClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn create_or_update_resource_group(
        &self,
        name: &str,
        location: &str,
    ) -> Result<ResourceGroup, ClientError> {
        let span = info_span!(
            "azure.resource_group.create_or_update",
            resource_group.name = name,
            location = location
        );
        async move {
            let start = Instant::now();
            let id = ResourceId::resource_group(&self.subscription_id, name);
            let body = ResourceGroupParameters {
                location: location.to_string(),
            };
            let result = self
                .write_resource(
                    Method::PUT,
                    &self.url(&id.path()),
                    RESOURCE_GROUP_API_VERSION,
                    &body,
                )
                .await;
            record_outcome("create_or_update_resource_group", start, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn create_or_update_vault(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &VaultCreateOrUpdateParameters,
    ) -> Result<Vault, ClientError> {
        let span = info_span!(
            "azure.vault.create_or_update",
            vault.name = name,
            resource_group.name = resource_group,
            create_mode = ?parameters.create_mode()
        );
        async move {
            let start = Instant::now();
            let id = ResourceId::vault(&self.subscription_id, resource_group, name);
            let result = self
                .write_resource(
                    Method::PUT,
                    &self.url(&id.path()),
                    KEY_VAULT_API_VERSION,
                    parameters,
                )
                .await;
            record_outcome("create_or_update_vault", start, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn update_vault(
        &self,
        resource_group: &str,
        name: &str,
        patch: &VaultPatchParameters,
    ) -> Result<Vault, ClientError> {
        let span = info_span!(
            "azure.vault.update",
            vault.name = name,
            resource_group.name = resource_group
        );
        async move {
            let start = Instant::now();
            let id = ResourceId::vault(&self.subscription_id, resource_group, name);
            let result = self
                .write_resource(
                    Method::PATCH,
                    &self.url(&id.path()),
                    KEY_VAULT_API_VERSION,
                    patch,
                )
                .await;
            record_outcome("update_vault", start, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn get_vault(&self, id: &ResourceId) -> Result<Vault, ClientError> {
        let span = tracing::debug_span!("azure.vault.get", vault.id = %id);
        async move {
            let start = Instant::now();
            let url = self.url(&id.path());
            let result: Result<Vault, ClientError> = async {
                let response = self
                    .send::<()>(Method::GET, &url, id.api_version(), None)
                    .await?;
                Self::decode(&url, response).await
            }
            .await;
            record_outcome("get_vault", start, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn delete_vault(&self, id: &ResourceId) -> Result<(), ClientError> {
        let span = info_span!("azure.vault.delete", vault.id = %id);
        async move {
            let start = Instant::now();
            let result = self
                .mutate(Method::DELETE, &self.url(&id.path()), id.api_version())
                .await;
            record_outcome("delete_vault", start, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn get_deleted_vault(&self, id: &ResourceId) -> Result<DeletedVault, ClientError> {
        let span = tracing::debug_span!("azure.deleted_vault.get", deleted_vault.id = %id);
        async move {
            let start = Instant::now();
            let url = self.url(&id.path());
            let result: Result<DeletedVault, ClientError> = async {
                let response = self
                    .send::<()>(Method::GET, &url, id.api_version(), None)
                    .await?;
                Self::decode(&url, response).await
            }
            .await;
            record_outcome("get_deleted_vault", start, &result);
            result
        }
        .instrument(span)
        .await
    }

    async fn purge_deleted_vault(&self, id: &ResourceId) -> Result<(), ClientError> {
        let span = info_span!("azure.deleted_vault.purge", deleted_vault.id = %id);
        async move {
            let start = Instant::now();
            let url = format!("{}/purge", self.url(&id.path()));
            let result = self.mutate(Method::POST, &url, id.api_version()).await;
            record_outcome("purge_deleted_vault", start, &result);
            result
        }
        .instrument(span)
        .await
    }
}
