// ABOUTME: REST client for a Key Vault style secret store
// ABOUTME: GET/PUT/DELETE {vault_url}/secrets/{name}?api-version=... with bearer auth
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::SecretVault;
use crate::config::VaultConfig;
use crate::errors::{AppError, AppResult};

const SERVICE_NAME: &str = "Secret vault";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct SetSecretRequest<'a> {
    value: &'a str,
}

#[derive(Deserialize)]
struct SecretBundle {
    value: String,
}

/// Key Vault REST client
pub struct KeyVaultClient {
    client: Client,
    vault_url: String,
    token: Option<String>,
    api_version: String,
}

impl KeyVaultClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if no vault URL is configured or the HTTP client cannot be built
    pub fn new(config: &VaultConfig) -> AppResult<Self> {
        let vault_url = config
            .url
            .clone()
            .ok_or_else(|| AppError::config("VAULT_URL must be set for the Key Vault client"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            vault_url: vault_url.trim_end_matches('/').to_owned(),
            token: config.token.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn secret_url(&self, name: &str) -> String {
        format!(
            "{}/secrets/{}?api-version={}",
            self.vault_url,
            urlencoding::encode(name),
            self.api_version
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> AppResult<reqwest::Response> {
        self.authorize(request).send().await.map_err(|e| {
            AppError::external_service(SERVICE_NAME, format!("{operation} failed: {e}"))
        })
    }

    fn status_error(status: StatusCode, operation: &str) -> AppError {
        AppError::external_service(SERVICE_NAME, format!("{operation} returned {status}"))
    }
}

#[async_trait]
impl SecretVault for KeyVaultClient {
    #[instrument(skip(self))]
    async fn get_secret(&self, name: &str) -> AppResult<Option<String>> {
        let response = self
            .send(self.client.get(self.secret_url(name)), "get secret")
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bundle: SecretBundle = response.json().await.map_err(|e| {
                    AppError::external_service(SERVICE_NAME, format!("Invalid secret bundle: {e}"))
                })?;
                Ok(Some(bundle.value))
            }
            status => Err(Self::status_error(status, "get secret")),
        }
    }

    #[instrument(skip(self, value))]
    async fn set_secret(&self, name: &str, value: &str) -> AppResult<()> {
        let request = self
            .client
            .put(self.secret_url(name))
            .json(&SetSecretRequest { value });
        let response = self.send(request, "set secret").await?;

        if response.status().is_success() {
            debug!("Secret stored");
            Ok(())
        } else {
            Err(Self::status_error(response.status(), "set secret"))
        }
    }

    #[instrument(skip(self))]
    async fn delete_secret(&self, name: &str) -> AppResult<()> {
        let response = self
            .send(self.client.delete(self.secret_url(name)), "delete secret")
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(Self::status_error(status, "delete secret")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> KeyVaultClient {
        KeyVaultClient::new(&VaultConfig {
            url: Some(server.url()),
            token: Some("vault-token".to_owned()),
            api_version: "7.4".to_owned(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_set_delete_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let put = server
            .mock("PUT", "/secrets/cred-1")
            .match_query(mockito::Matcher::UrlEncoded("api-version".into(), "7.4".into()))
            .match_header("authorization", "Bearer vault-token")
            .match_body(mockito::Matcher::JsonString(r#"{"value":"s3cret"}"#.to_owned()))
            .with_status(200)
            .with_body(r#"{"value":"s3cret","id":"x"}"#)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/secrets/cred-1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"value":"s3cret","id":"x"}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/secrets/cred-1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let vault = client_for(&server);
        vault.set_secret("cred-1", "s3cret").await.unwrap();
        assert_eq!(vault.get_secret("cred-1").await.unwrap().as_deref(), Some("s3cret"));
        vault.delete_secret("cred-1").await.unwrap();

        put.assert_async().await;
        get.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_secret_is_none_and_failures_are_upstream_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/secrets/missing")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("PUT", "/secrets/broken")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let vault = client_for(&server);
        assert_eq!(vault.get_secret("missing").await.unwrap(), None);
        let error = vault.set_secret("broken", "x").await.unwrap_err();
        assert!(error.code.is_server_error());
    }

    #[test]
    fn test_requires_vault_url() {
        assert!(KeyVaultClient::new(&VaultConfig::default()).is_err());
    }
}
