//! Document store client.
//!
//! CRUD access to the document persistence backend, plus the opaque
//! import/export pair. The engine never interprets edit operations
//! itself; the store is the single source of truth for content.

use async_trait::async_trait;
use bytes::Bytes;
use quill_protocol::{Document, DocumentCreate, DocumentUpdate};
use reqwest::{Client, Response, StatusCode, multipart};

use crate::api_client::{HEALTH_CHECK_TIMEOUT, create_default_client, extract_error_message};
use crate::config::EngineConfig;
use crate::error::{QuillError, Result};

/// Access to the document persistence backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents.
    async fn list(&self) -> Result<Vec<Document>>;

    /// One document by id.
    async fn get(&self, id: &str) -> Result<Document>;

    /// Create a new document.
    async fn create(&self, data: DocumentCreate) -> Result<Document>;

    /// Update title and/or content.
    async fn update(&self, id: &str, data: DocumentUpdate) -> Result<Document>;

    /// Delete a document.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Import an external file as a new document. The contents are opaque
    /// to the engine; the backend does the conversion.
    async fn import_file(
        &self,
        title: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Document>;

    /// Export a document in the backend's external format.
    async fn export(&self, id: &str) -> Result<Bytes>;

    /// Whether the backend is reachable.
    async fn health_check(&self) -> Result<bool>;
}

/// HTTP implementation against the backend's `/api/documents` routes.
pub struct HttpDocumentStore {
    client: Client,
    config: EngineConfig,
}

impl HttpDocumentStore {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            client: create_default_client()?,
            config,
        })
    }

    /// Map a non-success response to the error taxonomy: 404 becomes
    /// `NotFound`, anything else a backend fault with the extracted detail.
    async fn check(resp: Response, context: &str) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(QuillError::NotFound(context.to_string()));
        }
        let message = extract_error_message(resp).await;
        tracing::warn!(context, message = %message, "document store request failed");
        Err(QuillError::Backend { message })
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn list(&self) -> Result<Vec<Document>> {
        let url = self.config.endpoint("/api/documents/");
        let resp = self.client.get(&url).send().await?;
        let resp = Self::check(resp, "documents").await?;
        Ok(resp.json().await?)
    }

    async fn get(&self, id: &str) -> Result<Document> {
        let url = self.config.endpoint(&format!("/api/documents/{id}"));
        let resp = self.client.get(&url).send().await?;
        let resp = Self::check(resp, id).await?;
        Ok(resp.json().await?)
    }

    async fn create(&self, data: DocumentCreate) -> Result<Document> {
        let url = self.config.endpoint("/api/documents/");
        let resp = self.client.post(&url).json(&data).send().await?;
        let resp = Self::check(resp, "create").await?;
        Ok(resp.json().await?)
    }

    async fn update(&self, id: &str, data: DocumentUpdate) -> Result<Document> {
        let url = self.config.endpoint(&format!("/api/documents/{id}"));
        let resp = self.client.put(&url).json(&data).send().await?;
        let resp = Self::check(resp, id).await?;
        Ok(resp.json().await?)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.config.endpoint(&format!("/api/documents/{id}"));
        let resp = self.client.delete(&url).send().await?;
        Self::check(resp, id).await?;
        Ok(())
    }

    async fn import_file(
        &self,
        title: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Document> {
        let url = self.config.endpoint("/api/documents/upload");
        let form = multipart::Form::new()
            .text("title", title.to_string())
            .part(
                "file",
                multipart::Part::bytes(contents).file_name(file_name.to_string()),
            );
        let resp = self.client.post(&url).multipart(form).send().await?;
        let resp = Self::check(resp, "upload").await?;
        Ok(resp.json().await?)
    }

    async fn export(&self, id: &str) -> Result<Bytes> {
        let url = self.config.endpoint(&format!("/api/documents/{id}/export"));
        let resp = self.client.get(&url).send().await?;
        let resp = Self::check(resp, id).await?;
        Ok(resp.bytes().await?)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = self.config.endpoint("/health");
        let resp = self
            .client
            .get(&url)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
            .map_err(|e| QuillError::BackendUnavailable(e.to_string()))?;
        Ok(resp.status().is_success())
    }
}
