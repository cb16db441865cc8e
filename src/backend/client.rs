//! REST calls against the document-processing backend.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;

use super::{Backend, BackendError, UploadPart};
use crate::tenant::{Gstin, RegistryKey};

/// `GET /files/` response.
#[derive(Debug, Deserialize)]
struct FilesResp {
    #[serde(default)]
    files: Vec<String>,
}

/// `GET /check-open-reports/` response.
#[derive(Debug, Deserialize)]
struct OpenReportsResp {
    open: bool,
}

/// `POST /generate_master/` and `GET /reports/` response.
#[derive(Debug, Deserialize)]
struct ReportsResp {
    #[serde(default)]
    reports: Vec<String>,
}

/// Backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}/", self.base_url, endpoint)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn upload(
        &self,
        key: &RegistryKey,
        parts: Vec<UploadPart>,
    ) -> Result<Vec<String>, BackendError> {
        let mut form = Form::new()
            .text("gstn", key.gstin.to_string())
            .text("return_type", key.category.tag());
        for part in parts {
            let file = Part::bytes(part.bytes)
                .file_name(part.name)
                .mime_str(&part.mime_type)?;
            form = form.part("files", file);
        }

        let resp = self
            .http
            .post(self.url("upload"))
            .multipart(form)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        let body = resp.json::<serde_json::Value>().await?;
        Ok(stored_paths(&body))
    }

    async fn list_files(&self, key: &RegistryKey) -> Result<Vec<String>, BackendError> {
        let resp = self
            .http
            .get(self.url("files"))
            .query(&[("gstn", key.gstin.as_str()), ("return_type", key.category.tag())])
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<FilesResp>().await?.files)
    }

    async fn delete_file(&self, key: &RegistryKey, name: &str) -> Result<(), BackendError> {
        let resp = self
            .http
            .delete(self.url("delete"))
            .query(&[
                ("gstn", key.gstin.as_str()),
                ("return_type", key.category.tag()),
                ("filename", name),
            ])
            .send()
            .await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn check_open_reports(&self, gstin: &Gstin) -> Result<bool, BackendError> {
        let resp = self
            .http
            .get(self.url("check-open-reports"))
            .query(&[("gstn", gstin.as_str())])
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<OpenReportsResp>().await?.open)
    }

    async fn generate(&self, gstin: &Gstin) -> Result<Vec<String>, BackendError> {
        let form = Form::new().text("gstn", gstin.to_string());
        let resp = self
            .http
            .post(self.url("generate_master"))
            .multipart(form)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<ReportsResp>().await?.reports)
    }

    async fn list_reports(&self, gstin: &Gstin) -> Result<Vec<String>, BackendError> {
        let resp = self
            .http
            .get(self.url("reports"))
            .query(&[("gstn", gstin.as_str())])
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<ReportsResp>().await?.reports)
    }

    async fn fetch_report(&self, gstin: &Gstin, name: &str) -> Result<Vec<u8>, BackendError> {
        let resp = self
            .http
            .get(format!("{}/reports/download/", self.base_url))
            .query(&[("gstn", gstin.as_str()), ("filename", name)])
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Turn non-2xx responses into [`BackendError::Rejected`], keeping the body
/// text as the diagnostic.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// The upload endpoint answers either with a bare list of paths or an object
/// wrapping one; anything else yields no paths.
fn stored_paths(body: &serde_json::Value) -> Vec<String> {
    let strings = |items: &Vec<serde_json::Value>| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect::<Vec<_>>()
    };
    match body {
        serde_json::Value::Array(items) => strings(items),
        serde_json::Value::Object(map) => map
            .values()
            .find_map(|v| v.as_array().map(strings))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
