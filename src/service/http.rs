//! HTTP 分析服务客户端
//!
//! ingest 以 multipart 上传原始文件（或 `{ text }` JSON），query 发送 `{ query, namespace? }`。
//! 非 2xx 一律视为传输失败；响应体交给 wire 宽松解析。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};

use crate::config::{PayloadMode, ServiceSection};
use crate::core::document::Document;
use crate::core::error::SessionError;
use crate::service::traits::{AnalysisService, ChatAnswer, IngestOutcome};
use crate::service::wire::{parse_ingest_body, parse_query_body, QueryRequest, TextIngestRequest};

pub struct HttpAnalysisService {
    client: Client,
    ingest_url: String,
    query_url: String,
    root_url: String,
    upload_field: String,
    payload: PayloadMode,
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl HttpAnalysisService {
    pub fn new(cfg: &ServiceSection) -> Self {
        let mut builder = Client::builder();
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_default();
        Self {
            client,
            ingest_url: join_url(&cfg.base_url, &cfg.ingest_path),
            query_url: join_url(&cfg.base_url, &cfg.query_path),
            root_url: join_url(&cfg.base_url, "/"),
            upload_field: cfg.upload_field.clone(),
            payload: cfg.payload,
        }
    }

    pub fn ingest_url(&self) -> &str {
        &self.ingest_url
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }

    fn multipart_form(&self, document: &Document) -> Result<Form, SessionError> {
        let part = Part::stream(reqwest::Body::from(document.bytes.clone()))
            .file_name(document.filename.clone())
            .mime_str(document.mime_hint.content_type())
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        Ok(Form::new().part(self.upload_field.clone(), part))
    }

    /// 检查状态码后读取完整响应体
    async fn read_body(resp: Response) -> Result<bytes::Bytes, SessionError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(SessionError::http_status(status.as_u16()));
        }
        Ok(resp.bytes().await?)
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn ingest(&self, document: &Document) -> Result<IngestOutcome, SessionError> {
        let request = match self.payload {
            PayloadMode::Multipart => self
                .client
                .post(&self.ingest_url)
                .multipart(self.multipart_form(document)?),
            PayloadMode::Text => self.client.post(&self.ingest_url).json(&TextIngestRequest {
                text: document.text_lossy(),
            }),
        };
        tracing::debug!(
            "POST {} ({} bytes, {:?})",
            self.ingest_url,
            document.len(),
            self.payload
        );
        let resp = request.send().await?;
        let body = Self::read_body(resp).await?;
        parse_ingest_body(&body)
    }

    async fn query(
        &self,
        question: &str,
        namespace: Option<&str>,
    ) -> Result<ChatAnswer, SessionError> {
        tracing::debug!("POST {} (namespace: {:?})", self.query_url, namespace);
        let resp = self
            .client
            .post(&self.query_url)
            .json(&QueryRequest {
                query: question,
                namespace,
            })
            .send()
            .await?;
        let body = Self::read_body(resp).await?;
        parse_query_body(&body)
    }

    async fn ping(&self) -> Result<(), SessionError> {
        let resp = self.client.get(&self.root_url).send().await?;
        Self::read_body(resp).await.map(|_| ())
    }
}
