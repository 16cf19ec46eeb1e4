//! 分析服务抽象
//!
//! 远端服务对本客户端是不透明的协作者：ingest 上传文档得到逐条款结果，query 针对已分析文档提问。
//! HTTP 实现与 Mock 实现都实现 AnalysisService。

use async_trait::async_trait;

use crate::core::document::Document;
use crate::core::error::SessionError;
use crate::core::state::AnalysisResult;

/// 一次成功 ingest 的产出
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// 文档顺序的条款结果（可能为空）
    pub results: Vec<AnalysisResult>,
    /// 服务端分配的文档 ID（若响应中带 doc_id）
    pub document_id: Option<String>,
}

/// 一次成功 query 的产出
#[derive(Clone, Debug, PartialEq)]
pub struct ChatAnswer {
    pub response: String,
    pub chunks: Vec<serde_json::Value>,
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// 上传文档并取得条款分析
    async fn ingest(&self, document: &Document) -> Result<IngestOutcome, SessionError>;

    /// 针对已分析文档提问；namespace 为空时不随请求发送
    async fn query(
        &self,
        question: &str,
        namespace: Option<&str>,
    ) -> Result<ChatAnswer, SessionError>;

    /// 可达性探测，默认总是成功
    async fn ping(&self) -> Result<(), SessionError> {
        Ok(())
    }
}
