//! 文档源：当前选中的原始文档（字节 + 文件名）
//!
//! 纯本地状态，不做任何网络操作；重新选择时整体替换，移除时清空。

use std::path::Path;

use bytes::Bytes;
use serde::Serialize;

/// 根据扩展名推断的文档类型提示
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeHint {
    Text,
    Pdf,
    Html,
    Unknown,
}

impl MimeHint {
    /// .txt / .pdf / .html / .htm，其余一律 Unknown（仍允许上传）
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("txt") => MimeHint::Text,
            Some("pdf") => MimeHint::Pdf,
            Some("html") | Some("htm") => MimeHint::Html,
            _ => MimeHint::Unknown,
        }
    }

    /// multipart 上传时使用的 Content-Type
    pub fn content_type(&self) -> &'static str {
        match self {
            MimeHint::Text => "text/plain",
            MimeHint::Pdf => "application/pdf",
            MimeHint::Html => "text/html",
            MimeHint::Unknown => "application/octet-stream",
        }
    }
}

/// 用户选中的文档；bytes 为共享缓冲，克隆进请求时不复制内容
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub bytes: Bytes,
    pub filename: String,
    pub mime_hint: MimeHint,
}

impl Document {
    pub fn new(bytes: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            bytes: bytes.into(),
            mime_hint: MimeHint::from_filename(&filename),
            filename,
        }
    }

    /// 粘贴的文本，作为 pasted.txt 处理
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(text.into().into_bytes(), "pasted.txt")
    }

    /// 从磁盘读取文件；文件名取路径最后一段
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        Ok(Self::new(bytes, filename))
    }

    /// 以 UTF-8 解码（非法字节替换），用于 `{ text }` 载荷
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// 展示层可见的文档摘要（不含内容）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub mime_hint: MimeHint,
    pub size: usize,
}

impl From<&Document> for DocumentInfo {
    fn from(doc: &Document) -> Self {
        Self {
            filename: doc.filename.clone(),
            mime_hint: doc.mime_hint,
            size: doc.len(),
        }
    }
}

/// 文档源：独占持有当前文档
#[derive(Debug, Default)]
pub struct DocumentSource {
    current: Option<Document>,
}

impl DocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换当前文档
    pub fn select(&mut self, doc: Document) {
        self.current = Some(doc);
    }

    pub fn remove(&mut self) -> Option<Document> {
        self.current.take()
    }

    /// 为请求取一份快照；选择本身保留，失败后可直接重试
    pub fn snapshot(&self) -> Option<Document> {
        self.current.clone()
    }

    pub fn info(&self) -> Option<DocumentInfo> {
        self.current.as_ref().map(DocumentInfo::from)
    }
}
