//! 线上格式：请求体与宽松的响应解析
//!
//! ingest 响应可能是裸数组、`{ "results": [...] }`、`{ "doc_id": ... }` 或 null，均按约定接受；
//! query 响应缺失字段时取默认值。只有无法解析的 JSON 才算错误。

use serde::Serialize;
use serde_json::Value;

use crate::core::error::SessionError;
use crate::core::state::AnalysisResult;
use crate::service::traits::{ChatAnswer, IngestOutcome};

/// query 响应缺少 response 字段时的占位回答
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response received";

/// `POST query` 请求体
#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'a str>,
}

/// 纯文本模式下的 `POST ingest` 请求体
#[derive(Debug, Serialize)]
pub struct TextIngestRequest {
    pub text: String,
}

fn parse_json(body: &[u8]) -> Result<Value, SessionError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}

fn parse_results(value: Value) -> Result<Vec<AnalysisResult>, SessionError> {
    match value {
        Value::Array(_) => Ok(serde_json::from_value(value)?),
        Value::Null => Ok(Vec::new()),
        other => Err(SessionError::MalformedResponse(format!(
            "results is not an array: {}",
            other
        ))),
    }
}

/// 解析 ingest 响应体
pub fn parse_ingest_body(body: &[u8]) -> Result<IngestOutcome, SessionError> {
    match parse_json(body)? {
        value @ Value::Array(_) => Ok(IngestOutcome {
            results: parse_results(value)?,
            document_id: None,
        }),
        Value::Object(mut map) => {
            let document_id = map
                .get("doc_id")
                .and_then(Value::as_str)
                .map(str::to_string);
            let results = match map.remove("results") {
                Some(v) => parse_results(v)?,
                None => Vec::new(),
            };
            Ok(IngestOutcome {
                results,
                document_id,
            })
        }
        _ => Ok(IngestOutcome::default()),
    }
}

/// 解析 query 响应体；空字符串回答同样视为缺失
pub fn parse_query_body(body: &[u8]) -> Result<ChatAnswer, SessionError> {
    let value = parse_json(body)?;
    let response = value
        .get("response")
        .or_else(|| value.get("answer"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_RESPONSE_PLACEHOLDER)
        .to_string();
    let chunks = value
        .get("chunks")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok(ChatAnswer { response, chunks })
}
