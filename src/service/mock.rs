//! Mock 分析服务（用于测试与离线演示，无需远端服务）
//!
//! 有预置脚本时按顺序返回脚本结果（可带延迟）；脚本耗尽后按关键词对文档分段打标签，问答回显问题。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::document::Document;
use crate::core::error::SessionError;
use crate::core::state::{AnalysisResult, Label};
use crate::service::traits::{AnalysisService, ChatAnswer, IngestOutcome};

type Scripted<T> = (Duration, Result<T, SessionError>);

#[derive(Default)]
pub struct MockAnalysisService {
    ingest_script: Mutex<VecDeque<Scripted<IngestOutcome>>>,
    query_script: Mutex<VecDeque<Scripted<ChatAnswer>>>,
    ingest_calls: AtomicUsize,
    query_calls: AtomicUsize,
    questions: Mutex<Vec<String>>,
}

impl MockAnalysisService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ingest(&self, result: Result<IngestOutcome, SessionError>) -> &Self {
        self.push_ingest_delayed(Duration::ZERO, result)
    }

    pub fn push_ingest_delayed(
        &self,
        delay: Duration,
        result: Result<IngestOutcome, SessionError>,
    ) -> &Self {
        if let Ok(mut script) = self.ingest_script.lock() {
            script.push_back((delay, result));
        }
        self
    }

    pub fn push_query(&self, result: Result<ChatAnswer, SessionError>) -> &Self {
        self.push_query_delayed(Duration::ZERO, result)
    }

    pub fn push_query_delayed(
        &self,
        delay: Duration,
        result: Result<ChatAnswer, SessionError>,
    ) -> &Self {
        if let Ok(mut script) = self.query_script.lock() {
            script.push_back((delay, result));
        }
        self
    }

    pub fn ingest_calls(&self) -> usize {
        self.ingest_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// 已收到的问题（按调用顺序）
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn next<T>(script: &Mutex<VecDeque<Scripted<T>>>) -> Option<Scripted<T>> {
        script.lock().ok().and_then(|mut s| s.pop_front())
    }
}

/// 关键词打标签：仲裁 / 放弃权利类为 Unfair，数据出售与单方终止为 Risky
fn classify(clause: &str) -> (Label, &'static str) {
    let lower = clause.to_lowercase();
    if ["sell", "share your", "third part", "terminate"]
        .iter()
        .any(|k| lower.contains(k))
    {
        (Label::Risky, "data & termination")
    } else if ["arbitration", "waive", "class action", "sole discretion"]
        .iter()
        .any(|k| lower.contains(k))
    {
        (Label::Unfair, "user rights")
    } else {
        (Label::Fair, "")
    }
}

/// 按空行切分条款，逐条打标签
fn analyze_offline(document: &Document) -> Vec<AnalysisResult> {
    document
        .text_lossy()
        .split("\n\n")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .enumerate()
        .map(|(i, clause)| {
            let (label, category) = classify(clause);
            AnalysisResult {
                clause_number: Some(i as u32 + 1),
                clause_text: clause.to_string(),
                label,
                risk_category: category.to_string(),
                reasoning: format!("Offline keyword classification: {}", label.as_str()),
            }
        })
        .collect()
}

#[async_trait]
impl AnalysisService for MockAnalysisService {
    async fn ingest(&self, document: &Document) -> Result<IngestOutcome, SessionError> {
        self.ingest_calls.fetch_add(1, Ordering::SeqCst);
        match Self::next(&self.ingest_script) {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Ok(IngestOutcome {
                results: analyze_offline(document),
                document_id: None,
            }),
        }
    }

    async fn query(
        &self,
        question: &str,
        _namespace: Option<&str>,
    ) -> Result<ChatAnswer, SessionError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut q) = self.questions.lock() {
            q.push(question.to_string());
        }
        match Self::next(&self.query_script) {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Ok(ChatAnswer {
                response: format!("Echo from Mock: {}", question),
                chunks: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_analysis_splits_on_blank_lines() {
        let mock = MockAnalysisService::new();
        let doc = Document::from_text(
            "We may sell your data.\n\nDisputes go to binding arbitration.\n\nYou can cancel anytime.",
        );
        let out = mock.ingest(&doc).await.unwrap();
        let labels: Vec<_> = out.results.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![Label::Risky, Label::Unfair, Label::Fair]);
        assert_eq!(out.results[1].clause_number, Some(2));
        assert_eq!(mock.ingest_calls(), 1);
    }

    #[tokio::test]
    async fn test_script_takes_precedence() {
        let mock = MockAnalysisService::new();
        mock.push_ingest(Err(SessionError::http_status(503)));
        let err = mock.ingest(&Document::from_text("x")).await.unwrap_err();
        assert_eq!(err, SessionError::http_status(503));
        // 脚本耗尽后回到离线分析
        assert!(mock.ingest(&Document::from_text("x")).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_records_questions() {
        let mock = MockAnalysisService::new();
        let answer = mock.query("What is risky?", None).await.unwrap();
        assert_eq!(answer.response, "Echo from Mock: What is risky?");
        assert_eq!(mock.questions(), vec!["What is risky?".to_string()]);
    }
}
