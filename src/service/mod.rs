//! 服务层：分析服务抽象与实现（HTTP / Mock）

pub mod http;
pub mod mock;
pub mod traits;
pub mod wire;

use std::sync::Arc;

pub use http::HttpAnalysisService;
pub use mock::MockAnalysisService;
pub use traits::{AnalysisService, ChatAnswer, IngestOutcome};
pub use wire::NO_RESPONSE_PLACEHOLDER;

use crate::config::{ServiceProvider, ServiceSection};

/// 根据配置选择服务后端
pub fn create_service_from_config(cfg: &ServiceSection) -> Arc<dyn AnalysisService> {
    match cfg.provider {
        ServiceProvider::Http => {
            tracing::info!("Using analysis service at {}", cfg.base_url);
            Arc::new(HttpAnalysisService::new(cfg))
        }
        ServiceProvider::Mock => {
            tracing::warn!("Using Mock analysis service (offline keyword classifier)");
            Arc::new(MockAnalysisService::new())
        }
    }
}
