//! Reachability of each extraction backend.

use docextract_config::PipelineConfig;
use docextract_core::ExtractError;
use docextract_providers::{OcrClient, VisionClient};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceStatus {
    fn up() -> Self {
        Self { available: true, error: None }
    }

    fn down(reason: impl Into<String>) -> Self {
        Self { available: false, error: Some(reason.into()) }
    }

    fn from_result(result: Result<(), ExtractError>) -> Self {
        match result {
            Ok(()) => Self::up(),
            Err(e) => Self::down(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub vision: ServiceStatus,
    pub external: ServiceStatus,
    pub ai: ServiceStatus,
}

impl ServiceHealth {
    pub fn any_available(&self) -> bool {
        self.vision.available || self.external.available || self.ai.available
    }
}

pub async fn check_services(config: &PipelineConfig) -> ServiceHealth {
    let (vision, external) = tokio::join!(check_vision(config), check_external(config));
    let ai = if config.ai_enabled() {
        ServiceStatus::up()
    } else {
        ServiceStatus::down("AI API key is not configured")
    };

    let health = ServiceHealth { vision, external, ai };
    info!(
        vision = health.vision.available,
        external = health.external.available,
        ai = health.ai.available,
        "Service health checked"
    );
    health
}

async fn check_vision(config: &PipelineConfig) -> ServiceStatus {
    let client = VisionClient::new(&config.vision);
    if !client.is_configured() {
        return ServiceStatus::down("vision credentials are not configured");
    }
    ServiceStatus::from_result(client.check_access().await)
}

async fn check_external(config: &PipelineConfig) -> ServiceStatus {
    match OcrClient::new(&config.ocr) {
        Ok(client) => ServiceStatus::from_result(client.check_health().await),
        Err(e) => ServiceStatus::down(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::{HeaderMap, StatusCode}, routing::get};

    #[tokio::test]
    async fn nothing_configured_reports_all_down() {
        let health = check_services(&PipelineConfig::default()).await;
        assert!(!health.any_available());
        assert!(health.vision.error.as_deref().unwrap().contains("credentials"));
        assert!(health.external.error.is_some());
    }

    #[tokio::test]
    async fn external_health_uses_bearer_token() {
        let app = Router::new().route(
            "/health",
            get(|headers: HeaderMap| async move {
                match headers.get("authorization").and_then(|v| v.to_str().ok()) {
                    Some("Bearer secret") => StatusCode::OK,
                    _ => StatusCode::UNAUTHORIZED,
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut config = PipelineConfig::default();
        config.ocr.endpoint = Some(format!("http://{addr}/upload"));
        config.ocr.token = Some("secret".into());
        config.ai.api_key = Some("sk-test".into());

        let health = check_services(&config).await;
        assert_eq!(health.external, ServiceStatus { available: true, error: None });
        assert!(health.ai.available);
        assert!(!health.vision.available);

        config.ocr.token = Some("wrong".into());
        let health = check_services(&config).await;
        assert!(!health.external.available);
        assert!(health.external.error.as_deref().unwrap().contains("401"));
    }
}
