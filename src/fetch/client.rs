use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes prepared HTTP requests for remote report and schedule sources.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
