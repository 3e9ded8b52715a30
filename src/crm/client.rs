use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::crm::query::QueryDoc;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("CRM returned {status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("CRM transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Seam over the CRM endpoint so services can be driven by a scripted fake in
/// tests. `CrmClient` is the only production implementation.
#[async_trait]
pub trait CrmExecutor: Send + Sync {
    /// Sends one query/mutation document authenticated by the caller's grant
    /// key and returns the parsed JSON body verbatim. No schema validation is
    /// performed; callers must null-check nested paths themselves.
    async fn execute(&self, grant_key: &str, doc: QueryDoc) -> Result<Value, CrmError>;
}

/// Stateless client for the CRM's single query-style RPC endpoint.
#[derive(Clone)]
pub struct CrmClient {
    http: reqwest::Client,
    endpoint: String,
}

impl CrmClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl CrmExecutor for CrmClient {
    async fn execute(&self, grant_key: &str, doc: QueryDoc) -> Result<Value, CrmError> {
        let body = doc.into_wire(grant_key);

        // The CRM expects these exact header values even though the payload
        // is JSON.
        let response = self
            .http
            .post(&self.endpoint)
            .header("content-type", "text/plain;charset=UTF-8")
            .header("accept", "*/*")
            .body(body.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("").to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Status {
                status: status.as_u16(),
                reason,
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Request, routing::post, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    async fn spawn_server(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/pave")
    }

    #[tokio::test]
    async fn posts_wire_envelope_with_expected_headers() {
        let captured: Arc<Mutex<Option<(String, String)>>> = Arc::new(Mutex::new(None));
        let captured_clone = captured.clone();

        let router = Router::new().route(
            "/pave",
            post(move |request: Request| {
                let captured = captured_clone.clone();
                async move {
                    let content_type = request
                        .headers()
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
                        .await
                        .unwrap();
                    *captured.lock().unwrap() =
                        Some((content_type, String::from_utf8(body.to_vec()).unwrap()));
                    axum::Json(json!({ "account": { "id": "acc1" } }))
                }
            }),
        );

        let endpoint = spawn_server(router).await;
        let client = CrmClient::new(endpoint);
        let doc = QueryDoc::select().child(
            "account",
            QueryDoc::op(json!({ "id": "acc1" })).field("id"),
        );

        let response = client.execute("gk1", doc).await.unwrap();
        assert_eq!(response["account"]["id"], "acc1");

        let (content_type, body) = captured.lock().unwrap().clone().unwrap();
        assert_eq!(content_type, "text/plain;charset=UTF-8");
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({
                "query": {
                    "$": { "grantKey": "gk1" },
                    "account": { "$": { "id": "acc1" }, "id": {} }
                }
            })
        );
    }

    #[tokio::test]
    async fn non_2xx_surfaces_status_reason_and_body() {
        let router = Router::new().route(
            "/pave",
            post(|| async { (axum::http::StatusCode::PAYMENT_REQUIRED, "grant key expired") }),
        );

        let endpoint = spawn_server(router).await;
        let client = CrmClient::new(endpoint);

        let err = client
            .execute("gk1", QueryDoc::select().field("account"))
            .await
            .unwrap_err();
        match err {
            CrmError::Status { status, reason, body } => {
                assert_eq!(status, 402);
                assert_eq!(reason, "Payment Required");
                assert_eq!(body, "grant key expired");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
