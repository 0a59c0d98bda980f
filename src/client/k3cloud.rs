//! K3 Cloud WebApi client implementation

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde::Serialize;

use super::{InventoryApi, InventoryRecord};
use crate::config::{K3Credentials, K3Settings};
use crate::error::{ApiError, Result};
use crate::signing::{K3Signer, RequestSigner};

/// Bill query service, relative to the server root
const BILL_QUERY_SERVICE: &str =
    "Kingdee.BOS.WebApi.ServicesStub.DynamicFormService.ExecuteBillQuery.common.kdsvc";

/// Inventory form and the five columns mapped by [`InventoryRecord::from_row`]
const INVENTORY_FORM_ID: &str = "STK_Inventory";
const INVENTORY_FIELD_KEYS: &str =
    "FmaterialID.Fnumber,FmaterialID.FName,FStockID.Fnumber,FStockID.Fname,fbaseqty";

const USER_AGENT: &str = "Kingdee/Rust WebApi SDK 7.3 (k3sync)";

/// Request body for `ExecuteBillQuery`
#[derive(Debug, Serialize)]
struct BillQueryRequest<'a> {
    data: BillQuery<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct BillQuery<'a> {
    form_id: &'a str,
    field_keys: &'a str,
    filter_string: String,
    order_string: &'a str,
    top_row_count: usize,
    start_row: usize,
    limit: usize,
    sub_system_id: &'a str,
}

impl<'a> BillQueryRequest<'a> {
    fn inventory(warehouse_code: &str, limit: usize) -> Self {
        Self {
            data: BillQuery {
                form_id: INVENTORY_FORM_ID,
                field_keys: INVENTORY_FIELD_KEYS,
                filter_string: format!("FStockID.Fnumber='{}'", warehouse_code),
                order_string: "",
                top_row_count: 0,
                start_row: 0,
                limit,
                sub_system_id: "",
            },
        }
    }
}

/// K3 Cloud API client
pub struct K3CloudClient {
    http: HttpClient,
    url: Url,
    signer: Arc<dyn RequestSigner>,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl K3CloudClient {
    /// Create a client for the configured server and credentials
    pub fn new(creds: &K3Credentials, settings: &K3Settings) -> Result<Self> {
        Self::with_signer(
            &creds.server_url,
            Arc::new(K3Signer::new(creds)),
            Duration::from_secs(settings.timeout_secs),
            settings.requests_per_second,
        )
    }

    /// Create a client with an explicit signer
    pub fn with_signer(
        server_url: &str,
        signer: Arc<dyn RequestSigner>,
        timeout: Duration,
        requests_per_second: u32,
    ) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let url = Url::parse(&format!(
            "{}/{}",
            server_url.trim_end_matches('/'),
            BILL_QUERY_SERVICE
        ))
        .map_err(|e| ApiError::InvalidResponse(format!("Invalid server URL: {}", e)))?;

        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            http,
            url,
            signer,
            rate_limiter,
        })
    }
}

#[async_trait]
impl InventoryApi for K3CloudClient {
    async fn query_inventory(
        &self,
        warehouse_code: &str,
        limit: usize,
    ) -> std::result::Result<Vec<InventoryRecord>, ApiError> {
        self.rate_limiter.until_ready().await;

        let headers = self
            .signer
            .sign_request(self.url.path(), Utc::now().timestamp())?;

        let mut request = self
            .http
            .post(self.url.clone())
            .header("Accept-Charset", "utf-8")
            .json(&BillQueryRequest::inventory(warehouse_code, limit));
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(ApiError::from)?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthorized(status.as_u16())),
            StatusCode::FORBIDDEN => return Err(ApiError::Forbidden),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ApiError::Http {
                    status: s.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        // Business errors come back as a 200 with an object body
        let rows = match body {
            serde_json::Value::Array(rows) => rows,
            other => {
                log::warn!(
                    "Warehouse {} returned a non-row payload: {}",
                    warehouse_code,
                    other
                );
                return Ok(Vec::new());
            }
        };

        let records: Vec<InventoryRecord> = rows
            .iter()
            .filter_map(|row| row.as_array())
            .map(|row| InventoryRecord::from_row(row))
            .collect();

        log::debug!(
            "Warehouse {} returned {} rows",
            warehouse_code,
            records.len()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::SignedHeaders;
    use mockito::Matcher;

    struct StaticSigner;

    impl RequestSigner for StaticSigner {
        fn sign_request(
            &self,
            path: &str,
            timestamp: i64,
        ) -> std::result::Result<SignedHeaders, ApiError> {
            Ok(vec![
                ("X-Api-Signature", format!("sig:{path}")),
                ("X-Api-Timestamp", timestamp.to_string()),
            ])
        }
    }

    struct RejectingSigner;

    impl RequestSigner for RejectingSigner {
        fn sign_request(&self, _: &str, _: i64) -> std::result::Result<SignedHeaders, ApiError> {
            Err(ApiError::MissingSecret)
        }
    }

    fn client(server: &mockito::Server) -> K3CloudClient {
        K3CloudClient::with_signer(
            &format!("{}/K3Cloud", server.url()),
            Arc::new(StaticSigner),
            Duration::from_secs(5),
            100,
        )
        .unwrap()
    }

    fn service_path() -> String {
        format!("/K3Cloud/{}", BILL_QUERY_SERVICE)
    }

    #[test]
    fn test_bill_query_body() {
        let body = serde_json::to_value(BillQueryRequest::inventory("CK0201", 2)).unwrap();
        assert_eq!(body["data"]["FormId"], "STK_Inventory");
        assert_eq!(body["data"]["FieldKeys"], INVENTORY_FIELD_KEYS);
        assert_eq!(body["data"]["FilterString"], "FStockID.Fnumber='CK0201'");
        assert_eq!(body["data"]["Limit"], 2);
        assert_eq!(body["data"]["TopRowCount"], 0);
        assert_eq!(body["data"]["SubSystemId"], "");
    }

    #[test]
    fn test_invalid_server_url() {
        let result =
            K3CloudClient::with_signer("not a url", Arc::new(StaticSigner), Duration::from_secs(1), 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_query_inventory_maps_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", service_path().as_str())
            .match_header("X-Api-Signature", Matcher::Regex("^sig:/K3Cloud/".to_string()))
            .match_body(Matcher::PartialJson(serde_json::json!({
                "data": { "FilterString": "FStockID.Fnumber='CK0201'", "Limit": 100 }
            })))
            .with_status(200)
            .with_body(
                r#"[["M1","Steel","CK0201","Finished",1000],
                    ["M2","Wire","CK0201","Finished","250.5"],
                    ["M3","Scrap","CK0201","Finished",null]]"#,
            )
            .create_async()
            .await;

        let records = client(&server)
            .query_inventory("CK0201", 100)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].material_code, "M1");
        assert_eq!(records[0].quantity, 1000.0);
        assert_eq!(records[1].quantity, 250.5);
        assert_eq!(records[2].quantity, 0.0);
    }

    #[tokio::test]
    async fn test_query_inventory_http_error_includes_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", service_path().as_str())
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client(&server)
            .query_inventory("CK0201", 100)
            .await
            .unwrap_err();

        match &err {
            ApiError::Http { status, body } => {
                assert_eq!(*status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("Expected ApiError::Http, got {:?}", other),
        }
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_query_inventory_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", service_path().as_str())
            .with_status(401)
            .create_async()
            .await;

        let err = client(&server)
            .query_inventory("CK0201", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(401)));
    }

    #[tokio::test]
    async fn test_query_inventory_object_body_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", service_path().as_str())
            .with_status(200)
            .with_body(r#"{"Result":{"ResponseStatus":{"IsSuccess":false}}}"#)
            .create_async()
            .await;

        let records = client(&server)
            .query_inventory("CK0201", 100)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_query_inventory_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", service_path().as_str())
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let err = client(&server)
            .query_inventory("CK0201", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    /// Accepts connections and never answers
    async fn unresponsive_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}/K3Cloud")
    }

    fn short_timeout_client(server_url: &str) -> K3CloudClient {
        K3CloudClient::with_signer(
            server_url,
            Arc::new(StaticSigner),
            Duration::from_millis(200),
            100,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_query_inventory_timeout_is_network_error() {
        let client = short_timeout_client(&unresponsive_server().await);

        let err = client.query_inventory("CK0201", 100).await.unwrap_err();

        assert!(matches!(err, ApiError::Network(_)), "got {:?}", err);
    }

    /// Routes one warehouse to a server that never answers
    struct SplitClient {
        answering: K3CloudClient,
        hanging: K3CloudClient,
        hanging_code: &'static str,
    }

    #[async_trait]
    impl InventoryApi for SplitClient {
        async fn query_inventory(
            &self,
            warehouse_code: &str,
            limit: usize,
        ) -> std::result::Result<Vec<InventoryRecord>, ApiError> {
            if warehouse_code == self.hanging_code {
                self.hanging.query_inventory(warehouse_code, limit).await
            } else {
                self.answering.query_inventory(warehouse_code, limit).await
            }
        }
    }

    #[tokio::test]
    async fn test_timed_out_warehouse_only_drops_its_rows() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", service_path().as_str())
            .with_status(200)
            .with_body(r#"[["M1","Steel","CK0201","Finished",1000]]"#)
            .create_async()
            .await;

        let client = SplitClient {
            answering: short_timeout_client(&format!("{}/K3Cloud", server.url())),
            hanging: short_timeout_client(&unresponsive_server().await),
            hanging_code: "CK0102",
        };
        let codes = vec!["CK0102".to_string(), "CK0201".to_string()];

        let report = crate::client::query_all_warehouses(&client, &codes, 100).await;

        assert!(report.is_partial());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "CK0102");
        assert!(matches!(report.failed[0].1, ApiError::Network(_)));
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].material_code, "M1");
    }

    #[tokio::test]
    async fn test_signer_failure_skips_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", service_path().as_str())
            .expect(0)
            .create_async()
            .await;

        let client = K3CloudClient::with_signer(
            &format!("{}/K3Cloud", server.url()),
            Arc::new(RejectingSigner),
            Duration::from_secs(5),
            100,
        )
        .unwrap();

        let err = client.query_inventory("CK0201", 100).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingSecret));
        mock.assert_async().await;
    }
}
