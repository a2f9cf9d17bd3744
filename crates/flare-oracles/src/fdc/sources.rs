//! HTTP proof stages: the FDC verifier API and the DA layer.

use super::fetcher::ProofSource;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const VERIFIER_LABEL: &str = "Flare FDC Verifier API (Coston2 Testnet)";
pub const DA_LAYER_LABEL: &str = "Flare DA Layer (Coston2 Testnet)";

const VERIFIER_PATH: &str = "/verifier/eth/EVMTransaction/prepareRequest";
const VERIFIER_NOTE: &str = "Real response from Flare Verifier API. Status codes 200=success, \
400=validation error (expected for demo tx hashes), 500=server error.";

/// Known Sepolia transaction used as the probe request body.
pub const PROBE_TX_HASH: &str =
    "0x4e636c6f50b2a9539e5e5c5cd3590bd3bb25637a2b1e69f4282a16a0d5a04590";

/// ASCII name left-aligned in a zero-padded bytes32, as FDC encodes type and source ids.
fn bytes32_name(name: &str) -> String {
    let mut word = [0u8; 32];
    let n = name.len().min(32);
    word[..n].copy_from_slice(&name.as_bytes()[..n]);
    format!("0x{}", hex::encode(word))
}

fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Stage one: POST an EVMTransaction `prepareRequest` to the verifier.
///
/// Any JSON body counts as a hit, including 4xx validation responses.
pub struct VerifierApiSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl VerifierApiSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}", trim_base(&self.base_url), VERIFIER_PATH)
    }

    fn request_body() -> Value {
        json!({
            "attestationType": bytes32_name("EVMTransaction"),
            "sourceId": bytes32_name("testETH"),
            "requestBody": {
                "transactionHash": PROBE_TX_HASH,
                "requiredConfirmations": "1",
                "provideInput": true,
                "listEvents": true,
                "logIndices": [],
            },
        })
    }
}

#[async_trait]
impl ProofSource for VerifierApiSource {
    fn label(&self) -> &str {
        VERIFIER_LABEL
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, _round_id: u64) -> Option<Value> {
        let endpoint = self.endpoint();
        let response = self
            .client
            .post(&endpoint)
            .header("X-API-KEY", &self.api_key)
            .timeout(self.timeout)
            .json(&Self::request_body())
            .send()
            .await
            .map_err(|e| debug!(error = %e, "verifier request failed"))
            .ok()?;

        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|e| debug!(error = %e, status, "verifier body is not JSON"))
            .ok()?;

        Some(json!({
            "api_status_code": status,
            "api_response": body,
            "endpoint": endpoint,
            "note": VERIFIER_NOTE,
        }))
    }
}

/// Stage two: GET the proof for a round from the DA layer.
pub struct DaLayerSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl DaLayerSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn endpoint(&self, round_id: u64) -> String {
        format!(
            "{}/api/v1/fdc/proof-by-request-round/{}",
            trim_base(&self.base_url),
            round_id
        )
    }
}

#[async_trait]
impl ProofSource for DaLayerSource {
    fn label(&self) -> &str {
        DA_LAYER_LABEL
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, round_id: u64) -> Option<Value> {
        let response = self
            .client
            .get(self.endpoint(round_id))
            .header("X-API-KEY", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| debug!(error = %e, "DA layer request failed"))
            .ok()?;

        if response.status() != reqwest::StatusCode::OK {
            debug!(status = %response.status(), "DA layer returned non-200");
            return None;
        }

        response
            .json()
            .await
            .map_err(|e| debug!(error = %e, "DA layer body is not JSON"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn verifier(server: &MockServer) -> VerifierApiSource {
        VerifierApiSource::new(
            reqwest::Client::new(),
            server.uri(),
            "test-key",
            Duration::from_secs(2),
        )
    }

    fn da_layer(server: &MockServer) -> DaLayerSource {
        DaLayerSource::new(
            reqwest::Client::new(),
            format!("{}/", server.uri()),
            "test-key",
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_bytes32_names() {
        assert_eq!(
            bytes32_name("EVMTransaction"),
            format!("0x45564d5472616e73616374696f6e{}", "00".repeat(18))
        );
        assert_eq!(
            bytes32_name("testETH"),
            format!("0x74657374455448{}", "00".repeat(25))
        );
    }

    #[tokio::test]
    async fn test_verifier_validation_error_is_still_a_hit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(VERIFIER_PATH))
            .and(header("X-API-KEY", "test-key"))
            .and(body_partial_json(json!({
                "requestBody": { "transactionHash": PROBE_TX_HASH }
            })))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "status": "INVALID" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let proof = verifier(&server).fetch(1).await.expect("JSON body is a hit");
        assert_eq!(proof["api_status_code"], 400);
        assert_eq!(proof["api_response"]["status"], "INVALID");
        assert!(proof["endpoint"].as_str().unwrap().ends_with(VERIFIER_PATH));
    }

    #[tokio::test]
    async fn test_verifier_non_json_is_miss() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        assert!(verifier(&server).fetch(1).await.is_none());
    }

    #[tokio::test]
    async fn test_da_layer_hit_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/fdc/proof-by-request-round/915000"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{ "proof": ["0x01"] }])),
            )
            .mount(&server)
            .await;

        let proof = da_layer(&server).fetch(915_000).await.unwrap();
        assert_eq!(proof[0]["proof"][0], "0x01");
    }

    #[tokio::test]
    async fn test_da_layer_miss_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "nope" })))
            .mount(&server)
            .await;

        assert!(da_layer(&server).fetch(1).await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_miss() {
        let source = DaLayerSource::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1",
            "k",
            Duration::from_millis(500),
        );
        assert!(source.fetch(1).await.is_none());
    }
}
