use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{HealthStatus, ProviderError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::throttling::RateGate;
use crate::ProviderId;

/// Circuit breaker, rate gate and JSON decoding shared by the live adapters.
#[derive(Clone)]
pub(crate) struct ProviderTransport {
    provider: ProviderId,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: Arc<CircuitBreaker>,
    rate_gate: RateGate,
    timeout_ms: u64,
}

impl ProviderTransport {
    pub(crate) fn new(
        provider: ProviderId,
        http_client: Arc<dyn HttpClient>,
        rate_gate: RateGate,
    ) -> Self {
        Self {
            provider,
            http_client,
            circuit_breaker: Arc::new(CircuitBreaker::with_defaults(provider)),
            rate_gate,
            timeout_ms: 8_000,
        }
    }

    pub(crate) fn set_timeout_ms(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }

    pub(crate) fn set_circuit_breaker(&mut self, circuit_breaker: Arc<CircuitBreaker>) {
        self.circuit_breaker = circuit_breaker;
    }

    pub(crate) fn health(&self) -> HealthStatus {
        if self.circuit_breaker.is_open() {
            HealthStatus::unhealthy()
        } else {
            HealthStatus::healthy()
        }
    }

    /// Sends `request` and decodes a JSON body into `T`.
    ///
    /// 404 maps to not-found and 429 to rate-limited; both leave the circuit
    /// alone. Other non-2xx statuses and transport errors count as circuit
    /// failures.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<T, ProviderError> {
        let provider = self.provider;
        if !self.circuit_breaker.allow_request() {
            return Err(ProviderError::unavailable(format!(
                "{provider} circuit breaker is open"
            )));
        }
        if let Err(wait) = self.rate_gate.try_acquire() {
            return Err(ProviderError::rate_limited(format!(
                "{provider} request budget exhausted; retry in {:.2}s",
                wait.as_secs_f64()
            )));
        }

        let request = request.with_timeout_ms(self.timeout_ms);
        let url = request.url.clone();
        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            warn!(%provider, %url, error = error.message(), "provider transport error");
            ProviderError::unavailable(format!("{provider} transport error: {}", error.message()))
        })?;

        match response.status {
            404 => {
                return Err(ProviderError::not_found(format!(
                    "{provider} returned 404 for {url}"
                )))
            }
            429 => {
                return Err(ProviderError::rate_limited(format!(
                    "{provider} returned 429 for {url}"
                )))
            }
            status if !response.is_success() => {
                self.circuit_breaker.record_failure();
                warn!(%provider, %url, status, "provider returned error status");
                return Err(ProviderError::unavailable(format!(
                    "{provider} returned status {status}"
                )));
            }
            _ => {}
        }
        self.circuit_breaker.record_success();

        serde_json::from_str(&response.body).map_err(|error| {
            debug!(%provider, %url, %error, "undecodable provider payload");
            ProviderError::malformed(format!("failed to parse {provider} response: {error}"))
        })
    }
}
