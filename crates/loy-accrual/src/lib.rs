//! Accrual-authority client boundary.
//!
//! This crate defines the outcome taxonomy the reconciliation pipeline works
//! with and the HTTP adapter that talks to the external accrual service.
//!
//! One outbound request is issued per order per call. Every transport or
//! decoding failure collapses into [`AccrualOutcome::Transient`] — a checker
//! worker must never crash on a malformed response; the order simply stays
//! unresolved until the next cycle.

use std::time::Duration;

use async_trait::async_trait;
use loy_schemas::{Cents, OrderStatus};
use serde::Deserialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Outcome taxonomy
// ---------------------------------------------------------------------------

/// Result of asking the accrual authority about one order.
#[derive(Clone, Debug, PartialEq)]
pub enum AccrualOutcome {
    /// The authority answered with a definitive (possibly still in-progress)
    /// order status and the points accrued so far.
    Resolved {
        status: OrderStatus,
        accrual: Cents,
    },
    /// HTTP 429. Carries the server-advised resume delay, or the caller's
    /// default backoff when the header was absent or unparseable. Never a
    /// failure — it governs pacing only.
    RateLimited { retry_after: Duration },
    /// The authority does not know this order (yet).
    NotFound,
    /// Transport failure, unexpected status, or undecodable body. The order
    /// is left unresolved for the next cycle.
    Transient(String),
}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// Accrual-authority contract.
///
/// Implementations must be object-safe so the pipeline can hold an
/// `Arc<dyn AccrualApi>`, and `Send + Sync` so workers can share one client
/// across tasks.
#[async_trait]
pub trait AccrualApi: Send + Sync {
    /// Query the authority for one order, identified by its checksum-valid
    /// number. Infallible by signature: all failure modes are encoded in
    /// [`AccrualOutcome`].
    async fn check(&self, order_number: &str) -> AccrualOutcome;
}

// ---------------------------------------------------------------------------
// Wire payload
// ---------------------------------------------------------------------------

/// Successful accrual response body:
/// `{"order":"...","status":"PROCESSED","accrual":729.98}`.
///
/// `accrual` arrives as decimal major units and is converted to [`Cents`]
/// exactly once, here at the decode boundary.
#[derive(Debug, Deserialize)]
struct AccrualResponse {
    #[allow(dead_code)]
    order: String,
    status: String,
    accrual: Option<f64>,
}

/// Statuses the authority reports before an order reaches a terminal state.
/// `REGISTERED` from the authority means "accepted, not yet scored"; we keep
/// the order in PROCESSING locally so it is re-fetched next cycle.
fn map_authority_status(s: &str) -> Option<OrderStatus> {
    match s {
        "REGISTERED" | "PROCESSING" => Some(OrderStatus::Processing),
        "INVALID" => Some(OrderStatus::Invalid),
        "PROCESSED" => Some(OrderStatus::Processed),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// HTTP adapter
// ---------------------------------------------------------------------------

/// Live HTTP client for the accrual authority.
pub struct HttpAccrualClient {
    http: reqwest::Client,
    base_url: String,
    default_backoff: Duration,
}

impl HttpAccrualClient {
    /// `base_url` is the authority root (e.g. `http://localhost:8081`);
    /// `default_backoff` is used for 429 responses without a usable
    /// `Retry-After` header.
    pub fn new(base_url: impl Into<String>, default_backoff: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            default_backoff,
        }
    }

    fn order_url(&self, number: &str) -> String {
        format!(
            "{}/api/orders/{}",
            self.base_url.trim_end_matches('/'),
            number
        )
    }
}

#[async_trait]
impl AccrualApi for HttpAccrualClient {
    async fn check(&self, order_number: &str) -> AccrualOutcome {
        let resp = match self.http.get(self.order_url(order_number)).send().await {
            Ok(r) => r,
            Err(e) => return AccrualOutcome::Transient(format!("accrual request failed: {e}")),
        };

        let status = resp.status();
        debug!(order = order_number, http_status = %status, "accrual response");

        match status.as_u16() {
            200 => {
                let body: AccrualResponse = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        return AccrualOutcome::Transient(format!(
                            "accrual response decode failed: {e}"
                        ))
                    }
                };
                match map_authority_status(&body.status) {
                    Some(mapped) => AccrualOutcome::Resolved {
                        status: mapped,
                        accrual: body
                            .accrual
                            .map(Cents::from_major_f64)
                            .unwrap_or(Cents::ZERO),
                    },
                    None => AccrualOutcome::Transient(format!(
                        "accrual reported unknown status {:?}",
                        body.status
                    )),
                }
            }
            // 204: order accepted nowhere yet; 404: unknown order.
            204 | 404 => AccrualOutcome::NotFound,
            429 => {
                let retry_after = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(self.default_backoff);
                AccrualOutcome::RateLimited { retry_after }
            }
            other => AccrualOutcome::Transient(format!("accrual http status {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_status_mapping() {
        assert_eq!(
            map_authority_status("REGISTERED"),
            Some(OrderStatus::Processing)
        );
        assert_eq!(
            map_authority_status("PROCESSING"),
            Some(OrderStatus::Processing)
        );
        assert_eq!(map_authority_status("INVALID"), Some(OrderStatus::Invalid));
        assert_eq!(
            map_authority_status("PROCESSED"),
            Some(OrderStatus::Processed)
        );
        assert_eq!(map_authority_status("NEW"), None);
    }

    #[test]
    fn order_url_tolerates_trailing_slash() {
        let c = HttpAccrualClient::new("http://accrual:8081/", Duration::from_secs(60));
        assert_eq!(
            c.order_url("79927398713"),
            "http://accrual:8081/api/orders/79927398713"
        );
    }
}
