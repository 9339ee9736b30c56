//! HTTP client for the printer's control endpoint.
//!
//! Printers in this family expose a JSON-over-HTTP control port (default
//! 8898).  Every request carries the serial number and check code in the
//! body; the response is an envelope of `{code, message, detail}` where
//! `code == 0` means success.
//!
//! Two endpoints matter here:
//!
//! - `POST /detail`  – full machine status; also the reachability probe.
//! - `POST /product` – a no-op product query whose acceptance is the
//!   authoritative credential check.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use printwatch_core::{MachineState, StatusSnapshot, Temperature};

use super::{DeviceClient, DeviceError, DeviceTarget};

/// Default HTTP control port.
pub const DEFAULT_HTTP_PORT: u16 = 8898;

/// Per-request deadline.  Printers answer on a LAN in well under a second;
/// anything slower than this is effectively unreachable.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Envelope wrapping every control-endpoint response.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    detail: Option<T>,
}

/// Credentials repeated in every request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    serial_number: &'a str,
    check_code: &'a str,
}

/// Machine status payload as the printer reports it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DetailPayload {
    status: Option<String>,
    name: Option<String>,
    right_temp: Option<f64>,
    right_target_temp: Option<f64>,
    plat_temp: Option<f64>,
    plat_target_temp: Option<f64>,
    /// Job completion as a 0..1 fraction on the wire.
    print_progress: Option<f64>,
    print_file_name: Option<String>,
    current_print_layer: Option<u32>,
    target_print_layer: Option<u32>,
    print_duration: Option<u64>,
    estimated_time: Option<u64>,
    estimated_right_len: Option<f64>,
    estimated_right_weight: Option<f64>,
    print_speed_adjust: Option<u32>,
    z_axis_compensation: Option<f64>,
    nozzle_model: Option<String>,
    filament_type: Option<String>,
    cumulative_filament: Option<f64>,
}

impl From<DetailPayload> for StatusSnapshot {
    fn from(d: DetailPayload) -> Self {
        StatusSnapshot {
            machine_state: d
                .status
                .as_deref()
                .map(MachineState::from_wire)
                .unwrap_or_default(),
            name: d.name,
            extruder: zip_temperature(d.right_temp, d.right_target_temp),
            print_bed: zip_temperature(d.plat_temp, d.plat_target_temp),
            print_progress: d.print_progress.map(|fraction| fraction * 100.0),
            print_file_name: d.print_file_name,
            current_print_layer: d.current_print_layer,
            total_print_layers: d.target_print_layer,
            print_duration: d.print_duration,
            estimated_time: d.estimated_time,
            est_length: d.estimated_right_len,
            est_weight: d.estimated_right_weight,
            print_speed_adjust: d.print_speed_adjust,
            z_axis_compensation: d.z_axis_compensation,
            nozzle_size: d.nozzle_model,
            filament_type: d.filament_type,
            cumulative_filament: d.cumulative_filament,
        }
    }
}

fn zip_temperature(current: Option<f64>, target: Option<f64>) -> Option<Temperature> {
    current.map(|current| Temperature {
        current,
        target: target.unwrap_or(0.0),
    })
}

/// Production [`DeviceClient`] over reqwest.
///
/// One instance serves any number of printers; reqwest pools connections
/// internally, and dropping the client releases them.
pub struct HttpDeviceClient {
    http: reqwest::Client,
    port: u16,
}

impl HttpDeviceClient {
    pub fn new(port: u16) -> Self {
        Self {
            http: reqwest::Client::new(),
            port,
        }
    }

    fn endpoint(&self, address: IpAddr, path: &str) -> String {
        format!("http://{address}:{port}{path}", port = self.port)
    }

    /// POSTs the auth body to `path` and decodes the envelope.
    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        target: &DeviceTarget,
        path: &str,
    ) -> Result<Envelope<T>, DeviceError> {
        let url = self.endpoint(target.address, path);
        let body = AuthBody {
            serial_number: &target.serial_number,
            check_code: &target.check_code,
        };

        let response = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeviceError::Unreachable {
                address: target.address,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::Unreachable {
                address: target.address,
                reason: format!("HTTP {status} from {path}"),
            });
        }

        response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| DeviceError::Malformed {
                address: target.address,
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    async fn fetch_status(&self, target: &DeviceTarget) -> Result<StatusSnapshot, DeviceError> {
        let envelope: Envelope<DetailPayload> = self.post(target, "/detail").await?;

        if envelope.code != 0 {
            return Err(DeviceError::Malformed {
                address: target.address,
                reason: format!(
                    "detail query failed with code {}: {}",
                    envelope.code, envelope.message
                ),
            });
        }

        let detail = envelope.detail.ok_or_else(|| DeviceError::Malformed {
            address: target.address,
            reason: "detail response carried no payload".to_string(),
        })?;

        debug!("fetched status from {}", target.address);
        Ok(detail.into())
    }

    async fn check_credential(&self, target: &DeviceTarget) -> Result<bool, DeviceError> {
        // The product endpoint rejects bad check codes with a nonzero
        // envelope code; that answer *is* the credential verdict.
        let envelope: Envelope<serde_json::Value> = self.post(target, "/product").await?;
        debug!(
            "credential check against {} returned code {}",
            target.address, envelope.code
        );
        Ok(envelope.code == 0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_payload_maps_into_snapshot() {
        // Arrange: a mid-print payload as the printer would send it
        let json = r#"{
            "code": 0,
            "message": "ok",
            "detail": {
                "status": "BUILDING_FROM_SD",
                "name": "Adventurer 5M Pro",
                "rightTemp": 219.9,
                "rightTargetTemp": 220.0,
                "platTemp": 60.1,
                "platTargetTemp": 60.0,
                "printProgress": 0.427,
                "printFileName": "benchy.3mf",
                "currentPrintLayer": 87,
                "targetPrintLayer": 203,
                "printDuration": 1800,
                "estimatedTime": 4200,
                "printSpeedAdjust": 110
            }
        }"#;

        // Act
        let envelope: Envelope<DetailPayload> = serde_json::from_str(json).expect("decode");
        let snapshot: StatusSnapshot = envelope.detail.expect("detail").into();

        // Assert
        assert_eq!(snapshot.machine_state, MachineState::Building);
        assert_eq!(snapshot.name.as_deref(), Some("Adventurer 5M Pro"));
        assert_eq!(snapshot.extruder.map(|t| t.target), Some(220.0));
        // Wire fraction becomes a percentage
        assert!((snapshot.print_progress.unwrap() - 42.7).abs() < 1e-9);
        assert_eq!(snapshot.total_print_layers, Some(203));
    }

    #[test]
    fn test_sparse_payload_maps_to_mostly_empty_snapshot() {
        // Older firmware reports only the status string
        let json = r#"{"code": 0, "detail": {"status": "READY"}}"#;
        let envelope: Envelope<DetailPayload> = serde_json::from_str(json).expect("decode");
        let snapshot: StatusSnapshot = envelope.detail.expect("detail").into();

        assert_eq!(snapshot.machine_state, MachineState::Ready);
        assert!(snapshot.extruder.is_none());
        assert!(snapshot.print_progress.is_none());
        assert!(snapshot.print_file_name.is_none());
    }

    #[test]
    fn test_envelope_without_detail_decodes() {
        // The product endpoint answers with just a code
        let json = r#"{"code": 0, "message": "ok"}"#;
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(json).expect("decode");
        assert_eq!(envelope.code, 0);
        assert!(envelope.detail.is_none());
    }

    #[test]
    fn test_rejection_envelope_decodes_with_nonzero_code() {
        let json = r#"{"code": 401, "message": "check code mismatch"}"#;
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(json).expect("decode");
        assert_eq!(envelope.code, 401);
        assert_eq!(envelope.message, "check code mismatch");
    }

    #[test]
    fn test_auth_body_serializes_camel_case() {
        let body = AuthBody {
            serial_number: "SN-100",
            check_code: "c0de",
        };
        let json = serde_json::to_string(&body).expect("encode");
        assert_eq!(json, r#"{"serialNumber":"SN-100","checkCode":"c0de"}"#);
    }

    #[test]
    fn test_endpoint_formats_address_and_port() {
        let client = HttpDeviceClient::new(DEFAULT_HTTP_PORT);
        let url = client.endpoint("192.168.1.30".parse().unwrap(), "/detail");
        assert_eq!(url, "http://192.168.1.30:8898/detail");
    }
}
