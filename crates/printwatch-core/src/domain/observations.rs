//! The observation table: every reading PrintWatch can derive from a
//! [`StatusSnapshot`].
//!
//! Each entry pairs a stable key with a pure function over the snapshot.
//! The table is a fixed, enumerable constant rather than a set of
//! runtime-registered closures, so the supported observations can be
//! listed, documented, and tested in isolation.

use super::status::{MachineState, StatusSnapshot};

/// A single value read out of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
}

/// One row of the observation table.
pub struct ObservationSpec {
    /// Stable machine-readable key, e.g. `"nozzle_temperature"`.
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Unit suffix for display, if the value carries one.
    pub unit: Option<&'static str>,
    /// Pure transform from snapshot to value.  Absent source fields map to
    /// the reading's documented fallback, never to a panic.
    pub read: fn(&StatusSnapshot) -> ObservedValue,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Remaining job time in seconds: the printer's own total estimate minus
/// the elapsed duration, clamped at zero.  When no estimate is reported
/// the remaining time is unknowable and reads as zero.
fn remaining_time(s: &StatusSnapshot) -> u64 {
    match s.estimated_time {
        Some(est) => est.saturating_sub(s.print_duration.unwrap_or(0)),
        None => 0,
    }
}

/// All observations PrintWatch derives from one snapshot.
pub const OBSERVATIONS: &[ObservationSpec] = &[
    ObservationSpec {
        key: "machine_status",
        label: "Machine Status",
        unit: None,
        read: |s| ObservedValue::Text(s.machine_state.as_str().to_string()),
    },
    ObservationSpec {
        key: "nozzle_temperature",
        label: "Nozzle Temperature",
        unit: Some("°C"),
        read: |s| ObservedValue::Decimal(s.extruder.map_or(0.0, |t| round2(t.current))),
    },
    ObservationSpec {
        key: "nozzle_target_temperature",
        label: "Nozzle Target Temperature",
        unit: Some("°C"),
        read: |s| ObservedValue::Decimal(s.extruder.map_or(0.0, |t| round2(t.target))),
    },
    ObservationSpec {
        key: "bed_temperature",
        label: "Bed Temperature",
        unit: Some("°C"),
        read: |s| ObservedValue::Decimal(s.print_bed.map_or(0.0, |t| round2(t.current))),
    },
    ObservationSpec {
        key: "bed_target_temperature",
        label: "Bed Target Temperature",
        unit: Some("°C"),
        read: |s| ObservedValue::Decimal(s.print_bed.map_or(0.0, |t| round2(t.target))),
    },
    ObservationSpec {
        key: "print_progress",
        label: "Print Progress",
        unit: Some("%"),
        read: |s| ObservedValue::Integer(s.print_progress.unwrap_or(0.0) as i64),
    },
    ObservationSpec {
        key: "current_file",
        label: "Current File",
        unit: None,
        read: |s| {
            ObservedValue::Text(
                s.print_file_name
                    .clone()
                    .unwrap_or_else(|| "None".to_string()),
            )
        },
    },
    ObservationSpec {
        key: "current_layer",
        label: "Current Layer",
        unit: None,
        read: |s| ObservedValue::Integer(i64::from(s.current_print_layer.unwrap_or(0))),
    },
    ObservationSpec {
        key: "total_layers",
        label: "Total Layers",
        unit: None,
        read: |s| ObservedValue::Integer(i64::from(s.total_print_layers.unwrap_or(0))),
    },
    ObservationSpec {
        key: "elapsed_time",
        label: "Elapsed Time",
        unit: Some("s"),
        read: |s| ObservedValue::Integer(s.print_duration.unwrap_or(0) as i64),
    },
    ObservationSpec {
        key: "remaining_time",
        label: "Remaining Time",
        unit: Some("s"),
        read: |s| ObservedValue::Integer(remaining_time(s) as i64),
    },
    ObservationSpec {
        key: "filament_length",
        label: "Filament Length",
        unit: Some("m"),
        read: |s| ObservedValue::Decimal(s.est_length.map_or(0.0, round2)),
    },
    ObservationSpec {
        key: "filament_weight",
        label: "Filament Weight",
        unit: Some("g"),
        read: |s| ObservedValue::Decimal(s.est_weight.map_or(0.0, round2)),
    },
    ObservationSpec {
        key: "print_speed",
        label: "Print Speed",
        unit: Some("%"),
        read: |s| ObservedValue::Integer(i64::from(s.print_speed_adjust.unwrap_or(100))),
    },
    ObservationSpec {
        key: "z_offset",
        label: "Z-Axis Offset",
        unit: Some("mm"),
        read: |s| ObservedValue::Decimal(s.z_axis_compensation.map_or(0.0, round3)),
    },
    ObservationSpec {
        key: "nozzle_size",
        label: "Nozzle Size",
        unit: None,
        read: |s| {
            ObservedValue::Text(s.nozzle_size.clone().unwrap_or_else(|| "Unknown".to_string()))
        },
    },
    ObservationSpec {
        key: "filament_type",
        label: "Filament Type",
        unit: None,
        read: |s| {
            ObservedValue::Text(
                s.filament_type
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
            )
        },
    },
    ObservationSpec {
        key: "lifetime_filament",
        label: "Lifetime Filament Usage",
        unit: Some("m"),
        read: |s| ObservedValue::Decimal(s.cumulative_filament.map_or(0.0, round2)),
    },
    ObservationSpec {
        key: "is_printing",
        label: "Printing",
        unit: None,
        read: |s| {
            ObservedValue::Text(
                if s.machine_state == MachineState::Building {
                    "on"
                } else {
                    "off"
                }
                .to_string(),
            )
        },
    },
];

/// Looks an observation up by its key.
pub fn lookup_observation(key: &str) -> Option<&'static ObservationSpec> {
    OBSERVATIONS.iter().find(|o| o.key == key)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::Temperature;

    /// Snapshot mid-print with every field populated.
    fn printing_snapshot() -> StatusSnapshot {
        StatusSnapshot {
            machine_state: MachineState::Building,
            name: Some("Adventurer 5M Pro".to_string()),
            extruder: Some(Temperature {
                current: 219.876,
                target: 220.0,
            }),
            print_bed: Some(Temperature {
                current: 60.02,
                target: 60.0,
            }),
            print_progress: Some(42.7),
            print_file_name: Some("benchy.3mf".to_string()),
            current_print_layer: Some(87),
            total_print_layers: Some(203),
            print_duration: Some(1_800),
            estimated_time: Some(4_200),
            est_length: Some(3.456),
            est_weight: Some(10.289),
            print_speed_adjust: Some(110),
            z_axis_compensation: Some(0.0525),
            nozzle_size: Some("0.4mm".to_string()),
            filament_type: Some("PLA".to_string()),
            cumulative_filament: Some(1234.567),
        }
    }

    fn read(key: &str, snap: &StatusSnapshot) -> ObservedValue {
        (lookup_observation(key).expect(key).read)(snap)
    }

    #[test]
    fn test_table_keys_are_unique() {
        let mut keys: Vec<_> = OBSERVATIONS.iter().map(|o| o.key).collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total, "duplicate observation key");
    }

    #[test]
    fn test_machine_status_reads_state_name() {
        let snap = printing_snapshot();
        assert_eq!(
            read("machine_status", &snap),
            ObservedValue::Text("BUILDING".to_string())
        );
    }

    #[test]
    fn test_nozzle_temperature_rounds_to_two_decimals() {
        let snap = printing_snapshot();
        assert_eq!(
            read("nozzle_temperature", &snap),
            ObservedValue::Decimal(219.88)
        );
    }

    #[test]
    fn test_remaining_time_is_estimate_minus_elapsed() {
        let snap = printing_snapshot();
        assert_eq!(read("remaining_time", &snap), ObservedValue::Integer(2_400));
    }

    #[test]
    fn test_remaining_time_clamps_at_zero_when_overrun() {
        // Job running longer than the printer estimated
        let mut snap = printing_snapshot();
        snap.print_duration = Some(5_000);
        assert_eq!(read("remaining_time", &snap), ObservedValue::Integer(0));
    }

    #[test]
    fn test_remaining_time_without_estimate_reads_zero() {
        let mut snap = printing_snapshot();
        snap.estimated_time = None;
        assert_eq!(read("remaining_time", &snap), ObservedValue::Integer(0));
    }

    #[test]
    fn test_empty_snapshot_yields_fallbacks_for_every_observation() {
        // An idle printer reports nothing; every reading must still produce
        // a value rather than panic.
        let snap = StatusSnapshot::default();
        for spec in OBSERVATIONS {
            let value = (spec.read)(&snap);
            match spec.key {
                "current_file" => {
                    assert_eq!(value, ObservedValue::Text("None".to_string()))
                }
                "print_speed" => assert_eq!(value, ObservedValue::Integer(100)),
                "machine_status" => {
                    assert_eq!(value, ObservedValue::Text("UNKNOWN".to_string()))
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_is_printing_tracks_building_state() {
        let mut snap = printing_snapshot();
        assert_eq!(
            read("is_printing", &snap),
            ObservedValue::Text("on".to_string())
        );
        snap.machine_state = MachineState::Ready;
        assert_eq!(
            read("is_printing", &snap),
            ObservedValue::Text("off".to_string())
        );
    }

    #[test]
    fn test_lookup_observation_returns_none_for_unknown_key() {
        assert!(lookup_observation("warp_core_temperature").is_none());
    }
}
