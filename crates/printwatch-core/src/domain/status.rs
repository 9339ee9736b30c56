//! The point-in-time status snapshot returned by a printer poll.
//!
//! A [`StatusSnapshot`] is an immutable value.  The polling coordinator
//! stores and republishes it without looking inside; field-level
//! interpretation happens only through the observation table in
//! [`super::observations`].

/// Coarse machine state reported by the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineState {
    /// Idle and ready to accept a job.
    Ready,
    /// Printing from local storage.
    Building,
    /// Job paused by the operator.
    Paused,
    /// Job finished, awaiting plate removal.
    Completed,
    /// Printer-reported fault.
    Error,
    /// Transient states (homing, heating, cancelling).
    Busy,
    /// Anything the wire value did not map to.
    #[default]
    Unknown,
}

impl MachineState {
    /// Maps the printer's wire status string onto a [`MachineState`].
    ///
    /// Unrecognised strings become [`MachineState::Unknown`] rather than an
    /// error; firmware revisions add states faster than this table changes.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "READY" => Self::Ready,
            "BUILDING_FROM_SD" => Self::Building,
            "PAUSED" => Self::Paused,
            "COMPLETED" => Self::Completed,
            "ERROR" => Self::Error,
            "BUSY" | "HEATING" | "HOMING" | "CANCELLING" => Self::Busy,
            _ => Self::Unknown,
        }
    }

    /// Uppercase name used for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Building => "BUILDING",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Busy => "BUSY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// A current/target temperature pair in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Temperature {
    pub current: f64,
    pub target: f64,
}

/// Everything one poll of the printer's status endpoint reports.
///
/// Every field beyond the machine state is optional: older firmware omits
/// fields, and an idle printer reports no job data at all.  Consumers read
/// fields through the observation table, which supplies the fallback for
/// each absent value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusSnapshot {
    pub machine_state: MachineState,
    /// Model/display name the printer reports about itself.
    pub name: Option<String>,
    pub extruder: Option<Temperature>,
    pub print_bed: Option<Temperature>,
    /// Job completion in percent, 0.0..=100.0.
    pub print_progress: Option<f64>,
    pub print_file_name: Option<String>,
    pub current_print_layer: Option<u32>,
    pub total_print_layers: Option<u32>,
    /// Seconds the current job has been running.
    pub print_duration: Option<u64>,
    /// Printer's own estimate of total job duration, in seconds.
    pub estimated_time: Option<u64>,
    /// Estimated filament length for the job, in metres.
    pub est_length: Option<f64>,
    /// Estimated filament weight for the job, in grams.
    pub est_weight: Option<f64>,
    /// Speed override in percent (100 = unmodified).
    pub print_speed_adjust: Option<u32>,
    /// Z-axis compensation offset in millimetres.
    pub z_axis_compensation: Option<f64>,
    pub nozzle_size: Option<String>,
    pub filament_type: Option<String>,
    /// Lifetime filament usage in metres.
    pub cumulative_filament: Option<f64>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
