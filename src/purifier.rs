//! Air-purifier control state machine.
//!
//! The realtime store holds a flat [`PurifierRecord`] per device. Control
//! requests are evaluated against a [`PurifierState`] derived from that
//! record; each accepted transition yields the [`PurifierUpdate`] to PATCH
//! back. Rejected transitions yield `None` and nothing is written.

use serde::{Deserialize, Serialize};

// ---

/// Fan speed written while the purifier is off.
pub const FAN_OFF: u32 = 1425;
/// Lowest running speed; also the speed a fresh `turn_on` starts at.
pub const FAN_BASELINE: u32 = 1426;
pub const FAN_MAX: u32 = 1550;
/// Speed pinned while efficient filtration is enabled.
pub const FAN_EFFICIENT: u32 = 1500;

/// Purifier id used when a request does not name one.
pub const DEFAULT_PURIFIER_ID: &str = "MHXY_001";

/// Stored purifier fields. Every field may be missing from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurifierRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficient_filtration: Option<bool>,
    /// Last speed chosen by hand, restored when efficient mode is left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_fan_speed: Option<f64>,
    /// Cumulative volume filtered, m³.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_filtered: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<String>,
}

/// Field-level PATCH body. Fields left `None` are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurifierUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_speed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficient_filtration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_fan_speed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<String>,
}

impl PurifierUpdate {
    /// Apply optimistically to a local copy of the record.
    pub fn apply_to(&self, record: &mut PurifierRecord) {
        // ---
        if let Some(status) = self.status {
            record.status = Some(status);
        }
        if let Some(speed) = self.fan_speed {
            record.fan_speed = Some(f64::from(speed));
        }
        if let Some(efficient) = self.efficient_filtration {
            record.efficient_filtration = Some(efficient);
        }
        if let Some(speed) = self.manual_fan_speed {
            record.manual_fan_speed = Some(f64::from(speed));
        }
        if let Some(date) = &self.last_maintenance {
            record.last_maintenance = Some(date.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PurifierMode {
    Off,
    OnManual,
    OnEfficient,
}

/// Control view of a purifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurifierState {
    mode: PurifierMode,
    /// Stored efficient flag. Survives `turn_off` so the next `turn_on`
    /// comes back in efficient mode.
    efficient: bool,
    manual_speed: u32,
}

fn clamp_speed(speed: f64) -> u32 {
    speed.round().clamp(f64::from(FAN_BASELINE), f64::from(FAN_MAX)) as u32
}

impl PurifierState {
    pub fn from_record(record: &PurifierRecord) -> Self {
        // ---
        let on = record.status.unwrap_or(false);
        let efficient = record.efficient_filtration.unwrap_or(false);
        let mode = match (on, efficient) {
            (false, _) => PurifierMode::Off,
            (true, false) => PurifierMode::OnManual,
            (true, true) => PurifierMode::OnEfficient,
        };

        // A running manual purifier's stored speed is its manual speed
        let manual_speed = record
            .manual_fan_speed
            .or_else(|| record.fan_speed.filter(|_| mode == PurifierMode::OnManual))
            .map(clamp_speed)
            .unwrap_or(FAN_BASELINE);

        Self {
            mode,
            efficient,
            manual_speed,
        }
    }

    pub fn mode(&self) -> PurifierMode {
        self.mode
    }

    pub fn is_on(&self) -> bool {
        self.mode != PurifierMode::Off
    }

    /// Whether the manual speed control has any effect.
    pub fn slider_enabled(&self) -> bool {
        self.mode == PurifierMode::OnManual
    }

    /// Speed the fan is actually running at.
    pub fn effective_speed(&self) -> u32 {
        match self.mode {
            PurifierMode::Off => FAN_OFF,
            PurifierMode::OnEfficient => FAN_EFFICIENT,
            PurifierMode::OnManual => self.manual_speed,
        }
    }

    pub fn turn_on(&mut self) -> Option<PurifierUpdate> {
        // ---
        if self.is_on() {
            return None;
        }
        if self.efficient {
            self.mode = PurifierMode::OnEfficient;
        } else {
            self.mode = PurifierMode::OnManual;
            self.manual_speed = FAN_BASELINE;
        }
        Some(PurifierUpdate {
            status: Some(true),
            fan_speed: Some(self.effective_speed()),
            ..Default::default()
        })
    }

    pub fn turn_off(&mut self) -> Option<PurifierUpdate> {
        // ---
        if !self.is_on() {
            return None;
        }
        self.mode = PurifierMode::Off;
        Some(PurifierUpdate {
            status: Some(false),
            fan_speed: Some(FAN_OFF),
            ..Default::default()
        })
    }

    /// Only legal while running.
    pub fn set_efficient(&mut self, enabled: bool) -> Option<PurifierUpdate> {
        // ---
        match (self.mode, enabled) {
            (PurifierMode::OnManual, true) => {
                self.mode = PurifierMode::OnEfficient;
                self.efficient = true;
                Some(PurifierUpdate {
                    efficient_filtration: Some(true),
                    fan_speed: Some(FAN_EFFICIENT),
                    manual_fan_speed: Some(self.manual_speed),
                    ..Default::default()
                })
            }
            (PurifierMode::OnEfficient, false) => {
                self.mode = PurifierMode::OnManual;
                self.efficient = false;
                Some(PurifierUpdate {
                    efficient_filtration: Some(false),
                    fan_speed: Some(self.manual_speed),
                    ..Default::default()
                })
            }
            _ => None,
        }
    }

    /// Manual speed change, clamped to [`FAN_BASELINE`]..=[`FAN_MAX`].
    /// Ignored while off or in efficient mode.
    pub fn set_speed(&mut self, speed: f64) -> Option<PurifierUpdate> {
        // ---
        if self.mode != PurifierMode::OnManual || !speed.is_finite() {
            return None;
        }
        self.manual_speed = clamp_speed(speed);
        Some(PurifierUpdate {
            fan_speed: Some(self.manual_speed),
            manual_fan_speed: Some(self.manual_speed),
            ..Default::default()
        })
    }
}

/// Record a maintenance visit at `date`, or now.
pub fn mark_maintenance(date: Option<String>) -> PurifierUpdate {
    PurifierUpdate {
        last_maintenance: Some(date.unwrap_or_else(|| chrono::Utc::now().to_rfc3339())),
        ..Default::default()
    }
}

/// What the control endpoints report back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurifierView {
    pub id: String,
    pub mode: PurifierMode,
    pub effective_speed: u32,
    pub slider_enabled: bool,
    pub record: PurifierRecord,
}

impl PurifierView {
    pub fn new(id: impl Into<String>, record: PurifierRecord) -> Self {
        let state = PurifierState::from_record(&record);
        Self {
            id: id.into(),
            mode: state.mode(),
            effective_speed: state.effective_speed(),
            slider_enabled: state.slider_enabled(),
            record,
        }
    }
}
