use domain::{FeeSchedule, StateExpirations};

/// Default brand suffix appended to charge descriptions.
pub const DEFAULT_CHARGE_DESCRIPTION_SUFFIX: &str = " via Artsy";

/// Domain knobs shared by the coordinator, lifecycle and reconciler.
#[derive(Debug, Clone)]
pub struct CommitSettings {
    pub charge_description_suffix: String,
    pub fees: FeeSchedule,
    pub expirations: StateExpirations,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            charge_description_suffix: DEFAULT_CHARGE_DESCRIPTION_SUFFIX.to_string(),
            fees: FeeSchedule::default(),
            expirations: StateExpirations::default(),
        }
    }
}
