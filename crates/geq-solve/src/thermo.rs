//! Owned species thermodynamic-data handles.

/// Reference-state model selector for a species' thermo data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ThermoModel {
    /// Constant standard-state chemical potential.
    #[default]
    Constant,
    /// Polynomial fit in temperature; coefficients in `coeffs`.
    Polynomial,
    /// Evaluated by an external property provider.
    External,
}

/// Thermodynamic data for one species.
///
/// The workspace owns one handle per species slot, duplicated from the
/// problem statement at import so that no aliasing survives the transfer.
/// Evaluating these coefficients is the property provider's business; the
/// workspace only stores and transports them.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeciesThermo {
    pub model: ThermoModel,
    /// Standard-state chemical potential at the reference temperature.
    pub mu0_ref: f64,
    /// Reference temperature (K).
    pub t_ref: f64,
    /// Model coefficients; meaning depends on `model`.
    pub coeffs: Vec<f64>,
}

impl SpeciesThermo {
    /// Duplicate this handle for workspace ownership.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }
}
