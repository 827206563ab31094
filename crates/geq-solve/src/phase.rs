//! Per-phase state carried through import, solve and export.

use geq_core::{CoreError, CoreResult};

/// Whether a phase is present in the converged solution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Existence {
    /// Zeroed out of the solution.
    #[default]
    Absent,
    /// Present with nonzero moles.
    Present,
    /// Cannot vanish (carries inert moles).
    AlwaysPresent,
}

/// Activity convention for the species of a phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActivityConvention {
    /// Activities based on mole fractions.
    #[default]
    MoleFraction,
    /// Molality-based activities; member slot 0 is the solvent.
    Molality,
}

/// One phase of the equilibrium problem.
///
/// Member arrays are indexed by phase-local slot. `members` maps each slot
/// to a species index in the owning ordering: external indices for phases
/// held by a problem statement, solution-vector indices for phases owned by
/// the workspace.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Phase {
    /// Identity fixed at one-time preparation; checked on respecify.
    pub id: Option<usize>,
    pub name: String,
    /// Exactly one mole-number species and no inert content.
    pub single_species: bool,
    pub gas_phase: bool,
    /// Equation-of-state selector, opaque to the workspace.
    pub eos_tag: i32,
    pub existence: Existence,
    pub activity_convention: ActivityConvention,
    /// Moles of inert constituents that never react away.
    pub inert_moles: f64,
    /// Phase-local slot holding the interfacial-voltage unknown, if any.
    pub phi_var_index: Option<usize>,
    pub members: Vec<usize>,
    pub mole_fractions: Vec<f64>,
    /// Standard-state chemical potentials per member.
    pub ss_chem_potentials: Vec<f64>,
    /// Reference (star-state) chemical potentials per member.
    pub ref_chem_potentials: Vec<f64>,
    pub ref_molar_volumes: Vec<f64>,
    pub partial_molar_volumes: Vec<f64>,
    pub activity_coeffs: Vec<f64>,
    total_moles: f64,
    electric_potential: f64,
}

impl Phase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a member species; the per-slot arrays grow in lockstep.
    pub fn add_member(&mut self, species: usize) -> usize {
        self.members.push(species);
        self.mole_fractions.push(0.0);
        self.ss_chem_potentials.push(0.0);
        self.ref_chem_potentials.push(0.0);
        self.ref_molar_volumes.push(0.0);
        self.partial_molar_volumes.push(0.0);
        self.activity_coeffs.push(1.0);
        self.members.len() - 1
    }

    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Mole fraction stored for a phase-local slot.
    pub fn mole_fraction(&self, slot: usize) -> f64 {
        self.mole_fractions[slot]
    }

    pub fn set_mole_fractions(&mut self, xs: &[f64]) -> CoreResult<()> {
        if xs.len() != self.members.len() {
            return Err(CoreError::Invariant {
                what: "mole-fraction vector length != member count",
            });
        }
        self.mole_fractions.copy_from_slice(xs);
        Ok(())
    }

    pub fn total_moles(&self) -> f64 {
        self.total_moles
    }

    pub fn set_total_moles(&mut self, moles: f64) {
        self.total_moles = moles;
    }

    pub fn electric_potential(&self) -> f64 {
        self.electric_potential
    }

    pub fn set_electric_potential(&mut self, phi: f64) {
        self.electric_potential = phi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_member_grows_slot_arrays_in_lockstep() {
        let mut phase = Phase::new("aqueous");
        assert_eq!(phase.add_member(4), 0);
        assert_eq!(phase.add_member(7), 1);
        assert_eq!(phase.n_members(), 2);
        assert_eq!(phase.mole_fractions.len(), 2);
        assert_eq!(phase.activity_coeffs, vec![1.0, 1.0]);
        assert_eq!(phase.members, vec![4, 7]);
    }

    #[test]
    fn set_mole_fractions_rejects_wrong_length() {
        let mut phase = Phase::new("gas");
        phase.add_member(0);
        assert!(phase.set_mole_fractions(&[0.5, 0.5]).is_err());
        assert!(phase.set_mole_fractions(&[1.0]).is_ok());
        assert_eq!(phase.mole_fraction(0), 1.0);
    }
}
