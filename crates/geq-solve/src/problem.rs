//! External problem statement exchanged with the workspace.

use nalgebra::DMatrix;

use crate::error::{EquilError, EquilResult};
use crate::phase::Phase;
use crate::thermo::SpeciesThermo;

/// What is held fixed during minimization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProblemKind {
    /// Fixed temperature and pressure.
    #[default]
    FixedTP,
    /// Fixed temperature and volume; solved by an outer loop around
    /// fixed-T,P passes.
    FixedTV,
}

/// What a species slot's unknown represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeciesKind {
    /// Ordinary mole-number unknown.
    #[default]
    MoleNumber,
    /// Interfacial-voltage pseudo-species: occupies a slot but contributes
    /// no mass or mole fraction.
    InterfacialVoltage,
}

/// Kind of conserved quantity behind an element constraint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementKind {
    /// Elemental abundance, absolute and nonnegative.
    #[default]
    AbsPositive,
    /// Charge-neutrality constraint; also recognized by the `cn_` name
    /// prefix.
    ChargeNeutrality,
    /// Any other linear constraint.
    Other,
}

/// Units carried by the chemical potentials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PotentialUnits {
    /// Nondimensionalized by RT.
    #[default]
    Unitless,
    /// Dimensional Gibbs energies.
    Dimensional,
}

/// The equilibrium problem statement, in external species ordering.
///
/// The workspace deep-copies everything at import; after the solve the
/// result fields (mole numbers, fractions, potentials, phase state,
/// counters) are written back here in the same external ordering.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquilProblem {
    pub n_species: usize,
    pub n_elements: usize,
    pub n_phases: usize,
    pub kind: ProblemKind,
    pub title: String,

    /// Stoichiometric coefficients, element rows by species columns.
    pub formula_matrix: DMatrix<f64>,
    pub species_names: Vec<String>,
    pub mol_weights: Vec<f64>,
    pub charges: Vec<f64>,
    pub species_kinds: Vec<SpeciesKind>,
    pub thermo: Vec<SpeciesThermo>,

    /// Initial estimate, later the resulting mole numbers. May be left
    /// empty when no estimate exists.
    pub mole_numbers: Vec<f64>,
    pub has_estimate: bool,
    pub mole_fractions: Vec<f64>,
    pub chem_potentials: Vec<f64>,
    pub partial_molar_volumes: Vec<f64>,

    /// Target abundance per element; empty requests derivation from the
    /// initial estimate at import.
    pub abundance_target: Vec<f64>,
    pub element_names: Vec<String>,
    pub element_kinds: Vec<ElementKind>,
    pub element_active: Vec<bool>,

    pub phases: Vec<Phase>,
    /// Owning phase per species; may be left empty only for single-phase
    /// problems. When supplied, each phase's `members` list must agree
    /// with this map in both content and order: a phase lists its species
    /// in ascending global index, the order this map assigns them. Import
    /// rejects any disagreement, not just count mismatches, so the two
    /// views of the topology can never drift apart.
    pub phase_of_species: Vec<usize>,

    /// Nonpositive values take the import-time defaults (293.15 K, 1.0).
    pub temperature: f64,
    pub pressure: f64,
    pub volume: f64,
    pub tol_major: f64,
    pub tol_minor: f64,
    pub units: PotentialUnits,

    /// Result counters, written by export.
    pub iterations: usize,
    pub basis_optimizations: usize,
}

impl EquilProblem {
    /// Empty problem with default entries sized to the given counts.
    ///
    /// Phase identities are assigned up front so that a later incremental
    /// re-specification can verify them.
    pub fn new(n_species: usize, n_elements: usize, n_phases: usize) -> Self {
        let phases = (0..n_phases)
            .map(|iph| {
                let mut phase = Phase::new(format!("phase{iph}"));
                phase.id = Some(iph);
                phase
            })
            .collect();
        Self {
            n_species,
            n_elements,
            n_phases,
            kind: ProblemKind::default(),
            title: String::new(),
            formula_matrix: DMatrix::zeros(n_elements, n_species),
            species_names: vec![String::new(); n_species],
            mol_weights: vec![0.0; n_species],
            charges: vec![0.0; n_species],
            species_kinds: vec![SpeciesKind::default(); n_species],
            thermo: vec![SpeciesThermo::default(); n_species],
            mole_numbers: Vec::new(),
            has_estimate: false,
            mole_fractions: vec![0.0; n_species],
            chem_potentials: vec![0.0; n_species],
            partial_molar_volumes: vec![0.0; n_species],
            abundance_target: Vec::new(),
            element_names: vec![String::new(); n_elements],
            element_kinds: vec![ElementKind::default(); n_elements],
            element_active: vec![true; n_elements],
            phases,
            phase_of_species: Vec::new(),
            temperature: 0.0,
            pressure: 0.0,
            volume: 0.0,
            tol_major: 1e-8,
            tol_minor: 1e-6,
            units: PotentialUnits::default(),
            iterations: 0,
            basis_optimizations: 0,
        }
    }

    /// Install an initial mole-number estimate.
    pub fn set_estimate(&mut self, w: &[f64]) {
        self.mole_numbers = w.to_vec();
        self.has_estimate = true;
    }

    /// Check that every per-species / per-element array matches the
    /// declared counts and that phase memberships are in range.
    pub fn validate(&self) -> EquilResult<()> {
        if self.formula_matrix.nrows() != self.n_elements
            || self.formula_matrix.ncols() != self.n_species
        {
            return Err(EquilError::ProblemSetup {
                what: format!(
                    "formula matrix is {}x{}, expected {}x{}",
                    self.formula_matrix.nrows(),
                    self.formula_matrix.ncols(),
                    self.n_elements,
                    self.n_species
                ),
            });
        }
        let per_species = [
            ("species_names", self.species_names.len()),
            ("mol_weights", self.mol_weights.len()),
            ("charges", self.charges.len()),
            ("species_kinds", self.species_kinds.len()),
            ("thermo", self.thermo.len()),
            ("mole_fractions", self.mole_fractions.len()),
            ("chem_potentials", self.chem_potentials.len()),
            ("partial_molar_volumes", self.partial_molar_volumes.len()),
        ];
        for (what, len) in per_species {
            if len != self.n_species {
                return Err(EquilError::ProblemSetup {
                    what: format!("{what} has length {len}, expected {}", self.n_species),
                });
            }
        }
        if !self.mole_numbers.is_empty() && self.mole_numbers.len() != self.n_species {
            return Err(EquilError::ProblemSetup {
                what: format!(
                    "mole_numbers has length {}, expected {} or empty",
                    self.mole_numbers.len(),
                    self.n_species
                ),
            });
        }
        if !self.abundance_target.is_empty() && self.abundance_target.len() != self.n_elements {
            return Err(EquilError::ProblemSetup {
                what: format!(
                    "abundance_target has length {}, expected {} or empty",
                    self.abundance_target.len(),
                    self.n_elements
                ),
            });
        }
        let per_element = [
            ("element_names", self.element_names.len()),
            ("element_kinds", self.element_kinds.len()),
            ("element_active", self.element_active.len()),
        ];
        for (what, len) in per_element {
            if len != self.n_elements {
                return Err(EquilError::ProblemSetup {
                    what: format!("{what} has length {len}, expected {}", self.n_elements),
                });
            }
        }
        if self.phases.len() != self.n_phases {
            return Err(EquilError::ProblemSetup {
                what: format!(
                    "phases has length {}, expected {}",
                    self.phases.len(),
                    self.n_phases
                ),
            });
        }
        if !self.phase_of_species.is_empty() && self.phase_of_species.len() != self.n_species {
            return Err(EquilError::ProblemSetup {
                what: format!(
                    "phase_of_species has length {}, expected {} or empty",
                    self.phase_of_species.len(),
                    self.n_species
                ),
            });
        }
        for (iph, phase) in self.phases.iter().enumerate() {
            for &k in &phase.members {
                if k >= self.n_species {
                    return Err(EquilError::ProblemSetup {
                        what: format!(
                            "phase {iph} ({}) lists species {k}, only {} exist",
                            phase.name, self.n_species
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_problem_validates() {
        let prob = EquilProblem::new(3, 2, 1);
        assert!(prob.validate().is_ok());
        assert_eq!(prob.phases[0].id, Some(0));
        assert!(!prob.has_estimate);
    }

    #[test]
    fn validate_catches_truncated_arrays() {
        let mut prob = EquilProblem::new(3, 2, 1);
        prob.charges.pop();
        let err = prob.validate().unwrap_err();
        assert!(format!("{err}").contains("charges"));
    }

    #[test]
    fn validate_catches_out_of_range_member() {
        let mut prob = EquilProblem::new(2, 1, 1);
        prob.phases[0].add_member(5);
        assert!(prob.validate().is_err());
    }

    #[test]
    fn set_estimate_flags_presence() {
        let mut prob = EquilProblem::new(2, 1, 1);
        prob.set_estimate(&[0.5, 0.5]);
        assert!(prob.has_estimate);
        assert_eq!(prob.mole_numbers.len(), 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn problem_round_trips_through_json() {
        let mut prob = EquilProblem::new(2, 1, 1);
        prob.title = "serialized".into();
        prob.set_estimate(&[0.5, 0.5]);
        let text = serde_json::to_string(&prob).unwrap();
        let back: EquilProblem = serde_json::from_str(&text).unwrap();
        assert_eq!(back.title, "serialized");
        assert_eq!(back.mole_numbers, prob.mole_numbers);
        assert_eq!(back.formula_matrix, prob.formula_matrix);
        assert!(back.validate().is_ok());
    }
}
