//! Full transfer of a problem statement into the workspace.

use tracing::debug;

use crate::error::{EquilError, EquilResult};
use crate::phase::ActivityConvention;
use crate::problem::{ElementKind, EquilProblem, SpeciesKind};
use crate::workspace::{EquilWorkspace, SpeciesStatus};

const DEFAULT_TEMPERATURE_K: f64 = 293.15;
const DEFAULT_PRESSURE: f64 = 1.0;
const DEFAULT_TITLE: &str = "Unspecified Problem Title";

impl EquilWorkspace {
    /// Import every field of a problem statement, replacing whatever the
    /// workspace held before.
    ///
    /// Fails fast if a declared count exceeds the allocated capacity, so
    /// no table is ever written past its bound. Permutations are reset to
    /// the identity; the solution starts in external ordering.
    ///
    /// # Panics
    ///
    /// Panics when the statement is internally contradictory in a way
    /// [`EquilProblem::validate`] cannot see, e.g. an element declared as
    /// a charge-neutrality constraint without the `cn_` name prefix.
    pub(crate) fn import(&mut self, prob: &EquilProblem) -> EquilResult<()> {
        prob.validate()?;
        let (cap_species, cap_elements, cap_phases) = self.capacity();
        if prob.n_species > cap_species {
            return Err(EquilError::CapacityExceeded {
                what: "species",
                needed: prob.n_species,
                capacity: cap_species,
            });
        }
        if prob.n_elements > cap_elements {
            return Err(EquilError::CapacityExceeded {
                what: "elements",
                needed: prob.n_elements,
                capacity: cap_elements,
            });
        }
        if prob.n_phases > cap_phases {
            return Err(EquilError::CapacityExceeded {
                what: "phases",
                needed: prob.n_phases,
                capacity: cap_phases,
            });
        }

        self.n_species = prob.n_species;
        self.n_species_active = prob.n_species;
        self.n_elements = prob.n_elements;
        self.n_phases = prob.n_phases;
        // Provisional until prep_once counts the active constraints.
        self.n_components = prob.n_elements.min(prob.n_species);
        self.n_rxn = prob.n_species - self.n_components;
        self.n_rxn_active = self.n_rxn;
        self.n_rxn_minor_zeroed = 0;

        for j in 0..prob.n_elements {
            for k in 0..prob.n_species {
                self.formula_matrix[(j, k)] = prob.formula_matrix[(j, k)];
            }
        }
        for k in 0..prob.n_species {
            self.mol_weights[k] = prob.mol_weights[k];
            self.charges[k] = prob.charges[k];
            self.species_kinds[k] = prob.species_kinds[k];
            self.species_names[k] = prob.species_names[k].clone();
            self.species_status[k] = SpeciesStatus::Major;
            self.thermo[k] = prob.thermo[k].duplicate();
            self.chem_potentials[k] = prob.chem_potentials[k];
            self.partial_molar_volumes[k] = prob.partial_molar_volumes[k];
            self.mole_fractions[k] = prob.mole_fractions[k];
            self.activity_coeffs[k] = 1.0;
            self.ln_mnaught[k] = 0.0;
        }

        self.has_estimate = prob.has_estimate && !prob.mole_numbers.is_empty();
        for k in 0..prob.n_species {
            self.mole_numbers[k] = if self.has_estimate {
                prob.mole_numbers[k]
            } else {
                0.0
            };
        }

        if prob.abundance_target.is_empty() {
            if !self.has_estimate {
                return Err(EquilError::ProblemSetup {
                    what: "no abundance target and no mole-number estimate to derive one from"
                        .to_string(),
                });
            }
            for j in 0..prob.n_elements {
                let mut acc = 0.0;
                for k in 0..prob.n_species {
                    if prob.species_kinds[k] == SpeciesKind::MoleNumber {
                        acc += prob.formula_matrix[(j, k)] * prob.mole_numbers[k];
                    }
                }
                self.abundance_target[j] = acc;
            }
        } else {
            self.abundance_target[..prob.n_elements]
                .copy_from_slice(&prob.abundance_target[..prob.n_elements]);
        }

        for j in 0..prob.n_elements {
            let name = &prob.element_names[j];
            let mut kind = prob.element_kinds[j];
            if name.starts_with("cn_") {
                kind = ElementKind::ChargeNeutrality;
            } else if kind == ElementKind::ChargeNeutrality {
                panic!(
                    "element {j} ({name}) declared charge-neutral without the cn_ name prefix"
                );
            }
            self.element_names[j] = name.clone();
            self.element_kinds[j] = kind;
            self.element_active[j] = prob.element_active[j];
        }

        self.temperature = if prob.temperature > 0.0 {
            prob.temperature
        } else {
            DEFAULT_TEMPERATURE_K
        };
        self.pressure = if prob.pressure > 0.0 {
            prob.pressure
        } else {
            DEFAULT_PRESSURE
        };
        self.volume = prob.volume;
        self.tol_major = prob.tol_major;
        self.tol_minor = prob.tol_minor;
        self.tol_major2 = 0.01 * prob.tol_major;
        self.tol_minor2 = 0.01 * prob.tol_minor;
        self.units = prob.units;
        self.title = if prob.title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            prob.title.clone()
        };

        for k in 0..cap_species {
            self.species_order[k] = k;
            self.species_order_inv[k] = k;
        }
        for j in 0..cap_elements {
            self.element_order[j] = j;
            self.element_order_inv[j] = j;
        }

        self.assign_phase_map(prob)?;

        for iph in 0..prob.n_phases {
            let mut phase = prob.phases[iph].clone();
            if prob.n_phases == 1 && phase.members.is_empty() {
                for k in 0..prob.n_species {
                    phase.add_member(k);
                }
            }
            self.phase_inert_moles[iph] = phase.inert_moles;
            self.phase_act_convention[iph] = phase.activity_convention;
            self.phases[iph] = phase;
        }

        for iph in 0..prob.n_phases {
            let convention = self.phase_act_convention[iph];
            for slot in 0..self.phases[iph].n_members() {
                let k = self.phases[iph].members[slot];
                self.slot_in_phase[k] = slot;
                self.species_act_convention[k] = convention;
                if self.species_kinds[k] == SpeciesKind::InterfacialVoltage {
                    self.phases[iph].phi_var_index = Some(slot);
                }
            }
            if convention == ActivityConvention::Molality && self.phases[iph].n_members() > 0 {
                let solvent = self.phases[iph].members[0];
                let offset = (self.mol_weights[solvent] / 1000.0).ln();
                for slot in 1..self.phases[iph].n_members() {
                    let k = self.phases[iph].members[slot];
                    self.ln_mnaught[k] = offset;
                }
            }
        }

        debug!(
            species = self.n_species,
            elements = self.n_elements,
            phases = self.n_phases,
            title = %self.title,
            "problem statement imported"
        );
        Ok(())
    }

    /// Fill the species-to-phase map, either from the statement's explicit
    /// assignment or by defaulting every species into a lone phase.
    fn assign_phase_map(&mut self, prob: &EquilProblem) -> EquilResult<()> {
        if prob.phase_of_species.is_empty() {
            if prob.n_phases != 1 {
                return Err(EquilError::ProblemSetup {
                    what: format!(
                        "phase_of_species is empty but the problem has {} phases",
                        prob.n_phases
                    ),
                });
            }
            if !prob.phases[0].members.is_empty()
                && prob.phases[0].members.len() != prob.n_species
            {
                return Err(EquilError::ProblemSetup {
                    what: format!(
                        "single phase lists {} members, expected {} or none",
                        prob.phases[0].members.len(),
                        prob.n_species
                    ),
                });
            }
            for k in 0..prob.n_species {
                self.phase_of_species[k] = 0;
            }
            return Ok(());
        }

        let mut counts = vec![0usize; prob.n_phases];
        for k in 0..prob.n_species {
            let iph = prob.phase_of_species[k];
            if iph >= prob.n_phases {
                return Err(EquilError::ProblemSetup {
                    what: format!(
                        "species {k} assigned to phase {iph}, only {} exist",
                        prob.n_phases
                    ),
                });
            }
            self.phase_of_species[k] = iph;
            let slot = counts[iph];
            if slot >= prob.phases[iph].members.len() || prob.phases[iph].members[slot] != k {
                return Err(EquilError::ProblemSetup {
                    what: format!(
                        "phase {iph} member list disagrees with phase_of_species at species {k}"
                    ),
                });
            }
            counts[iph] += 1;
        }
        for iph in 0..prob.n_phases {
            if counts[iph] != prob.phases[iph].members.len() {
                return Err(EquilError::ProblemSetup {
                    what: format!(
                        "phase {iph} lists {} members but phase_of_species assigns {}",
                        prob.phases[iph].members.len(),
                        counts[iph]
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn two_species_problem() -> EquilProblem {
        let mut prob = EquilProblem::new(2, 1, 1);
        prob.formula_matrix = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        prob.species_names = vec!["A".into(), "A2".into()];
        prob.mol_weights = vec![10.0, 20.0];
        prob.set_estimate(&[1.0, 0.5]);
        prob
    }

    #[test]
    fn import_fails_fast_on_capacity() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(1, 1, 1).unwrap();
        let prob = two_species_problem();
        match ws.import(&prob) {
            Err(EquilError::CapacityExceeded {
                what: "species",
                needed: 2,
                capacity: 1,
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn import_derives_abundance_target_from_estimate() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        let prob = two_species_problem();
        ws.import(&prob).unwrap();
        assert_eq!(ws.abundance_target[0], 2.0);
        assert!(ws.has_estimate);
    }

    #[test]
    fn import_without_target_or_estimate_is_rejected() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        let mut prob = two_species_problem();
        prob.mole_numbers.clear();
        prob.has_estimate = false;
        assert!(matches!(
            ws.import(&prob),
            Err(EquilError::ProblemSetup { .. })
        ));
    }

    #[test]
    fn import_applies_scalar_defaults() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        let prob = two_species_problem();
        ws.import(&prob).unwrap();
        assert_eq!(ws.temperature, 293.15);
        assert_eq!(ws.pressure, 1.0);
        assert_eq!(ws.title, "Unspecified Problem Title");
        assert_eq!(ws.tol_major2, 0.01 * prob.tol_major);
    }

    #[test]
    fn single_phase_membership_is_auto_assigned() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        let prob = two_species_problem();
        ws.import(&prob).unwrap();
        assert_eq!(ws.phase_of_species[..2], [0, 0]);
        assert_eq!(ws.phases[0].members, vec![0, 1]);
        assert_eq!(ws.slot_in_phase[..2], [0, 1]);
    }

    #[test]
    fn cn_prefix_overrides_declared_element_kind() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        let mut prob = two_species_problem();
        prob.element_names[0] = "cn_bulk".into();
        ws.import(&prob).unwrap();
        assert_eq!(ws.element_kinds[0], ElementKind::ChargeNeutrality);
    }

    #[test]
    #[should_panic(expected = "cn_ name prefix")]
    fn charge_neutral_without_prefix_panics() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        let mut prob = two_species_problem();
        prob.element_kinds[0] = ElementKind::ChargeNeutrality;
        let _ = ws.import(&prob);
    }

    #[test]
    fn inconsistent_phase_map_is_rejected() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        let mut prob = EquilProblem::new(2, 1, 2);
        prob.formula_matrix = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        prob.set_estimate(&[1.0, 1.0]);
        prob.phase_of_species = vec![0, 1];
        prob.phases[0].add_member(0);
        // Phase 1 claims species 0 instead of species 1.
        prob.phases[1].add_member(0);
        assert!(matches!(
            ws.import(&prob),
            Err(EquilError::ProblemSetup { .. })
        ));
    }

    #[test]
    fn molality_offset_skips_the_solvent() {
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        let mut prob = two_species_problem();
        prob.phases[0].activity_convention = ActivityConvention::Molality;
        prob.phases[0].add_member(0);
        prob.phases[0].add_member(1);
        prob.phase_of_species = vec![0, 0];
        ws.import(&prob).unwrap();
        assert_eq!(ws.ln_mnaught[0], 0.0);
        let expected = (prob.mol_weights[0] / 1000.0).ln();
        assert!((ws.ln_mnaught[1] - expected).abs() < 1e-14);
    }
}
