//! Incremental re-specification of an already-imported problem.

use tracing::warn;

use crate::error::{EquilError, EquilResult};
use crate::phase::Existence;
use crate::problem::EquilProblem;
use crate::workspace::EquilWorkspace;

impl EquilWorkspace {
    /// Refresh scalar conditions, estimates and per-phase settings from a
    /// statement with the same topology as the one originally imported.
    ///
    /// Transfers honor the current species and element permutations, so a
    /// workspace whose basis has been rotated still receives each value in
    /// the right slot.
    ///
    /// Topology disagreements (changed counts, phase identity or shape
    /// drift) are collected rather than aborting on the first: every
    /// consistent update is still applied, each finding is logged, and a
    /// single [`EquilError::TopologyMismatch`] reports the total.
    pub(crate) fn respecify(&mut self, prob: &EquilProblem) -> EquilResult<()> {
        prob.validate()?;
        let mut mismatches = 0usize;

        if prob.n_species != self.n_species {
            warn!(
                stated = prob.n_species,
                held = self.n_species,
                "species count changed since import"
            );
            mismatches += 1;
        } else {
            for slot in 0..self.n_species {
                let k = self.species_order[slot];
                self.chem_potentials[slot] = prob.chem_potentials[k];
                self.mole_fractions[slot] = prob.mole_fractions[k];
                self.partial_molar_volumes[slot] = prob.partial_molar_volumes[k];
                if !prob.mole_numbers.is_empty() {
                    self.mole_numbers[slot] = prob.mole_numbers[k];
                }
            }
        }
        // The flag tracks the statement even when the array is left
        // alone; only the transfer itself needs a nonempty source.
        self.has_estimate = prob.has_estimate;

        if prob.n_elements != self.n_elements {
            warn!(
                stated = prob.n_elements,
                held = self.n_elements,
                "element count changed since import"
            );
            mismatches += 1;
        } else if !prob.abundance_target.is_empty() {
            for j in 0..self.n_elements {
                self.abundance_target[j] = prob.abundance_target[self.element_order[j]];
            }
        }

        self.temperature = if prob.temperature > 0.0 {
            prob.temperature
        } else {
            self.temperature
        };
        self.pressure = if prob.pressure > 0.0 {
            prob.pressure
        } else {
            self.pressure
        };
        self.volume = prob.volume;
        self.tol_major = prob.tol_major;
        self.tol_minor = prob.tol_minor;
        self.tol_major2 = 0.01 * prob.tol_major;
        self.tol_minor2 = 0.01 * prob.tol_minor;
        self.units = prob.units;
        if !prob.title.is_empty() {
            self.title = prob.title.clone();
        }

        if prob.phases.len() != self.n_phases {
            warn!(
                stated = prob.phases.len(),
                held = self.n_phases,
                "phase count changed since import"
            );
            mismatches += 1;
        }
        let legacy = self.legacy_name_check;
        let mut inert_changed = false;
        let n_shared = self.n_phases.min(prob.phases.len());
        for iph in 0..n_shared {
            let src = &prob.phases[iph];
            {
                let dst = &self.phases[iph];
                if src.id != dst.id {
                    warn!(phase = iph, "phase identity changed since import");
                    mismatches += 1;
                }
                if src.single_species != dst.single_species {
                    warn!(phase = iph, name = %dst.name, "single-species flag drifted");
                    mismatches += 1;
                }
                if src.gas_phase != dst.gas_phase {
                    warn!(phase = iph, name = %dst.name, "gas-phase flag drifted");
                    mismatches += 1;
                }
                // An empty member list means default membership, same as
                // at import; only an explicit list is compared.
                if !src.members.is_empty() && src.n_members() != dst.n_members() {
                    warn!(
                        phase = iph,
                        stated = src.n_members(),
                        held = dst.n_members(),
                        "phase member count changed since import"
                    );
                    mismatches += 1;
                }
                let name_flagged = if legacy {
                    src.name == dst.name
                } else {
                    src.name != dst.name
                };
                if name_flagged {
                    warn!(phase = iph, stated = %src.name, held = %dst.name, "phase name check failed");
                    mismatches += 1;
                }
            }
            let dst = &mut self.phases[iph];
            dst.eos_tag = src.eos_tag;
            dst.set_electric_potential(src.electric_potential());
            if src.inert_moles != dst.inert_moles {
                inert_changed = true;
            }
            dst.inert_moles = src.inert_moles;
            if src.inert_moles > 0.0 {
                dst.existence = Existence::AlwaysPresent;
                dst.single_species = false;
            }
            self.phase_inert_moles[iph] = src.inert_moles;
        }

        if inert_changed {
            self.refresh_phase_flags();
        }
        self.recompute_phase_totals();

        if mismatches > 0 {
            warn!(count = mismatches, "re-specification found topology drift");
            return Err(EquilError::TopologyMismatch { count: mismatches });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::SpeciesKind;
    use nalgebra::DMatrix;

    fn imported_workspace() -> (EquilWorkspace, EquilProblem) {
        let mut prob = EquilProblem::new(2, 1, 1);
        prob.formula_matrix = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        prob.species_names = vec!["A".into(), "B".into()];
        prob.set_estimate(&[1.0, 2.0]);
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        ws.import(&prob).unwrap();
        ws.prep_once();
        (ws, prob)
    }

    #[test]
    fn respecify_transfers_scalars_and_estimate() {
        let (mut ws, mut prob) = imported_workspace();
        prob.temperature = 450.0;
        prob.pressure = 2.5;
        prob.mole_numbers = vec![3.0, 4.0];
        ws.respecify(&prob).unwrap();
        assert_eq!(ws.temperature, 450.0);
        assert_eq!(ws.pressure, 2.5);
        assert_eq!(ws.mole_numbers[..2], [3.0, 4.0]);
        assert_eq!(ws.phase_total_moles[0], 7.0);
    }

    #[test]
    fn estimate_presence_flag_follows_the_statement() {
        let (mut ws, mut prob) = imported_workspace();
        assert!(ws.has_estimate);
        prob.has_estimate = false;
        ws.respecify(&prob).unwrap();
        assert!(!ws.has_estimate);
        prob.has_estimate = true;
        ws.respecify(&prob).unwrap();
        assert!(ws.has_estimate);
    }

    #[test]
    fn respecify_honors_species_permutation() {
        let (mut ws, mut prob) = imported_workspace();
        ws.species_order[0] = 1;
        ws.species_order[1] = 0;
        ws.species_order_inv[0] = 1;
        ws.species_order_inv[1] = 0;
        prob.mole_numbers = vec![3.0, 4.0];
        ws.respecify(&prob).unwrap();
        assert_eq!(ws.mole_numbers[..2], [4.0, 3.0]);
    }

    #[test]
    fn changed_species_count_is_reported_after_applying_the_rest() {
        let (mut ws, _) = imported_workspace();
        let mut other = EquilProblem::new(3, 1, 1);
        other.formula_matrix = DMatrix::from_row_slice(1, 3, &[1.0, 1.0, 1.0]);
        other.set_estimate(&[1.0, 1.0, 1.0]);
        other.temperature = 500.0;
        match ws.respecify(&other) {
            Err(EquilError::TopologyMismatch { count }) => assert!(count >= 1),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(ws.temperature, 500.0);
        assert_eq!(ws.mole_numbers[..2], [1.0, 2.0]);
    }

    #[test]
    fn new_inert_content_pins_the_phase() {
        let (mut ws, mut prob) = imported_workspace();
        prob.phases[0].inert_moles = 0.25;
        ws.respecify(&prob).unwrap();
        assert_eq!(ws.phases[0].existence, Existence::AlwaysPresent);
        assert!(!ws.phases[0].single_species);
        assert_eq!(ws.phase_inert_moles[0], 0.25);
        assert_eq!(ws.phase_total_moles[0], 3.25);
    }

    #[test]
    fn renamed_phase_is_flagged_by_default() {
        let (mut ws, mut prob) = imported_workspace();
        prob.phases[0].name = "renamed".into();
        assert!(matches!(
            ws.respecify(&prob),
            Err(EquilError::TopologyMismatch { count: 1 })
        ));
    }

    #[test]
    fn legacy_name_check_flags_the_unchanged_name() {
        let (mut ws, prob) = imported_workspace();
        ws.legacy_name_check = true;
        assert!(matches!(
            ws.respecify(&prob),
            Err(EquilError::TopologyMismatch { count: 1 })
        ));
    }

    #[test]
    fn voltage_slots_stay_out_of_phase_totals_after_respecify() {
        let mut prob = EquilProblem::new(2, 1, 1);
        prob.formula_matrix = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        prob.species_kinds[1] = SpeciesKind::InterfacialVoltage;
        prob.set_estimate(&[1.0, 0.3]);
        let mut ws = EquilWorkspace::new();
        ws.ensure_capacity(4, 2, 2).unwrap();
        ws.import(&prob).unwrap();
        ws.prep_once();
        prob.mole_numbers = vec![2.0, 0.4];
        ws.respecify(&prob).unwrap();
        assert_eq!(ws.phase_total_moles[0], 2.0);
    }
}
