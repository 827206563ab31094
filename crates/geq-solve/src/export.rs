//! Write the solved state back into the problem statement.

use geq_core::double_equal;
use tracing::debug;

use crate::error::EquilResult;
use crate::problem::{EquilProblem, SpeciesKind};
use crate::workspace::EquilWorkspace;

impl EquilWorkspace {
    /// Copy results into `prob` in its original external ordering,
    /// undoing whatever permutations the solve applied.
    ///
    /// # Panics
    ///
    /// The per-phase cross-checks compare the per-species arrays against
    /// the per-phase ones after the copy; a disagreement means the solver
    /// state is internally corrupt and the export panics rather than hand
    /// back inconsistent results.
    pub(crate) fn export(&mut self, prob: &mut EquilProblem) -> EquilResult<()> {
        self.recompute_phase_totals();
        self.refresh_mole_fractions();
        self.volume = self.total_volume();

        prob.mole_numbers.resize(self.n_species, 0.0);
        for slot in 0..self.n_species {
            let k = self.species_order[slot];
            match self.species_kinds[slot] {
                SpeciesKind::MoleNumber => {
                    prob.mole_numbers[k] = self.mole_numbers[slot];
                }
                SpeciesKind::InterfacialVoltage => {
                    debug!(
                        species = %self.species_names[slot],
                        potential = self.mole_numbers[slot],
                        "voltage unknown reported through its phase, not as moles"
                    );
                    prob.mole_numbers[k] = 0.0;
                }
            }
            prob.mole_fractions[k] = self.mole_fractions[slot];
            prob.chem_potentials[k] = self.chem_potentials[slot];
            prob.partial_molar_volumes[k] = self.partial_molar_volumes[slot];
        }
        prob.has_estimate = true;

        prob.temperature = self.temperature;
        prob.pressure = self.pressure;
        prob.volume = self.volume;

        if prob.phases.len() != self.n_phases {
            panic!(
                "phase count drifted between import and export: {} vs {}",
                prob.phases.len(),
                self.n_phases
            );
        }
        for iph in 0..self.n_phases {
            {
                let src = &self.phases[iph];
                let dst = &mut prob.phases[iph];
                dst.existence = src.existence;
                dst.single_species = src.single_species;
                dst.inert_moles = self.phase_inert_moles[iph];
                dst.set_total_moles(src.total_moles());
                dst.set_electric_potential(src.electric_potential());
                if dst.n_members() == src.n_members() {
                    dst.mole_fractions.copy_from_slice(&src.mole_fractions);
                    dst.ss_chem_potentials.copy_from_slice(&src.ss_chem_potentials);
                    dst.ref_chem_potentials.copy_from_slice(&src.ref_chem_potentials);
                    dst.partial_molar_volumes.copy_from_slice(&src.partial_molar_volumes);
                    dst.activity_coeffs.copy_from_slice(&src.activity_coeffs);
                } else if !dst.members.is_empty() {
                    // An empty list is default membership and has no slots
                    // to fill; anything else drifting is corruption.
                    panic!(
                        "phase {iph} ({}): member count drifted between import and export: {} vs {}",
                        dst.name,
                        dst.n_members(),
                        src.n_members()
                    );
                }
            }
            let src = &self.phases[iph];
            if let Some(slot) = src.phi_var_index {
                let kslot = src.members[slot];
                if !double_equal(self.mole_numbers[kslot], src.electric_potential()) {
                    panic!(
                        "phase {iph} ({}): voltage unknown {} disagrees with stored potential {}",
                        src.name,
                        self.mole_numbers[kslot],
                        src.electric_potential()
                    );
                }
            }
            let mut sum = self.phase_inert_moles[iph];
            for (slot_ph, &kslot) in src.members.iter().enumerate() {
                let k = self.species_order[kslot];
                if !double_equal(prob.mole_fractions[k], src.mole_fractions[slot_ph]) {
                    panic!(
                        "phase {iph} ({}): stored mole fraction {} disagrees with species array {}",
                        src.name, src.mole_fractions[slot_ph], prob.mole_fractions[k]
                    );
                }
                if self.species_kinds[kslot] == SpeciesKind::MoleNumber {
                    sum += self.mole_numbers[kslot];
                }
            }
            if !double_equal(sum, src.total_moles()) {
                panic!(
                    "phase {iph} ({}): member moles {} disagree with phase total {}",
                    src.name,
                    sum,
                    src.total_moles()
                );
            }
        }

        prob.iterations = self.counters.iterations;
        prob.basis_optimizations = self.counters.basis_optimizations;

        debug!(
            volume = self.volume,
            iterations = prob.iterations,
            "results exported"
        );
        Ok(())
    }
}
