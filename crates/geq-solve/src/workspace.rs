//! Capacity-sized working representation of an equilibrium problem.

use geq_core::ensure_finite;
use nalgebra::DMatrix;

use crate::counters::{Counters, ResetScope};
use crate::error::{EquilError, EquilResult};
use crate::phase::{ActivityConvention, Existence, Phase};
use crate::problem::{ElementKind, PotentialUnits, SpeciesKind};
use crate::thermo::SpeciesThermo;

/// Major/minor classification used by the minimizer's active-set logic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpeciesStatus {
    #[default]
    Major,
    Minor,
}

/// The numerically indexed workspace consumed by the minimizer.
///
/// Every table is sized to capacity bounds fixed by [`ensure_capacity`]
/// (`EquilWorkspace::ensure_capacity`) and reused across solves; only a
/// change of bounds reallocates. Per-species arrays are indexed by solution
/// slot: the species reordering permutation maps slots to external indices,
/// with components occupying the leading slots once preparation has fixed
/// their count. Element arrays rotate analogously.
#[derive(Debug)]
pub struct EquilWorkspace {
    // Capacity bounds, fixed until the next reallocation.
    cap_species: usize,
    cap_elements: usize,
    cap_phases: usize,

    // Live problem sizes.
    pub n_species: usize,
    /// Species still participating; trailing slots hold zeroed species.
    pub n_species_active: usize,
    pub n_elements: usize,
    /// Component count; starts at the element count, fixed at preparation.
    pub n_components: usize,
    /// Noncomponent (reaction) count = species - components, floored at 0.
    pub n_rxn: usize,
    pub n_rxn_active: usize,
    pub n_rxn_minor_zeroed: usize,
    pub n_phases: usize,
    pub has_estimate: bool,

    /// Stoichiometry, element rows by species columns, tracking the current
    /// permutations.
    pub formula_matrix: DMatrix<f64>,
    pub mol_weights: Vec<f64>,
    pub charges: Vec<f64>,
    pub species_kinds: Vec<SpeciesKind>,
    pub species_names: Vec<String>,
    pub species_status: Vec<SpeciesStatus>,
    /// Workspace-owned thermodynamic handles, one per slot.
    pub thermo: Vec<SpeciesThermo>,
    /// Solution vector: mole numbers, or a potential for voltage slots.
    pub mole_numbers: Vec<f64>,
    pub mole_fractions: Vec<f64>,
    pub chem_potentials: Vec<f64>,
    pub partial_molar_volumes: Vec<f64>,
    pub species_act_convention: Vec<ActivityConvention>,
    /// Reference log-molality offset; zero on the mole-fraction convention.
    pub ln_mnaught: Vec<f64>,
    pub activity_coeffs: Vec<f64>,
    /// True for species living in a single-species phase.
    pub species_in_ss_phase: Vec<bool>,

    pub element_names: Vec<String>,
    pub element_kinds: Vec<ElementKind>,
    pub element_active: Vec<bool>,
    /// Goal abundance per element constraint.
    pub abundance_target: Vec<f64>,
    /// Current abundance of the solution vector.
    pub abundances: Vec<f64>,

    pub phases: Vec<Phase>,
    pub phase_inert_moles: Vec<f64>,
    pub phase_total_moles: Vec<f64>,
    pub phase_act_convention: Vec<ActivityConvention>,

    /// Solution slot -> external species index.
    pub species_order: Vec<usize>,
    /// External species index -> solution slot.
    pub species_order_inv: Vec<usize>,
    /// Element slot -> external element index.
    pub element_order: Vec<usize>,
    pub element_order_inv: Vec<usize>,
    /// Owning phase per solution slot.
    pub phase_of_species: Vec<usize>,
    /// Phase-local slot per solution slot.
    pub slot_in_phase: Vec<usize>,
    /// Solution slots of the noncomponent (reaction) species.
    pub rxn_species: Vec<usize>,

    pub temperature: f64,
    pub pressure: f64,
    pub volume: f64,
    pub tol_major: f64,
    pub tol_minor: f64,
    /// Secondary tolerances, derived as 1% of the primaries.
    pub tol_major2: f64,
    pub tol_minor2: f64,
    pub units: PotentialUnits,
    pub title: String,

    /// Flag a phase on respecify when its name still matches instead of
    /// when it changed. Off by default; kept for drivers that depend on
    /// the older behavior.
    pub legacy_name_check: bool,

    pub counters: Counters,
}

impl Default for EquilWorkspace {
    fn default() -> Self {
        Self {
            cap_species: 0,
            cap_elements: 0,
            cap_phases: 0,
            n_species: 0,
            n_species_active: 0,
            n_elements: 0,
            n_components: 0,
            n_rxn: 0,
            n_rxn_active: 0,
            n_rxn_minor_zeroed: 0,
            n_phases: 0,
            has_estimate: false,
            formula_matrix: DMatrix::zeros(0, 0),
            mol_weights: Vec::new(),
            charges: Vec::new(),
            species_kinds: Vec::new(),
            species_names: Vec::new(),
            species_status: Vec::new(),
            thermo: Vec::new(),
            mole_numbers: Vec::new(),
            mole_fractions: Vec::new(),
            chem_potentials: Vec::new(),
            partial_molar_volumes: Vec::new(),
            species_act_convention: Vec::new(),
            ln_mnaught: Vec::new(),
            activity_coeffs: Vec::new(),
            species_in_ss_phase: Vec::new(),
            element_names: Vec::new(),
            element_kinds: Vec::new(),
            element_active: Vec::new(),
            abundance_target: Vec::new(),
            abundances: Vec::new(),
            phases: Vec::new(),
            phase_inert_moles: Vec::new(),
            phase_total_moles: Vec::new(),
            phase_act_convention: Vec::new(),
            species_order: Vec::new(),
            species_order_inv: Vec::new(),
            element_order: Vec::new(),
            element_order_inv: Vec::new(),
            phase_of_species: Vec::new(),
            slot_in_phase: Vec::new(),
            rxn_species: Vec::new(),
            temperature: 0.0,
            pressure: 0.0,
            volume: 0.0,
            tol_major: 0.0,
            tol_minor: 0.0,
            tol_major2: 0.0,
            tol_minor2: 0.0,
            units: PotentialUnits::default(),
            title: String::new(),
            legacy_name_check: false,
            counters: Counters::default(),
        }
    }
}

impl EquilWorkspace {
    /// Empty workspace; call [`ensure_capacity`](Self::ensure_capacity)
    /// before importing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> (usize, usize, usize) {
        (self.cap_species, self.cap_elements, self.cap_phases)
    }

    /// Size every table to the given upper bounds.
    ///
    /// A no-op when the bounds are unchanged. Any change of bounds drops
    /// all owned thermo handles and phase objects, reallocates every table
    /// with default entries, creates one placeholder phase per slot and a
    /// fresh set of counters.
    pub fn ensure_capacity(
        &mut self,
        max_species: usize,
        max_elements: usize,
        max_phases: usize,
    ) -> EquilResult<()> {
        if max_species == 0 {
            return Err(EquilError::BadBound { what: "species" });
        }
        if max_elements == 0 {
            return Err(EquilError::BadBound { what: "elements" });
        }
        if max_phases == 0 {
            return Err(EquilError::BadBound { what: "phases" });
        }
        if self.cap_species == max_species
            && self.cap_elements == max_elements
            && self.cap_phases == max_phases
        {
            return Ok(());
        }

        self.cap_species = max_species;
        self.cap_elements = max_elements;
        self.cap_phases = max_phases;
        self.n_species = 0;
        self.n_species_active = 0;
        self.n_elements = 0;
        self.n_components = 0;
        self.n_rxn = 0;
        self.n_rxn_active = 0;
        self.n_rxn_minor_zeroed = 0;
        self.n_phases = 0;
        self.has_estimate = false;

        self.formula_matrix = DMatrix::zeros(max_elements, max_species);
        self.mol_weights = vec![0.0; max_species];
        self.charges = vec![0.0; max_species];
        self.species_kinds = vec![SpeciesKind::default(); max_species];
        self.species_names = vec![String::new(); max_species];
        self.species_status = vec![SpeciesStatus::Major; max_species];
        self.thermo = vec![SpeciesThermo::default(); max_species];
        self.mole_numbers = vec![0.0; max_species];
        self.mole_fractions = vec![0.0; max_species];
        self.chem_potentials = vec![0.0; max_species];
        self.partial_molar_volumes = vec![0.0; max_species];
        self.species_act_convention = vec![ActivityConvention::default(); max_species];
        self.ln_mnaught = vec![0.0; max_species];
        self.activity_coeffs = vec![1.0; max_species];
        self.species_in_ss_phase = vec![false; max_species];

        self.element_names = vec![String::new(); max_elements];
        self.element_kinds = vec![ElementKind::default(); max_elements];
        self.element_active = vec![true; max_elements];
        self.abundance_target = vec![0.0; max_elements];
        self.abundances = vec![0.0; max_elements];

        self.phases = (0..max_phases)
            .map(|iph| Phase::new(format!("phase{iph}")))
            .collect();
        self.phase_inert_moles = vec![0.0; max_phases];
        self.phase_total_moles = vec![0.0; max_phases];
        self.phase_act_convention = vec![ActivityConvention::default(); max_phases];

        self.species_order = (0..max_species).collect();
        self.species_order_inv = (0..max_species).collect();
        self.element_order = (0..max_elements).collect();
        self.element_order_inv = (0..max_elements).collect();
        self.phase_of_species = vec![0; max_species];
        self.slot_in_phase = vec![0; max_species];
        self.rxn_species = Vec::with_capacity(max_species);

        self.counters = Counters::default();
        Ok(())
    }

    /// Release every owned structure and forget the capacity bounds.
    pub fn teardown(&mut self) {
        *self = Self {
            legacy_name_check: self.legacy_name_check,
            ..Self::default()
        };
    }

    /// One-time preparation after a full import: fix phase identities,
    /// classify single-species phases and settle the final component count.
    pub fn prep_once(&mut self) {
        for (iph, phase) in self.phases.iter_mut().enumerate() {
            phase.id = Some(iph);
        }
        self.refresh_phase_flags();
        let active = self.element_active[..self.n_elements]
            .iter()
            .filter(|&&a| a)
            .count();
        self.n_components = active.min(self.n_species);
        self.n_rxn = self.n_species - self.n_components;
        self.n_rxn_active = self.n_rxn;
        self.rxn_species.clear();
        self.rxn_species.extend(self.n_components..self.n_species);
    }

    /// Per-call preparation: reset the call counters and refresh every
    /// quantity derived from the solution vector.
    pub fn prep(&mut self) {
        self.counters.reset(ResetScope::Call);
        self.recompute_phase_totals();
        self.refresh_mole_fractions();
        self.recompute_abundances();
    }

    /// Check that the prepared problem has enough independent constraints
    /// and no degenerate phase.
    pub fn well_posed(&self) -> EquilResult<()> {
        let active = self.element_active[..self.n_elements]
            .iter()
            .filter(|&&a| a)
            .count();
        if active == 0 {
            return Err(EquilError::IllPosed {
                what: "no active element constraints",
            });
        }
        if self.n_components == 0 || self.n_components > self.n_species {
            return Err(EquilError::IllPosed {
                what: "component count out of range",
            });
        }
        let mut counts = vec![0usize; self.n_phases];
        for k in 0..self.n_species {
            counts[self.phase_of_species[k]] += 1;
        }
        for iph in 0..self.n_phases {
            if counts[iph] == 0 && self.phase_inert_moles[iph] <= 0.0 {
                return Err(EquilError::IllPosed {
                    what: "phase has no species and no inert content",
                });
            }
        }
        for j in 0..self.n_elements {
            ensure_finite(self.abundance_target[j], "abundance target")?;
        }
        Ok(())
    }

    /// Recompute per-phase totals: inert moles plus every mole-number
    /// species assigned to the phase. Voltage slots carry no mass.
    pub fn recompute_phase_totals(&mut self) {
        for iph in 0..self.n_phases {
            self.phase_total_moles[iph] = self.phase_inert_moles[iph];
        }
        for k in 0..self.n_species {
            if self.species_kinds[k] == SpeciesKind::MoleNumber {
                self.phase_total_moles[self.phase_of_species[k]] += self.mole_numbers[k];
            }
        }
        for iph in 0..self.n_phases {
            let total = self.phase_total_moles[iph];
            self.phases[iph].set_total_moles(total);
            if self.phases[iph].existence != Existence::AlwaysPresent {
                self.phases[iph].existence = if total > 0.0 {
                    Existence::Present
                } else {
                    Existence::Absent
                };
            }
        }
    }

    /// Reclassify single-species phases, e.g. after inert content changed.
    pub fn refresh_phase_flags(&mut self) {
        let mut counts = vec![0usize; self.n_phases];
        for k in 0..self.n_species {
            if self.species_kinds[k] == SpeciesKind::MoleNumber {
                counts[self.phase_of_species[k]] += 1;
            }
        }
        for iph in 0..self.n_phases {
            self.phases[iph].single_species =
                counts[iph] == 1 && self.phase_inert_moles[iph] == 0.0;
        }
        for k in 0..self.n_species {
            self.species_in_ss_phase[k] = self.phases[self.phase_of_species[k]].single_species;
        }
    }

    /// Total system volume from the solution vector and the partial molar
    /// volumes; voltage slots are skipped.
    pub fn total_volume(&self) -> f64 {
        let mut vol = 0.0;
        for k in 0..self.n_species {
            if self.species_kinds[k] == SpeciesKind::MoleNumber {
                vol += self.mole_numbers[k] * self.partial_molar_volumes[k];
            }
        }
        vol
    }

    pub(crate) fn refresh_mole_fractions(&mut self) {
        for k in 0..self.n_species {
            let iph = self.phase_of_species[k];
            let total = self.phase_total_moles[iph];
            let x = if self.species_kinds[k] == SpeciesKind::InterfacialVoltage || total <= 0.0 {
                0.0
            } else {
                self.mole_numbers[k] / total
            };
            self.mole_fractions[k] = x;
            let slot = self.slot_in_phase[k];
            self.phases[iph].mole_fractions[slot] = x;
            // A voltage slot is the phase's potential unknown.
            if self.species_kinds[k] == SpeciesKind::InterfacialVoltage {
                self.phases[iph].set_electric_potential(self.mole_numbers[k]);
            }
        }
    }

    fn recompute_abundances(&mut self) {
        for j in 0..self.n_elements {
            let mut acc = 0.0;
            for k in 0..self.n_species {
                if self.species_kinds[k] == SpeciesKind::MoleNumber {
                    acc += self.formula_matrix[(j, k)] * self.mole_numbers[k];
                }
            }
            self.abundances[j] = acc;
        }
    }
}
