use crate::error::CoreError;

/// Floating point type used throughout the solver.
pub type Real = f64;

/// Relative spread below which two solver quantities count as equal.
///
/// This is the tolerance behind the exporter's cross-checks: mole balances
/// that disagree by more than this relative amount indicate solver
/// corruption, not rounding.
pub const EQUALITY_REL_TOL: Real = 1e-10;

/// Compare two quantities for equality within [`EQUALITY_REL_TOL`].
///
/// Zero against zero compares equal; otherwise the difference is scaled by
/// the larger magnitude of the two operands.
pub fn double_equal(a: Real, b: Real) -> bool {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return true;
    }
    (a - b).abs() <= EQUALITY_REL_TOL * scale
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}
