//! Scalar types, tolerances and gate matrices.
//!
//! This module provides:
//! - The `Real` amplitude scalar and the `C64` complex alias
//! - Standard single-qubit gate matrices (Pauli, Hadamard, phase family)
//! - Unitarity and compact-pair validation used by gate dispatch

use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

/// Real scalar used for amplitude components.
///
/// The exchange layer derives its per-message element cap from
/// `size_of::<Real>()`, so switching the width here also adjusts the
/// transport chunking.
pub type Real = f64;

/// Complex number type alias for readability.
pub type C64 = Complex64;

/// Tolerance for unitarity, normalization and collapse-probability checks.
pub const REAL_EPS: Real = 1e-13;

/// Create a complex number from real and imaginary parts.
#[inline]
pub const fn c(re: f64, im: f64) -> C64 {
    C64::new(re, im)
}

/// Complex zero.
pub const ZERO: C64 = C64::new(0.0, 0.0);

/// Complex one.
pub const ONE: C64 = C64::new(1.0, 0.0);

/// Complex imaginary unit i.
pub const I: C64 = C64::new(0.0, 1.0);

/// 1/√2 as complex number.
pub const FRAC_1_SQRT_2_C: C64 = C64::new(FRAC_1_SQRT_2, 0.0);

// ============================================================================
// Gate Matrices
// ============================================================================

/// 2x2 matrix type: `[[a, b], [c, d]]`, row-major.
pub type Matrix2x2 = [[C64; 2]; 2];

/// Identity matrix I.
pub const IDENTITY: Matrix2x2 = [[ONE, ZERO], [ZERO, ONE]];

/// Pauli-X (NOT) gate.
/// |0⟩ → |1⟩, |1⟩ → |0⟩
pub const PAULI_X: Matrix2x2 = [[ZERO, ONE], [ONE, ZERO]];

/// Pauli-Y gate.
/// |0⟩ → i|1⟩, |1⟩ → -i|0⟩
pub const PAULI_Y: Matrix2x2 = [[ZERO, C64::new(0.0, -1.0)], [I, ZERO]];

/// Pauli-Z gate.
/// |0⟩ → |0⟩, |1⟩ → -|1⟩
pub const PAULI_Z: Matrix2x2 = [[ONE, ZERO], [ZERO, C64::new(-1.0, 0.0)]];

/// Hadamard gate.
/// |0⟩ → (|0⟩ + |1⟩)/√2, |1⟩ → (|0⟩ - |1⟩)/√2
pub const HADAMARD: Matrix2x2 = [
    [FRAC_1_SQRT_2_C, FRAC_1_SQRT_2_C],
    [FRAC_1_SQRT_2_C, C64::new(-FRAC_1_SQRT_2, 0.0)],
];

/// Diagonal phase gates: multiply every amplitude whose target bit is 1 by
/// a fixed scalar. These never mix the two halves of a block, which is why
/// their distributed path needs no shard exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    /// Multiplier -1 (Pauli-Z)
    PauliZ,
    /// Multiplier i (S, √Z)
    S,
    /// Multiplier -i (S†)
    SDagger,
    /// Multiplier e^(iπ/4) (T, π/8 gate)
    T,
    /// Multiplier e^(-iπ/4) (T†)
    TDagger,
}

impl PhaseKind {
    /// The scalar applied to bit-1 amplitudes.
    pub const fn factor(self) -> C64 {
        match self {
            PhaseKind::PauliZ => C64::new(-1.0, 0.0),
            PhaseKind::S => I,
            PhaseKind::SDagger => C64::new(0.0, -1.0),
            PhaseKind::T => C64::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2),
            PhaseKind::TDagger => C64::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2),
        }
    }
}

// ============================================================================
// Matrix Utilities
// ============================================================================

/// Computes the Hermitian conjugate (conjugate transpose) of a 2x2 matrix.
pub fn dagger_2x2(m: &Matrix2x2) -> Matrix2x2 {
    [
        [m[0][0].conj(), m[1][0].conj()],
        [m[0][1].conj(), m[1][1].conj()],
    ]
}

/// Multiplies two 2x2 matrices.
pub fn mul_2x2(a: &Matrix2x2, b: &Matrix2x2) -> Matrix2x2 {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

/// Checks if a 2x2 matrix is approximately unitary (U†U ≈ I).
pub fn is_unitary_2x2(m: &Matrix2x2, tolerance: f64) -> bool {
    let product = mul_2x2(&dagger_2x2(m), m);

    (product[0][0] - ONE).norm() < tolerance
        && product[0][1].norm() < tolerance
        && product[1][0].norm() < tolerance
        && (product[1][1] - ONE).norm() < tolerance
}

/// Checks if `(alpha, beta)` parameterize a compact unitary, i.e.
/// `|alpha|^2 + |beta|^2 ≈ 1`.
pub fn is_valid_compact_pair(alpha: C64, beta: C64, tolerance: f64) -> bool {
    (alpha.norm_sqr() + beta.norm_sqr() - 1.0).abs() < tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-10;

    #[test]
    fn test_pauli_gates_unitary() {
        assert!(is_unitary_2x2(&PAULI_X, TOLERANCE));
        assert!(is_unitary_2x2(&PAULI_Y, TOLERANCE));
        assert!(is_unitary_2x2(&PAULI_Z, TOLERANCE));
    }

    #[test]
    fn test_hadamard_unitary() {
        assert!(is_unitary_2x2(&HADAMARD, TOLERANCE));
    }

    #[test]
    fn test_hadamard_squared_is_identity() {
        let h2 = mul_2x2(&HADAMARD, &HADAMARD);
        assert!((h2[0][0] - ONE).norm() < TOLERANCE);
        assert!(h2[0][1].norm() < TOLERANCE);
        assert!(h2[1][0].norm() < TOLERANCE);
        assert!((h2[1][1] - ONE).norm() < TOLERANCE);
    }

    #[test]
    fn test_phase_factors_are_unit() {
        for kind in [
            PhaseKind::PauliZ,
            PhaseKind::S,
            PhaseKind::SDagger,
            PhaseKind::T,
            PhaseKind::TDagger,
        ] {
            assert!((kind.factor().norm() - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_s_factor_squared_is_z_factor() {
        let s2 = PhaseKind::S.factor() * PhaseKind::S.factor();
        assert!((s2 - PhaseKind::PauliZ.factor()).norm() < TOLERANCE);
    }

    #[test]
    fn test_dagger_kinds_conjugate() {
        assert!((PhaseKind::S.factor().conj() - PhaseKind::SDagger.factor()).norm() < TOLERANCE);
        assert!((PhaseKind::T.factor().conj() - PhaseKind::TDagger.factor()).norm() < TOLERANCE);
    }

    #[test]
    fn test_compact_pair_validation() {
        let alpha = c(FRAC_1_SQRT_2, 0.0);
        let beta = c(0.0, FRAC_1_SQRT_2);
        assert!(is_valid_compact_pair(alpha, beta, TOLERANCE));
        assert!(!is_valid_compact_pair(alpha, alpha + beta, TOLERANCE));
    }

    #[test]
    fn test_scaled_matrix_not_unitary() {
        let mut m = HADAMARD;
        m[0][0] = m[0][0] * c(1.1, 0.0);
        assert!(!is_unitary_2x2(&m, TOLERANCE));
    }
}
