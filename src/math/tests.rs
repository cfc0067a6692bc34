// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::f64::consts::*;

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn test_cexp() {
    assert_abs_diff_eq!(cexp(PI), c64::new(-1.0, 0.0), epsilon = 1e-15);
    assert_abs_diff_eq!(cexp(FRAC_PI_2), c64::new(0.0, 1.0), epsilon = 1e-15);
}

#[test]
fn test_linspace() {
    assert!(linspace(0.0, 1.0, 0).is_empty());
    assert_eq!(linspace(-2.0, 2.0, 1), vec![0.0]);
    let v = linspace(-1.0, 1.0, 5);
    assert_eq!(v.len(), 5);
    for (v, e) in v.into_iter().zip([-1.0, -0.5, 0.0, 0.5, 1.0]) {
        assert_abs_diff_eq!(v, e);
    }
}

#[test]
fn test_wrap_degrees() {
    assert_abs_diff_eq!(wrap_degrees(-10.0), 350.0);
    assert_abs_diff_eq!(wrap_degrees(720.0), 0.0);
    assert_abs_diff_eq!(wrap_degrees(359.5), 359.5);
    assert!(wrap_degrees(-1e-17) < 360.0);
}

#[test]
fn test_low_order_lambdas() {
    let theta = 0.7_f64;
    let (s, c) = theta.sin_cos();
    let legendre = Legendre::new(3);

    // m = 0
    let mut out = vec![0.0; 4];
    legendre.fill_spin0(0, Legendre::lambda_00(), c, &mut out);
    assert_abs_diff_eq!(out[0], (1.0 / (4.0 * PI)).sqrt(), epsilon = 1e-14);
    assert_abs_diff_eq!(out[1], (3.0 / (4.0 * PI)).sqrt() * c, epsilon = 1e-14);
    assert_abs_diff_eq!(
        out[2],
        (5.0 / (4.0 * PI)).sqrt() * 0.5 * (3.0 * c * c - 1.0),
        epsilon = 1e-14
    );
    assert_abs_diff_eq!(
        out[3],
        (7.0 / (4.0 * PI)).sqrt() * 0.5 * (5.0 * c * c * c - 3.0 * c),
        epsilon = 1e-14
    );

    // m = 1
    let lambda_11 = Legendre::next_lambda_mm(Legendre::lambda_00(), 1, s);
    assert_abs_diff_eq!(lambda_11, -(3.0 / (8.0 * PI)).sqrt() * s, epsilon = 1e-14);
    let mut out = vec![0.0; 3];
    legendre.fill_spin0(1, lambda_11, c, &mut out);
    // λ_21 = -sqrt(15/8π) sinθ cosθ
    assert_abs_diff_eq!(out[1], -(15.0 / (8.0 * PI)).sqrt() * s * c, epsilon = 1e-14);

    // m = 2
    let lambda_22 = Legendre::next_lambda_mm(lambda_11, 2, s);
    // λ_22 = sqrt(15/32π) sin²θ
    assert_abs_diff_eq!(lambda_22, (15.0 / (32.0 * PI)).sqrt() * s * s, epsilon = 1e-14);
}

#[test]
fn test_spin2_quadrupole() {
    // For ℓ = 2, m = 0 the spin-2 "W" function is the spin-2 harmonic
    // sqrt(15/32π) sin²θ and "X" vanishes.
    let theta = 1.1_f64;
    let (s, c) = theta.sin_cos();
    let legendre = Legendre::new(4);
    let mut spin0 = vec![0.0; 5];
    legendre.fill_spin0(0, Legendre::lambda_00(), c, &mut spin0);
    let mut w = vec![0.0; 5];
    let mut x = vec![0.0; 5];
    legendre.fill_spin2(0, c, s, &spin0, &mut w, &mut x);

    assert_abs_diff_eq!(w[0], 0.0);
    assert_abs_diff_eq!(w[1], 0.0);
    assert_abs_diff_eq!(w[2], (15.0 / (32.0 * PI)).sqrt() * s * s, epsilon = 1e-13);
    for x in x {
        assert_abs_diff_eq!(x, 0.0);
    }
}
