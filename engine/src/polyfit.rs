//! Small least-squares polynomial fit, used by cycle-slip detection to
//! predict the next geometry-free phase sample from the recent history
//! buffer (§4.1). The buffers involved are tiny (`CSNPOINTS` samples,
//! typically under twenty) so a hand-rolled normal-equations solve is
//! both simpler and faster than pulling in a linear algebra crate for
//! this one operation.

/// Fits a polynomial of the given `degree` to `(x, y)` samples by solving
/// the normal equations of the Vandermonde system via Gaussian
/// elimination with partial pivoting. Returns coefficients in increasing
/// power order: `coeffs[0] + coeffs[1] * x + coeffs[2] * x^2 + ...`.
///
/// Returns `None` if the system is singular (fewer independent samples
/// than `degree + 1`).
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Option<Vec<f64>> {
    let n = degree + 1;
    debug_assert_eq!(x.len(), y.len());

    // Build the normal equations A^T A c = A^T y, where A is the
    // Vandermonde matrix of `x` up to `degree`.
    let mut ata = vec![vec![0.0_f64; n]; n];
    let mut aty = vec![0.0_f64; n];

    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let mut powers = vec![1.0_f64; n];
        for k in 1..n {
            powers[k] = powers[k - 1] * xi;
        }
        for row in 0..n {
            aty[row] += powers[row] * yi;
            for col in 0..n {
                ata[row][col] += powers[row] * powers[col];
            }
        }
    }

    gaussian_solve(ata, aty)
}

/// Evaluates a polynomial with coefficients in increasing power order at `x`.
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    let mut acc = 0.0;
    let mut power = 1.0;
    for c in coeffs {
        acc += c * power;
        power *= x;
    }
    acc
}

fn gaussian_solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| a[r1][col].abs().partial_cmp(&a[r2][col].abs()).unwrap())?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[col][col];
        for k in col..n {
            a[col][k] /= pivot;
        }
        b[col] /= pivot;

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    Some(b)
}
