//! Sparse symmetric matrix storage and the conjugate gradient solver.
//!
//! The linear system is accumulated as triplets (duplicates summing), frozen
//! into compressed sparse row form, and solved with conjugate gradient. The
//! matrix is symmetric positive semi-definite by construction, so CG is the
//! right tool; the caller treats non-convergence as fatal.

/// A triplet accumulator for building a sparse matrix.
///
/// Triplets at the same (row, column) position are summed when the matrix is
/// frozen.
#[derive(Debug, Clone)]
pub struct TripletList {
    n: usize,
    triplets: Vec<(usize, usize, f64)>,
}

impl TripletList {
    /// Creates an accumulator for an `n x n` matrix.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            triplets: Vec::new(),
        }
    }

    /// Reserves space for at least `additional` more triplets.
    pub fn reserve(&mut self, additional: usize) {
        self.triplets.reserve(additional);
    }

    /// Records `value` at `(row, col)`, summing with any previous entries
    /// at the same position.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n && col < self.n);
        self.triplets.push((row, col, value));
    }

    /// Freezes the accumulated triplets into CSR form.
    pub fn to_csr(&self) -> CsrMatrix {
        let mut sorted = self.triplets.clone();
        sorted.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        let mut row_counts = vec![0usize; self.n];
        let mut last_pos: Option<(usize, usize)> = None;
        for &(row, col, value) in &sorted {
            if last_pos == Some((row, col)) {
                // Sorting put duplicates adjacent; sum them into one entry.
                *values.last_mut().unwrap() += value;
                continue;
            }
            col_indices.push(col);
            values.push(value);
            row_counts[row] += 1;
            last_pos = Some((row, col));
        }
        let mut row_ptr = vec![0usize; self.n + 1];
        for row in 0..self.n {
            row_ptr[row + 1] = row_ptr[row] + row_counts[row];
        }

        let mut diag_indices = vec![None; self.n];
        for row in 0..self.n {
            for idx in row_ptr[row]..row_ptr[row + 1] {
                if col_indices[idx] == row {
                    diag_indices[row] = Some(idx);
                }
            }
        }

        CsrMatrix {
            n: self.n,
            row_ptr,
            col_indices,
            values,
            diag_indices,
        }
    }
}

/// A sparse matrix in compressed sparse row form.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f64>,
    /// Index into `values` of each row's diagonal entry, if stored.
    diag_indices: Vec<Option<usize>>,
}

impl CsrMatrix {
    /// Returns the dimension of the matrix.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns the value at `(row, col)` (zero if not stored).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        for idx in self.row_ptr[row]..self.row_ptr[row + 1] {
            if self.col_indices[idx] == col {
                return self.values[idx];
            }
        }
        0.0
    }

    /// Adds `value` to the diagonal entry of `row`.
    ///
    /// The diagonal entry must have been stored when the matrix was frozen
    /// (an explicit zero suffices).
    pub fn add_to_diagonal(&mut self, row: usize, value: f64) {
        let idx = self.diag_indices[row]
            .expect("diagonal entry must be stored to be updated");
        self.values[idx] += value;
    }

    /// Computes `out = A * x`.
    pub fn mul_vec(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(x.len(), self.n);
        debug_assert_eq!(out.len(), self.n);
        for row in 0..self.n {
            let mut sum = 0.0;
            for idx in self.row_ptr[row]..self.row_ptr[row + 1] {
                sum += self.values[idx] * x[self.col_indices[idx]];
            }
            out[row] = sum;
        }
    }
}

/// Why conjugate gradient gave up.
#[derive(Debug, Clone, Copy)]
pub struct CgFailure {
    /// The relative residual when iteration stopped.
    pub residual: f64,
    /// The number of iterations performed.
    pub iterations: usize,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solves `A x = b` for a symmetric positive semi-definite `A` by conjugate
/// gradient, starting from the zero vector.
///
/// Converged means the relative residual `|b - A x| / |b|` has dropped below
/// `tolerance`. A zero right-hand side short-circuits to the zero solution.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &[f64],
    tolerance: f64,
    max_iterations: usize,
) -> Result<Vec<f64>, CgFailure> {
    let n = b.len();
    debug_assert_eq!(a.n(), n);
    let mut x = vec![0.0; n];
    let rhs_norm2 = dot(b, b);
    if rhs_norm2 == 0.0 {
        return Ok(x);
    }
    let threshold = tolerance * tolerance * rhs_norm2;

    let mut r = b.to_vec();
    let mut p = r.clone();
    let mut tmp = vec![0.0; n];
    let mut abs_new = dot(&r, &r);
    let mut iterations = 0;
    while abs_new > threshold && iterations < max_iterations {
        a.mul_vec(&p, &mut tmp);
        let denom = dot(&p, &tmp);
        if denom <= 0.0 {
            // The search direction lies in the matrix's null space; the
            // system is inconsistent for this right-hand side.
            break;
        }
        let alpha = abs_new / denom;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * tmp[i];
        }
        let abs_old = abs_new;
        abs_new = dot(&r, &r);
        let beta = abs_new / abs_old;
        for i in 0..n {
            p[i] = r[i] + beta * p[i];
        }
        iterations += 1;
    }

    if abs_new > threshold {
        return Err(CgFailure {
            residual: (abs_new / rhs_norm2).sqrt(),
            iterations,
        });
    }
    Ok(x)
}
