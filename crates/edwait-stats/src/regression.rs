//! Ordinary least squares over a named design matrix.
//!
//! Categorical predictors are treatment-coded: the smallest level is the
//! baseline and every other level gets a `C(factor)[T.level]` indicator
//! column. Columns that are linear combinations of earlier columns (for
//! example interaction cells with no observations) are detected during the
//! QR decomposition and reported as aliased instead of failing the fit.

use std::{collections::BTreeSet, fmt::Display};

use serde::Serialize;

use crate::distribution;

const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum RegressionError {
    #[display("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[display("response has {actual} rows, design matrix has {expected}")]
    ResponseLengthMismatch { expected: usize, actual: usize },
    #[display("design matrix has no observations")]
    NoObservations,
    #[display("design matrix has no columns")]
    NoColumns,
}

/// Column-major design matrix with column names.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    rows: usize,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl DesignMatrix {
    /// An empty design matrix for `rows` observations.
    #[must_use]
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            names: vec![],
            columns: vec![],
        }
    }

    /// A design matrix whose first column is the constant `Intercept`.
    #[must_use]
    pub fn with_intercept(rows: usize) -> Self {
        let mut design = Self::new(rows);
        design.names.push("Intercept".to_owned());
        design.columns.push(vec![1.0; rows]);
        design
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), RegressionError> {
        let name = name.into();
        if values.len() != self.rows {
            return Err(RegressionError::LengthMismatch {
                column: name,
                expected: self.rows,
                actual: values.len(),
            });
        }
        self.names.push(name);
        self.columns.push(values);
        Ok(())
    }

    /// Adds treatment-coded indicator columns for a categorical predictor.
    ///
    /// ```
    /// # use edwait_stats::regression::DesignMatrix;
    /// let mut design = DesignMatrix::with_intercept(4);
    /// design.push_categorical("priority", &[3, 4, 3, 5]).unwrap();
    /// assert_eq!(
    ///     design.column_names(),
    ///     ["Intercept", "C(priority)[T.4]", "C(priority)[T.5]"]
    /// );
    /// ```
    pub fn push_categorical<L>(&mut self, factor: &str, levels: &[L]) -> Result<(), RegressionError>
    where
        L: Ord + Display,
    {
        for (name, values) in treatment_columns(factor, levels) {
            self.push_column(name, values)?;
        }
        Ok(())
    }

    /// Adds the products of two categorical predictors' indicator columns.
    pub fn push_interaction<A, B>(
        &mut self,
        factor_a: &str,
        levels_a: &[A],
        factor_b: &str,
        levels_b: &[B],
    ) -> Result<(), RegressionError>
    where
        A: Ord + Display,
        B: Ord + Display,
    {
        let columns_b = treatment_columns(factor_b, levels_b);
        for (name_a, values_a) in treatment_columns(factor_a, levels_a) {
            for (name_b, values_b) in &columns_b {
                let values = values_a.iter().zip(values_b).map(|(a, b)| a * b).collect();
                self.push_column(format!("{name_a}:{name_b}"), values)?;
            }
        }
        Ok(())
    }
}

fn treatment_columns<L>(factor: &str, levels: &[L]) -> Vec<(String, Vec<f64>)>
where
    L: Ord + Display,
{
    let distinct = levels.iter().collect::<BTreeSet<_>>();
    distinct
        .into_iter()
        .skip(1)
        .map(|level| {
            let values = levels
                .iter()
                .map(|l| if l == level { 1.0 } else { 0.0 })
                .collect();
            (format!("C({factor})[T.{level}]"), values)
        })
        .collect()
}

/// One estimated coefficient.
///
/// All statistics are `None` for aliased columns; standard errors and tests
/// are also `None` when the fit has no residual degrees of freedom.
#[derive(Debug, Clone, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: Option<f64>,
    pub std_error: Option<f64>,
    pub t_value: Option<f64>,
    pub p_value: Option<f64>,
}

/// Result of an ordinary least squares fit.
#[derive(Debug, Clone, Serialize)]
pub struct OlsFit {
    pub n_obs: usize,
    /// Number of linearly independent columns.
    pub rank: usize,
    pub df_resid: usize,
    /// Residual sum of squares.
    pub rss: f64,
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
    pub coefficients: Vec<Coefficient>,
}

impl OlsFit {
    pub fn fit(design: &DesignMatrix, response: &[f64]) -> Result<Self, RegressionError> {
        let n = design.rows;
        if n == 0 {
            return Err(RegressionError::NoObservations);
        }
        if design.columns.is_empty() {
            return Err(RegressionError::NoColumns);
        }
        if response.len() != n {
            return Err(RegressionError::ResponseLengthMismatch {
                expected: n,
                actual: response.len(),
            });
        }

        let qr = ThinQr::decompose(&design.columns);
        let rank = qr.kept.len();
        let qty = qr.q.iter().map(|q| dot(q, response)).collect::<Vec<_>>();
        let beta = qr.solve_upper(&qty);

        let rss = (0..n)
            .map(|row| {
                let fitted = qr
                    .kept
                    .iter()
                    .zip(&beta)
                    .map(|(&col, b)| design.columns[col][row] * b)
                    .sum::<f64>();
                (response[row] - fitted).powi(2)
            })
            .sum::<f64>();
        let df_resid = n - rank;

        let covariance_diag = (df_resid > 0).then(|| {
            let sigma2 = rss / usize_to_f64(df_resid);
            qr.inverse_gram_diagonal()
                .into_iter()
                .map(|d| sigma2 * d)
                .collect::<Vec<_>>()
        });

        let mut coefficients = design
            .names
            .iter()
            .map(|name| Coefficient {
                name: name.clone(),
                estimate: None,
                std_error: None,
                t_value: None,
                p_value: None,
            })
            .collect::<Vec<_>>();
        for (k, &col) in qr.kept.iter().enumerate() {
            let coefficient = &mut coefficients[col];
            coefficient.estimate = Some(beta[k]);
            if let Some(diag) = &covariance_diag {
                let std_error = diag[k].sqrt();
                coefficient.std_error = Some(std_error);
                if std_error > 0.0 {
                    let t = beta[k] / std_error;
                    coefficient.t_value = Some(t);
                    coefficient.p_value = Some(distribution::student_t_two_sided(
                        t,
                        usize_to_f64(df_resid),
                    ));
                }
            }
        }

        let mean = response.iter().sum::<f64>() / usize_to_f64(n);
        let tss = response.iter().map(|y| (y - mean).powi(2)).sum::<f64>();
        let r_squared = (tss > 0.0).then(|| 1.0 - rss / tss);
        let adj_r_squared = r_squared.and_then(|r2| {
            (df_resid > 0)
                .then(|| 1.0 - (1.0 - r2) * usize_to_f64(n - 1) / usize_to_f64(df_resid))
        });

        Ok(Self {
            n_obs: n,
            rank,
            df_resid,
            rss,
            r_squared,
            adj_r_squared,
            coefficients,
        })
    }

    #[must_use]
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

/// Thin QR decomposition by modified Gram–Schmidt, dropping dependent columns.
struct ThinQr {
    /// Indices of the linearly independent input columns.
    kept: Vec<usize>,
    /// Orthonormal columns, one per kept input column.
    q: Vec<Vec<f64>>,
    /// `r[c][i]` is `R[i][c]` for `i <= c`.
    r: Vec<Vec<f64>>,
}

impl ThinQr {
    fn decompose(columns: &[Vec<f64>]) -> Self {
        let mut qr = Self {
            kept: vec![],
            q: vec![],
            r: vec![],
        };
        for (j, column) in columns.iter().enumerate() {
            let original_norm = norm(column);
            let mut v = column.clone();
            let mut r_column = Vec::with_capacity(qr.q.len() + 1);
            for q in &qr.q {
                let projection = dot(q, &v);
                for (vi, qi) in v.iter_mut().zip(q) {
                    *vi -= projection * qi;
                }
                r_column.push(projection);
            }
            let residual_norm = norm(&v);
            if original_norm == 0.0 || residual_norm <= RANK_TOLERANCE * original_norm {
                continue;
            }
            for vi in &mut v {
                *vi /= residual_norm;
            }
            r_column.push(residual_norm);
            qr.kept.push(j);
            qr.q.push(v);
            qr.r.push(r_column);
        }
        qr
    }

    /// Solves `R x = rhs` by back substitution.
    fn solve_upper(&self, rhs: &[f64]) -> Vec<f64> {
        let m = self.kept.len();
        let mut x = vec![0.0; m];
        for i in (0..m).rev() {
            let tail = (i + 1..m).map(|c| self.r[c][i] * x[c]).sum::<f64>();
            x[i] = (rhs[i] - tail) / self.r[i][i];
        }
        x
    }

    /// Diagonal of `(RᵀR)⁻¹ = R⁻¹R⁻ᵀ`.
    fn inverse_gram_diagonal(&self) -> Vec<f64> {
        let m = self.kept.len();
        let mut diagonal = vec![0.0; m];
        for c in 0..m {
            let mut unit = vec![0.0; m];
            unit[c] = 1.0;
            // column c of R⁻¹
            let inverse_column = self.solve_upper(&unit);
            for (d, x) in diagonal.iter_mut().zip(inverse_column) {
                *d += x * x;
            }
        }
        diagonal
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[expect(clippy::cast_precision_loss)]
fn usize_to_f64(n: usize) -> f64 {
    n as f64
}
