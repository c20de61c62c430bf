//! Analysis of variance.
//!
//! [`one_way`] compares the means of any number of labelled groups.
//! [`two_factor`] fits `y ~ C(a) * C(b)` and partitions the explained sum of
//! squares sequentially (type I): `a`, then `b` given `a`, then the `a:b`
//! interaction given both main effects.

use std::fmt::Display;

use serde::Serialize;

use crate::{
    distribution,
    regression::{DesignMatrix, OlsFit, RegressionError},
};

/// One row of an ANOVA table.
#[derive(Debug, Clone, Serialize)]
pub struct AnovaRow {
    pub term: String,
    pub df: usize,
    pub sum_sq: f64,
    pub mean_sq: f64,
    /// `None` for the residual row.
    pub f_value: Option<f64>,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnovaTable {
    pub n_obs: usize,
    pub rows: Vec<AnovaRow>,
}

impl AnovaTable {
    #[must_use]
    pub fn term(&self, term: &str) -> Option<&AnovaRow> {
        self.rows.iter().find(|row| row.term == term)
    }
}

/// One-way ANOVA over `(label, observations)` groups.
///
/// Empty groups are ignored. Returns `None` when fewer than two non-empty
/// groups remain or there are no residual degrees of freedom.
///
/// ```
/// # use edwait_stats::anova;
/// let groups = [
///     ("night", vec![40.0, 42.0, 38.0]),
///     ("day", vec![20.0, 22.0, 18.0]),
/// ];
/// let table = anova::one_way(&groups).unwrap();
/// let between = table.term("group").unwrap();
/// assert_eq!(between.df, 1);
/// assert!(between.p_value.unwrap() < 0.001);
/// ```
#[must_use]
pub fn one_way<L>(groups: &[(L, Vec<f64>)]) -> Option<AnovaTable>
where
    L: Display,
{
    let groups = groups
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .collect::<Vec<_>>();
    let n_obs = groups.iter().map(|(_, values)| values.len()).sum::<usize>();
    let k = groups.len();
    if k < 2 || n_obs <= k {
        return None;
    }

    let grand_mean = groups.iter().flat_map(|(_, v)| v).sum::<f64>() / to_f64(n_obs);
    let (ss_between, ss_within) = groups.iter().fold((0.0, 0.0), |(between, within), (_, v)| {
        let mean = v.iter().sum::<f64>() / to_f64(v.len());
        (
            between + to_f64(v.len()) * (mean - grand_mean).powi(2),
            within + v.iter().map(|x| (x - mean).powi(2)).sum::<f64>(),
        )
    });

    Some(AnovaTable {
        n_obs,
        rows: effect_rows(
            vec![("group".to_owned(), k - 1, ss_between)],
            n_obs - k,
            ss_within,
        ),
    })
}

/// Two-factor ANOVA with interaction: `y ~ C(a) + C(b) + C(a):C(b)`.
///
/// Term names follow the `C(name)` convention, with the interaction named
/// `C(a):C(b)`.
pub fn two_factor<A, B>(
    response: &[f64],
    factor_a: (&str, &[A]),
    factor_b: (&str, &[B]),
) -> Result<AnovaTable, RegressionError>
where
    A: Ord + Display,
    B: Ord + Display,
{
    let n = response.len();
    let (name_a, levels_a) = factor_a;
    let (name_b, levels_b) = factor_b;

    let intercept = DesignMatrix::with_intercept(n);
    let mut main_a = intercept.clone();
    main_a.push_categorical(name_a, levels_a)?;
    let mut main_ab = main_a.clone();
    main_ab.push_categorical(name_b, levels_b)?;
    let mut full = main_ab.clone();
    full.push_interaction(name_a, levels_a, name_b, levels_b)?;

    let fits = [&intercept, &main_a, &main_ab, &full]
        .into_iter()
        .map(|design| OlsFit::fit(design, response))
        .collect::<Result<Vec<_>, _>>()?;

    let terms = [
        format!("C({name_a})"),
        format!("C({name_b})"),
        format!("C({name_a}):C({name_b})"),
    ];
    let effects = terms
        .into_iter()
        .zip(fits.windows(2))
        .map(|(term, pair)| {
            let (reduced, larger) = (&pair[0], &pair[1]);
            (
                term,
                larger.rank - reduced.rank,
                (reduced.rss - larger.rss).max(0.0),
            )
        })
        .collect();

    let full_fit = &fits[3];
    Ok(AnovaTable {
        n_obs: n,
        rows: effect_rows(effects, full_fit.df_resid, full_fit.rss),
    })
}

fn effect_rows(
    effects: Vec<(String, usize, f64)>,
    df_resid: usize,
    ss_resid: f64,
) -> Vec<AnovaRow> {
    let ms_resid = if df_resid > 0 {
        ss_resid / to_f64(df_resid)
    } else {
        f64::NAN
    };
    let mut rows = effects
        .into_iter()
        .map(|(term, df, sum_sq)| {
            let mean_sq = if df > 0 { sum_sq / to_f64(df) } else { f64::NAN };
            let f_value = (df > 0 && ms_resid > 0.0).then(|| mean_sq / ms_resid);
            let p_value = f_value.map(|f| distribution::f_sf(f, to_f64(df), to_f64(df_resid)));
            AnovaRow {
                term,
                df,
                sum_sq,
                mean_sq,
                f_value,
                p_value,
            }
        })
        .collect::<Vec<_>>();
    rows.push(AnovaRow {
        term: "Residual".to_owned(),
        df: df_resid,
        sum_sq: ss_resid,
        mean_sq: ms_resid,
        f_value: None,
        p_value: None,
    });
    rows
}

#[expect(clippy::cast_precision_loss)]
fn to_f64(n: usize) -> f64 {
    n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_way_sums_of_squares() {
        let groups = [
            (1, vec![1.0, 2.0, 3.0]),
            (2, vec![4.0, 5.0, 6.0]),
            (3, vec![7.0, 8.0, 9.0]),
        ];
        let table = one_way(&groups).unwrap();
        let between = table.term("group").unwrap();
        let residual = table.term("Residual").unwrap();
        assert_eq!(between.df, 2);
        assert_eq!(residual.df, 6);
        assert!((between.sum_sq - 54.0).abs() < 1e-9);
        assert!((residual.sum_sq - 6.0).abs() < 1e-9);
        assert!((between.f_value.unwrap() - 27.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_way_requires_two_groups() {
        assert!(one_way(&[("only", vec![1.0, 2.0])]).is_none());
        assert!(one_way(&[("a", vec![1.0]), ("b", vec![])]).is_none());
    }

    #[test]
    fn test_two_factor_partitions_total_sum_of_squares() {
        let flag = [0, 0, 0, 0, 1, 1, 1, 1, 0, 1];
        let priority = [3, 3, 4, 4, 3, 3, 4, 4, 3, 4];
        let lateness = [5.0, 7.0, 10.0, 14.0, 25.0, 21.0, 40.0, 46.0, 6.0, 43.0];
        let table = two_factor(&lateness, ("flag", &flag), ("priority", &priority)).unwrap();

        let mean = lateness.iter().sum::<f64>() / 10.0;
        let tss = lateness.iter().map(|y| (y - mean).powi(2)).sum::<f64>();
        let explained = table.rows.iter().map(|row| row.sum_sq).sum::<f64>();
        assert!((explained - tss).abs() < 1e-6);

        assert_eq!(table.term("C(flag)").unwrap().df, 1);
        assert_eq!(table.term("C(priority)").unwrap().df, 1);
        assert_eq!(table.term("C(flag):C(priority)").unwrap().df, 1);
        assert_eq!(table.term("Residual").unwrap().df, 6);
        assert!(table.term("C(flag)").unwrap().p_value.unwrap() < 0.001);
    }

    #[test]
    fn test_two_factor_with_empty_cell() {
        // no (flag=1, priority=4) observations: interaction is aliased away
        let flag = [0, 0, 1, 1, 0, 0];
        let priority = [3, 4, 3, 3, 4, 3];
        let y = [1.0, 2.0, 3.0, 4.0, 2.5, 1.5];
        let table = two_factor(&y, ("flag", &flag), ("priority", &priority)).unwrap();
        assert_eq!(table.term("C(flag):C(priority)").unwrap().df, 0);
        assert!(table.term("C(flag):C(priority)").unwrap().f_value.is_none());
    }
}
