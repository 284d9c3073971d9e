//! Table-driven significance verdicts.
//!
//! Chi-square, correlation and ANOVA results are judged against fixed critical-value
//! tables at the .05 and .01 levels. Each table is a plain array indexed through a
//! degrees-of-freedom bucketing function; degrees of freedom that fall between two
//! tabulated values use the lower (more conservative) row. Exact p-values from `statrs`
//! are offered alongside for reporting.

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Significance {
    Significant01,
    Significant05,
    NotSignificant,
}

impl Significance {
    pub fn label(self) -> &'static str {
        match self {
            Significance::Significant01 => "Significant (p<.01)",
            Significance::Significant05 => "Significant (p<.05)",
            Significance::NotSignificant => "Not significant",
        }
    }

    pub fn is_significant(self) -> bool {
        self != Significance::NotSignificant
    }

    fn from_critical(statistic: f64, critical_05: f64, critical_01: f64) -> Self {
        if !statistic.is_finite() {
            Significance::NotSignificant
        } else if statistic >= critical_01 {
            Significance::Significant01
        } else if statistic >= critical_05 {
            Significance::Significant05
        } else {
            Significance::NotSignificant
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============ Chi-square ============

/// Number of tabulated chi-square degrees of freedom; larger df are clamped to this.
pub const CHI_SQUARE_TABLE_LEN: usize = 25;

/// Judges a chi-square statistic. `df` is clamped to `df_cap` (itself at most
/// [`CHI_SQUARE_TABLE_LEN`]); zero df is never significant.
pub fn chi_square_significance(chi_square: f64, df: usize, df_cap: usize) -> Significance {
    let cap = df_cap.clamp(1, CHI_SQUARE_TABLE_LEN);
    if df == 0 {
        return Significance::NotSignificant;
    }
    let index = df.min(cap) - 1;
    Significance::from_critical(
        chi_square,
        CHI_SQUARE_CRITICAL_05[index],
        CHI_SQUARE_CRITICAL_01[index],
    )
}

pub fn chi_square_p_value(chi_square: f64, df: usize) -> f64 {
    if df == 0 || !chi_square.is_finite() || chi_square <= 0.0 {
        return 1.0;
    }
    match ChiSquared::new(df as f64) {
        Ok(dist) => 1.0 - dist.cdf(chi_square),
        Err(_) => 1.0,
    }
}

// ============ Correlation ============

pub const R_DF_BUCKET_COUNT: usize = 39;

/// Tabulated degrees of freedom for the correlation tables: 1..=30 individually, then
/// bands of 5 to 50 and of 10 to 100. Anything above 100 uses the 100 row.
pub const R_DF_BUCKETS: [usize; R_DF_BUCKET_COUNT] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 35, 40, 45, 50, 60, 70, 80, 90, 100,
];

/// Index into the correlation tables for `df = N - 2`, or `None` when `df < 1`.
pub fn r_df_bucket(df: i64) -> Option<usize> {
    if df < 1 {
        return None;
    }
    R_DF_BUCKETS.iter().rposition(|&bucket| bucket as i64 <= df)
}

pub fn correlation_significance(r: f64, df: i64) -> Significance {
    match r_df_bucket(df) {
        Some(index) => Significance::from_critical(r.abs(), R_CRITICAL_05[index], R_CRITICAL_01[index]),
        None => Significance::NotSignificant,
    }
}

/// Two-tailed p-value of a Pearson correlation via the t distribution.
pub fn correlation_p_value(r: f64, df: i64) -> f64 {
    if df < 1 || !r.is_finite() {
        return 1.0;
    }
    let r_abs = r.abs();
    if r_abs >= 1.0 {
        return 0.0;
    }
    let df = df as f64;
    let t = r_abs * (df / (1.0 - r_abs * r_abs)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t)),
        Err(_) => 1.0,
    }
}

// ============ F (ANOVA) ============

/// Numerator df above this use the last column.
pub const F_DF1_CAP: usize = 10;

pub const F_DF2_BUCKET_COUNT: usize = 33;

/// Tabulated denominator degrees of freedom: 1..=30, 40, 60, 120.
pub const F_DF2_BUCKETS: [usize; F_DF2_BUCKET_COUNT] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 40, 60, 120,
];

/// (row, column) into the F tables for `(k - 1, N - k)`, or `None` when either is zero.
pub fn f_df_bucket(df_between: usize, df_within: usize) -> Option<(usize, usize)> {
    if df_between == 0 || df_within == 0 {
        return None;
    }
    let row = F_DF2_BUCKETS.iter().rposition(|&bucket| bucket <= df_within)?;
    Some((row, df_between.min(F_DF1_CAP) - 1))
}

pub fn f_significance(f: f64, df_between: usize, df_within: usize) -> Significance {
    match f_df_bucket(df_between, df_within) {
        Some((row, col)) => {
            Significance::from_critical(f, F_CRITICAL_05[row][col], F_CRITICAL_01[row][col])
        }
        None => Significance::NotSignificant,
    }
}

pub fn f_p_value(f: f64, df_between: usize, df_within: usize) -> f64 {
    if df_between == 0 || df_within == 0 || !f.is_finite() || f <= 0.0 {
        return 1.0;
    }
    match FisherSnedecor::new(df_between as f64, df_within as f64) {
        Ok(dist) => 1.0 - dist.cdf(f),
        Err(_) => 1.0,
    }
}

// ============ Tables ============

/// Upper-tail chi-square critical values at p = .05, indexed by `df - 1`.
pub const CHI_SQUARE_CRITICAL_05: [f64; CHI_SQUARE_TABLE_LEN] = [
    3.841, 5.991, 7.815, 9.488, 11.070, 12.592, 14.067, 15.507,
    16.919, 18.307, 19.675, 21.026, 22.362, 23.685, 24.996, 26.296,
    27.587, 28.869, 30.144, 31.410, 32.671, 33.924, 35.172, 36.415,
    37.652,
];

/// Upper-tail chi-square critical values at p = .01, indexed by `df - 1`.
pub const CHI_SQUARE_CRITICAL_01: [f64; CHI_SQUARE_TABLE_LEN] = [
    6.635, 9.210, 11.345, 13.277, 15.086, 16.812, 18.475, 20.090,
    21.666, 23.209, 24.725, 26.217, 27.688, 29.141, 30.578, 32.000,
    33.409, 34.805, 36.191, 37.566, 38.932, 40.289, 41.638, 42.980,
    44.314,
];

/// Two-tailed critical |r| at p = .05, one entry per [`R_DF_BUCKETS`] entry.
pub const R_CRITICAL_05: [f64; R_DF_BUCKET_COUNT] = [
    0.9969, 0.9500, 0.8783, 0.8114, 0.7545, 0.7067, 0.6664, 0.6319, 0.6021, 0.5760,
    0.5529, 0.5324, 0.5140, 0.4973, 0.4821, 0.4683, 0.4555, 0.4438, 0.4329, 0.4227,
    0.4132, 0.4044, 0.3961, 0.3882, 0.3809, 0.3739, 0.3673, 0.3610, 0.3550, 0.3494,
    0.3246, 0.3044, 0.2876, 0.2732, 0.2500, 0.2319, 0.2172, 0.2050, 0.1946,
];

/// Two-tailed critical |r| at p = .01.
pub const R_CRITICAL_01: [f64; R_DF_BUCKET_COUNT] = [
    0.9999, 0.9900, 0.9587, 0.9172, 0.8745, 0.8343, 0.7977, 0.7646, 0.7348, 0.7079,
    0.6835, 0.6614, 0.6411, 0.6226, 0.6055, 0.5897, 0.5751, 0.5614, 0.5487, 0.5368,
    0.5256, 0.5151, 0.5052, 0.4958, 0.4869, 0.4785, 0.4705, 0.4629, 0.4556, 0.4487,
    0.4182, 0.3932, 0.3721, 0.3542, 0.3248, 0.3017, 0.2830, 0.2673, 0.2540,
];

/// Upper-tail F critical values at p = .05. Rows follow [`F_DF2_BUCKETS`] (denominator df),
/// columns are numerator df 1..=10.
pub const F_CRITICAL_05: [[f64; F_DF1_CAP]; F_DF2_BUCKET_COUNT] = [
    [161.45, 199.50, 215.71, 224.58, 230.16, 233.99, 236.77, 238.88, 240.54, 241.88], // 1
    [18.51, 19.00, 19.16, 19.25, 19.30, 19.33, 19.35, 19.37, 19.38, 19.40], // 2
    [10.13, 9.55, 9.28, 9.12, 9.01, 8.94, 8.89, 8.85, 8.81, 8.79], // 3
    [7.71, 6.94, 6.59, 6.39, 6.26, 6.16, 6.09, 6.04, 6.00, 5.96], // 4
    [6.61, 5.79, 5.41, 5.19, 5.05, 4.95, 4.88, 4.82, 4.77, 4.74], // 5
    [5.99, 5.14, 4.76, 4.53, 4.39, 4.28, 4.21, 4.15, 4.10, 4.06], // 6
    [5.59, 4.74, 4.35, 4.12, 3.97, 3.87, 3.79, 3.73, 3.68, 3.64], // 7
    [5.32, 4.46, 4.07, 3.84, 3.69, 3.58, 3.50, 3.44, 3.39, 3.35], // 8
    [5.12, 4.26, 3.86, 3.63, 3.48, 3.37, 3.29, 3.23, 3.18, 3.14], // 9
    [4.96, 4.10, 3.71, 3.48, 3.33, 3.22, 3.14, 3.07, 3.02, 2.98], // 10
    [4.84, 3.98, 3.59, 3.36, 3.20, 3.09, 3.01, 2.95, 2.90, 2.85], // 11
    [4.75, 3.89, 3.49, 3.26, 3.11, 3.00, 2.91, 2.85, 2.80, 2.75], // 12
    [4.67, 3.81, 3.41, 3.18, 3.03, 2.92, 2.83, 2.77, 2.71, 2.67], // 13
    [4.60, 3.74, 3.34, 3.11, 2.96, 2.85, 2.76, 2.70, 2.65, 2.60], // 14
    [4.54, 3.68, 3.29, 3.06, 2.90, 2.79, 2.71, 2.64, 2.59, 2.54], // 15
    [4.49, 3.63, 3.24, 3.01, 2.85, 2.74, 2.66, 2.59, 2.54, 2.49], // 16
    [4.45, 3.59, 3.20, 2.96, 2.81, 2.70, 2.61, 2.55, 2.49, 2.45], // 17
    [4.41, 3.55, 3.16, 2.93, 2.77, 2.66, 2.58, 2.51, 2.46, 2.41], // 18
    [4.38, 3.52, 3.13, 2.90, 2.74, 2.63, 2.54, 2.48, 2.42, 2.38], // 19
    [4.35, 3.49, 3.10, 2.87, 2.71, 2.60, 2.51, 2.45, 2.39, 2.35], // 20
    [4.32, 3.47, 3.07, 2.84, 2.68, 2.57, 2.49, 2.42, 2.37, 2.32], // 21
    [4.30, 3.44, 3.05, 2.82, 2.66, 2.55, 2.46, 2.40, 2.34, 2.30], // 22
    [4.28, 3.42, 3.03, 2.80, 2.64, 2.53, 2.44, 2.37, 2.32, 2.27], // 23
    [4.26, 3.40, 3.01, 2.78, 2.62, 2.51, 2.42, 2.36, 2.30, 2.25], // 24
    [4.24, 3.39, 2.99, 2.76, 2.60, 2.49, 2.40, 2.34, 2.28, 2.24], // 25
    [4.23, 3.37, 2.98, 2.74, 2.59, 2.47, 2.39, 2.32, 2.27, 2.22], // 26
    [4.21, 3.35, 2.96, 2.73, 2.57, 2.46, 2.37, 2.31, 2.25, 2.20], // 27
    [4.20, 3.34, 2.95, 2.71, 2.56, 2.45, 2.36, 2.29, 2.24, 2.19], // 28
    [4.18, 3.33, 2.93, 2.70, 2.55, 2.43, 2.35, 2.28, 2.22, 2.18], // 29
    [4.17, 3.32, 2.92, 2.69, 2.53, 2.42, 2.33, 2.27, 2.21, 2.16], // 30
    [4.08, 3.23, 2.84, 2.61, 2.45, 2.34, 2.25, 2.18, 2.12, 2.08], // 40
    [4.00, 3.15, 2.76, 2.53, 2.37, 2.25, 2.17, 2.10, 2.04, 1.99], // 60
    [3.92, 3.07, 2.68, 2.45, 2.29, 2.18, 2.09, 2.02, 1.96, 1.91], // 120
];

/// Upper-tail F critical values at p = .01, laid out like [`F_CRITICAL_05`].
pub const F_CRITICAL_01: [[f64; F_DF1_CAP]; F_DF2_BUCKET_COUNT] = [
    [4052.18, 4999.50, 5403.35, 5624.58, 5763.65, 5858.99, 5928.36, 5981.07, 6022.47, 6055.85], // 1
    [98.50, 99.00, 99.17, 99.25, 99.30, 99.33, 99.36, 99.37, 99.39, 99.40], // 2
    [34.12, 30.82, 29.46, 28.71, 28.24, 27.91, 27.67, 27.49, 27.35, 27.23], // 3
    [21.20, 18.00, 16.69, 15.98, 15.52, 15.21, 14.98, 14.80, 14.66, 14.55], // 4
    [16.26, 13.27, 12.06, 11.39, 10.97, 10.67, 10.46, 10.29, 10.16, 10.05], // 5
    [13.75, 10.92, 9.78, 9.15, 8.75, 8.47, 8.26, 8.10, 7.98, 7.87], // 6
    [12.25, 9.55, 8.45, 7.85, 7.46, 7.19, 6.99, 6.84, 6.72, 6.62], // 7
    [11.26, 8.65, 7.59, 7.01, 6.63, 6.37, 6.18, 6.03, 5.91, 5.81], // 8
    [10.56, 8.02, 6.99, 6.42, 6.06, 5.80, 5.61, 5.47, 5.35, 5.26], // 9
    [10.04, 7.56, 6.55, 5.99, 5.64, 5.39, 5.20, 5.06, 4.94, 4.85], // 10
    [9.65, 7.21, 6.22, 5.67, 5.32, 5.07, 4.89, 4.74, 4.63, 4.54], // 11
    [9.33, 6.93, 5.95, 5.41, 5.06, 4.82, 4.64, 4.50, 4.39, 4.30], // 12
    [9.07, 6.70, 5.74, 5.21, 4.86, 4.62, 4.44, 4.30, 4.19, 4.10], // 13
    [8.86, 6.51, 5.56, 5.04, 4.69, 4.46, 4.28, 4.14, 4.03, 3.94], // 14
    [8.68, 6.36, 5.42, 4.89, 4.56, 4.32, 4.14, 4.00, 3.89, 3.80], // 15
    [8.53, 6.23, 5.29, 4.77, 4.44, 4.20, 4.03, 3.89, 3.78, 3.69], // 16
    [8.40, 6.11, 5.18, 4.67, 4.34, 4.10, 3.93, 3.79, 3.68, 3.59], // 17
    [8.29, 6.01, 5.09, 4.58, 4.25, 4.01, 3.84, 3.71, 3.60, 3.51], // 18
    [8.18, 5.93, 5.01, 4.50, 4.17, 3.94, 3.77, 3.63, 3.52, 3.43], // 19
    [8.10, 5.85, 4.94, 4.43, 4.10, 3.87, 3.70, 3.56, 3.46, 3.37], // 20
    [8.02, 5.78, 4.87, 4.37, 4.04, 3.81, 3.64, 3.51, 3.40, 3.31], // 21
    [7.95, 5.72, 4.82, 4.31, 3.99, 3.76, 3.59, 3.45, 3.35, 3.26], // 22
    [7.88, 5.66, 4.76, 4.26, 3.94, 3.71, 3.54, 3.41, 3.30, 3.21], // 23
    [7.82, 5.61, 4.72, 4.22, 3.90, 3.67, 3.50, 3.36, 3.26, 3.17], // 24
    [7.77, 5.57, 4.68, 4.18, 3.85, 3.63, 3.46, 3.32, 3.22, 3.13], // 25
    [7.72, 5.53, 4.64, 4.14, 3.82, 3.59, 3.42, 3.29, 3.18, 3.09], // 26
    [7.68, 5.49, 4.60, 4.11, 3.78, 3.56, 3.39, 3.26, 3.15, 3.06], // 27
    [7.64, 5.45, 4.57, 4.07, 3.75, 3.53, 3.36, 3.23, 3.12, 3.03], // 28
    [7.60, 5.42, 4.54, 4.04, 3.73, 3.50, 3.33, 3.20, 3.09, 3.00], // 29
    [7.56, 5.39, 4.51, 4.02, 3.70, 3.47, 3.30, 3.17, 3.07, 2.98], // 30
    [7.31, 5.18, 4.31, 3.83, 3.51, 3.29, 3.12, 2.99, 2.89, 2.80], // 40
    [7.08, 4.98, 4.13, 3.65, 3.34, 3.12, 2.95, 2.82, 2.72, 2.63], // 60
    [6.85, 4.79, 3.95, 3.48, 3.17, 2.96, 2.79, 2.66, 2.56, 2.47], // 120
];
