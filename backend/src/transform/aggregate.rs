//! Key metrics and chart aggregates over a [`FilteredView`].
//!
//! Empty inputs never produce NaN or an error: the average resolves to
//! [`AverageBilling::Unavailable`] and the chart series come back empty.

use std::collections::{BTreeMap, HashMap};

use crate::models::{AverageBilling, DiagnosisCount, FilteredView, MonthlyCount, Summary};

/// Patient count and mean billing amount.
///
/// Each amount is scaled by `1/n` before summing, so the mean of finite
/// amounts stays finite.
pub fn summarize(view: &FilteredView<'_>) -> Summary {
    let amounts: Vec<f64> = view.iter().filter_map(|r| r.billing_amount).collect();

    let average_billing = if amounts.is_empty() {
        AverageBilling::Unavailable
    } else {
        let n = amounts.len() as f64;
        let mean: f64 = amounts.iter().map(|amount| amount / n).sum();
        if mean.is_finite() {
            AverageBilling::Amount(mean)
        } else {
            AverageBilling::Unavailable
        }
    };

    Summary {
        patient_count: view.len(),
        average_billing,
    }
}

/// Rows per diagnosis, most frequent first.
///
/// Equal counts keep the order in which each diagnosis first appears in the
/// view. Rows without a diagnosis are not counted.
pub fn diagnosis_frequency(view: &FilteredView<'_>) -> Vec<DiagnosisCount> {
    let mut counts: Vec<DiagnosisCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for diagnosis in view.iter().filter_map(|r| r.diagnosis.as_deref()) {
        match positions.get(diagnosis) {
            Some(&idx) => counts[idx].count += 1,
            None => {
                positions.insert(diagnosis, counts.len());
                counts.push(DiagnosisCount {
                    diagnosis: diagnosis.to_string(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort: ties stay in first-encounter order
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Rows per admission month, oldest month first.
pub fn monthly_admissions(view: &FilteredView<'_>) -> Vec<MonthlyCount> {
    let mut by_month = BTreeMap::new();
    for month in view.iter().filter_map(|r| r.admission_month) {
        *by_month.entry(month).or_insert(0_usize) += 1;
    }

    by_month
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}
