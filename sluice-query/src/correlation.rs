// Pairwise field correlation over top-value frequency lists

use sluice_core::{CorrelationEntry, FieldStatistics};

/// Pearson correlation between every unordered pair of fields.
///
/// Each field's series is its top-value list: the value itself when it is a
/// JSON number, otherwise its occurrence count. Pairs are truncated to the
/// shorter series. This approximates per-record alignment; it does not
/// compute it.
pub struct CorrelationEngine;

impl CorrelationEngine {
    /// Below this, `1 - r²` is treated as this value in the significance
    const MIN_RESIDUAL: f64 = 1e-12;

    pub fn series(stats: &FieldStatistics) -> Vec<f64> {
        stats
            .top_values
            .iter()
            .map(|vc| vc.value.as_f64().unwrap_or(vc.count as f64))
            .collect()
    }

    /// Pearson's r over the first `min(x.len(), y.len())` points.
    /// 0 when either variance term is 0 or fewer than two points remain.
    pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
        let n = x.len().min(y.len());
        if n < 2 {
            return 0.0;
        }
        let (x, y) = (&x[..n], &y[..n]);
        let nf = n as f64;

        let sum_x: f64 = x.iter().sum();
        let sum_y: f64 = y.iter().sum();
        let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
        let sum_x2: f64 = x.iter().map(|a| a * a).sum();
        let sum_y2: f64 = y.iter().map(|b| b * b).sum();

        let numerator = sum_xy - sum_x * sum_y / nf;
        let var_x = sum_x2 - sum_x * sum_x / nf;
        let var_y = sum_y2 - sum_y * sum_y / nf;

        // EDGE CASE: rounding can leave a tiny negative variance for constant series
        if var_x <= 0.0 || var_y <= 0.0 {
            return 0.0;
        }

        let r = numerator / (var_x * var_y).sqrt();
        if r.is_finite() {
            r.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }

    /// `|r| * sqrt((n - 2) / (1 - r²))`, 0 for `n <= 2`.
    pub fn significance(r: f64, n: usize) -> f64 {
        if n <= 2 {
            return 0.0;
        }
        let residual = (1.0 - r * r).max(Self::MIN_RESIDUAL);
        r.abs() * ((n - 2) as f64 / residual).sqrt()
    }

    /// Entries with `|r| >= threshold`, sorted by `|r|` descending then by
    /// field names. `field_a < field_b` in every entry.
    pub fn correlate<'a, I>(stats: I, threshold: f64) -> Vec<CorrelationEntry>
    where
        I: IntoIterator<Item = &'a FieldStatistics>,
    {
        let mut fields: Vec<(&str, Vec<f64>)> = stats
            .into_iter()
            .map(|s| (s.path.as_str(), Self::series(s)))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        fields.dedup_by(|a, b| a.0 == b.0);

        // EDGE CASE: zero or one field has no pairs
        if fields.len() < 2 {
            return Vec::new();
        }

        let mut entries = Vec::new();
        for (i, (field_a, xs)) in fields.iter().enumerate() {
            for (field_b, ys) in &fields[i + 1..] {
                let r = Self::pearson(xs, ys);
                if r.abs() < threshold {
                    continue;
                }
                let n = xs.len().min(ys.len());
                entries.push(CorrelationEntry {
                    field_a: field_a.to_string(),
                    field_b: field_b.to_string(),
                    correlation: r,
                    significance: Self::significance(r, n),
                });
            }
        }

        entries.sort_by(|a, b| {
            b.correlation
                .abs()
                .total_cmp(&a.correlation.abs())
                .then_with(|| a.field_a.cmp(&b.field_a))
                .then_with(|| a.field_b.cmp(&b.field_b))
        });
        entries
    }
}
