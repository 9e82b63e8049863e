//! 均勻時間點規劃
//!
//! 把影片長度切成 `count + 1` 段，在每個分界點取樣，
//! 因此不會取到最開頭或最結尾。

/// 規劃取樣時間點
///
/// 公式：`interval = duration / (count + 1)`，`t_k = k * interval`，k = 1..=count。
/// 下一個時間點若已達到或超過 `duration` 就停止，避免 seek 到結尾之後。
#[must_use]
pub fn plan_timestamps(duration: f64, count: usize) -> Vec<f64> {
    if count == 0 || !duration.is_finite() || duration <= 0.0 {
        return Vec::new();
    }

    let interval = duration / (count as f64 + 1.0);

    (1..=count)
        .map(|k| k as f64 * interval)
        .take_while(|&timestamp| timestamp < duration)
        .collect()
}
