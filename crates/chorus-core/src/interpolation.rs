/// Ordinary least-squares fit of `ys` on `xs`, evaluated at `target` and rounded to one
/// decimal place.
///
/// Returns NaN when the sequences are empty or `xs` has zero variance. Targets outside
/// the sampled range are extrapolated along the fitted line.
pub fn interpolate(xs: &[f64], ys: &[f64], target: f64) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return f64::NAN;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let (numerator, denominator) = xs[..n]
        .iter()
        .zip(&ys[..n])
        .fold((0.0, 0.0), |(num, den), (x, y)| {
            let dx = x - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        });

    let slope = numerator / denominator;
    let intercept = mean_y - slope * mean_x;

    round_to_tenth(intercept + slope * target)
}

/// Like [`interpolate`], but `None` whenever fewer than two points are given or the fit is
/// undefined.
pub fn try_interpolate(xs: &[f64], ys: &[f64], target: f64) -> Option<f64> {
    if xs.len().min(ys.len()) < 2 {
        return None;
    }
    let value = interpolate(xs, ys, target);
    value.is_finite().then_some(value)
}

/// Rounds half away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
