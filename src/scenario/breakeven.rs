use smallvec::SmallVec;

/// Zero crossings of a sampled P&L curve.
///
/// For each consecutive pair with y1 * y2 <= 0 and y1 != y2:
///   x* = x1 - y1 * (x2 - x1) / (y2 - y1)
///
/// Every crossing is kept, so multi-leg shaped curves yield several points.
/// A root sitting exactly on a grid point is matched by both neighbouring
/// pairs and reported once. Flat segments (y1 == y2) are skipped.
pub fn find_breakeven_points(prices: &[f64], pnl: &[f64]) -> SmallVec<[f64; 4]> {
    let mut points: SmallVec<[f64; 4]> = SmallVec::new();
    let n = prices.len().min(pnl.len());
    if n < 2 {
        return points;
    }

    for i in 0..n - 1 {
        let (x1, x2) = (prices[i], prices[i + 1]);
        let (y1, y2) = (pnl[i], pnl[i + 1]);

        if y1 * y2 > 0.0 || y1 == y2 {
            continue;
        }

        let x = x1 - y1 * (x2 - x1) / (y2 - y1);
        if !x.is_finite() {
            continue;
        }
        if points.last().is_some_and(|&prev| prev == x) {
            continue;
        }
        points.push(x);
    }

    points
}
