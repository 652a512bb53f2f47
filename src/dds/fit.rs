//! Endpoint fitting shared by the BC6H and BC7 encoders.

const POWER_ITERATIONS: usize = 8;

/// A fitted segment through a point set.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Line<const N: usize> {
    pub lo: [f32; N],
    pub hi: [f32; N],
    /// Squared distance of the points from the fitted axis.
    pub residual: f32,
}

/// Fit a line through `points` along their principal axis. `lo` and `hi`
/// are the extreme projections onto it.
pub(crate) fn principal_line<const N: usize>(points: &[[f32; N]]) -> Line<N> {
    let mut mean = [0.0f32; N];
    if points.is_empty() {
        return Line {
            lo: mean,
            hi: mean,
            residual: 0.0,
        };
    }
    for p in points {
        for c in 0..N {
            mean[c] += p[c];
        }
    }
    let n = points.len() as f32;
    mean.iter_mut().for_each(|m| *m /= n);

    let mut cov = [[0.0f32; N]; N];
    let mut spread = 0.0f32;
    // seed with the point farthest from the mean; it always has a component
    // along the dominant axis
    let mut axis = [0.0f32; N];
    let mut farthest = 0.0f32;
    for p in points {
        let d: [f32; N] = core::array::from_fn(|c| p[c] - mean[c]);
        let len: f32 = d.iter().map(|x| x * x).sum();
        spread += len;
        if len > farthest {
            farthest = len;
            axis = d;
        }
        for i in 0..N {
            for j in 0..N {
                cov[i][j] += d[i] * d[j];
            }
        }
    }
    if !normalize(&mut axis) {
        return Line {
            lo: mean,
            hi: mean,
            residual: 0.0,
        };
    }
    for _ in 0..POWER_ITERATIONS {
        let mut next = [0.0f32; N];
        for i in 0..N {
            for j in 0..N {
                next[i] += cov[i][j] * axis[j];
            }
        }
        if !normalize(&mut next) {
            break;
        }
        axis = next;
    }

    let (mut tmin, mut tmax) = (f32::MAX, f32::MIN);
    let mut along = 0.0f32;
    for p in points {
        let t: f32 = (0..N).map(|c| (p[c] - mean[c]) * axis[c]).sum();
        along += t * t;
        tmin = tmin.min(t);
        tmax = tmax.max(t);
    }
    let mut lo = mean;
    let mut hi = mean;
    for c in 0..N {
        lo[c] += tmin * axis[c];
        hi[c] += tmax * axis[c];
    }
    Line {
        lo,
        hi,
        residual: (spread - along).max(0.0),
    }
}

/// Least-squares endpoints for fixed interpolation weights (each in `[0, 1]`).
///
/// Returns `None` when the system is degenerate (all weights equal).
pub(crate) fn least_squares_endpoints<const N: usize>(
    points: &[[f32; N]],
    weights: &[f32],
) -> Option<([f32; N], [f32; N])> {
    let (mut a, mut b, mut c) = (0.0f32, 0.0f32, 0.0f32);
    let mut rhs0 = [0.0f32; N];
    let mut rhs1 = [0.0f32; N];
    for (p, &w) in points.iter().zip(weights) {
        let u = 1.0 - w;
        a += u * u;
        b += u * w;
        c += w * w;
        for ch in 0..N {
            rhs0[ch] += u * p[ch];
            rhs1[ch] += w * p[ch];
        }
    }
    let det = a * c - b * b;
    if det.abs() < 1e-6 {
        return None;
    }
    let mut e0 = [0.0f32; N];
    let mut e1 = [0.0f32; N];
    for ch in 0..N {
        e0[ch] = (c * rhs0[ch] - b * rhs1[ch]) / det;
        e1[ch] = (a * rhs1[ch] - b * rhs0[ch]) / det;
    }
    Some((e0, e1))
}

fn normalize<const N: usize>(v: &mut [f32; N]) -> bool {
    let len = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !len.is_finite() || len < 1e-9 {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= len);
    true
}
