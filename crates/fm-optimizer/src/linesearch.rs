//! Bounded derivative-free scalar minimization.

use fm_types::Interrupt;

const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Golden-section search for the minimum of `f` on `[lo, hi]` with a hard
/// evaluation budget.
///
/// `f` is an expensive black box; interrupts (cancellation, oracle
/// failure) propagate untouched. Returns the best `(alpha, f(alpha))`
/// observed, which for a unimodal `f` brackets the interval minimum.
/// A zero budget evaluates nothing and reports an infinite cost at `lo`.
pub fn golden_section<F>(
    mut f: F,
    lo: f64,
    hi: f64,
    max_evals: usize,
) -> Result<(f64, f64), Interrupt>
where
    F: FnMut(f64) -> Result<f64, Interrupt>,
{
    if max_evals == 0 {
        return Ok((lo, f64::INFINITY));
    }
    if hi <= lo {
        let cost = f(lo)?;
        return Ok((lo, cost));
    }
    if max_evals < 2 {
        let mid = 0.5 * (lo + hi);
        let cost = f(mid)?;
        return Ok((mid, cost));
    }

    let mut a = lo;
    let mut b = hi;
    let mut c = b - (b - a) * INV_PHI;
    let mut d = a + (b - a) * INV_PHI;
    let mut fc = f(c)?;
    let mut fd = f(d)?;
    let mut evals = 2;

    let (mut best_alpha, mut best_cost) = if fc <= fd { (c, fc) } else { (d, fd) };

    while evals < max_evals {
        if fc <= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - (b - a) * INV_PHI;
            fc = f(c)?;
            if fc < best_cost {
                best_cost = fc;
                best_alpha = c;
            }
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + (b - a) * INV_PHI;
            fd = f(d)?;
            if fd < best_cost {
                best_cost = fd;
                best_alpha = d;
            }
        }
        evals += 1;
    }

    Ok((best_alpha, best_cost))
}
