//! Bounded fixpoint iteration.
//!
//! Every rewrite that may need to run more than once goes through [`fixpoint`], which stops when
//! a step stops changing its input or when the iteration cap is reached. Hitting the cap is not an
//! error: the last state is returned, flagged as unconverged, and a warning is logged. Callers
//! decide whether an unconverged state is usable.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixpoint {
    pub value: String,
    /// Number of steps that were executed.
    pub iterations: usize,
    /// `false` when the cap was reached while the value was still changing.
    pub converged: bool,
}

/// Applies `step` until it returns `None` (no change), returns an unchanged value, or `cap`
/// steps have run.
pub fn fixpoint<F>(name: &'static str, input: String, cap: usize, mut step: F) -> Fixpoint
where
    F: FnMut(&str) -> Option<String>,
{
    let mut value = input;
    for iteration in 1..=cap {
        match step(&value) {
            Some(next) if next != value => value = next,
            _ => {
                return Fixpoint {
                    value,
                    iterations: iteration,
                    converged: true,
                };
            }
        }
    }

    // The last allowed step may have landed on a fixed point.
    let converged = step(&value).is_none_or(|next| next == value);
    if !converged {
        tracing::warn!(rule = name, cap, "rewrite did not converge");
    }
    Fixpoint {
        value,
        iterations: cap,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_when_step_reports_no_change() {
        let out = fixpoint("trim-x", "xxxa".to_string(), 10, |s| {
            s.strip_prefix('x').map(str::to_string)
        });
        assert_eq!(out.value, "a");
        assert_eq!(out.iterations, 4);
        assert!(out.converged);
    }

    #[test]
    fn fixed_point_reached_on_the_last_step_counts_as_converged() {
        let out = fixpoint("trim-x", "xxa".to_string(), 2, |s| {
            s.strip_prefix('x').map(str::to_string)
        });
        assert_eq!(out.value, "a");
        assert_eq!(out.iterations, 2);
        assert!(out.converged);
    }

    #[test]
    fn cap_returns_last_state() {
        let out = fixpoint("grow", "a".to_string(), 3, |s| Some(format!("{s}a")));
        assert_eq!(out.value, "aaaa");
        assert_eq!(out.iterations, 3);
        assert!(!out.converged);
    }
}
