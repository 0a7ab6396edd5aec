//! The full repair of one diagram block: normalizer then specializer, re-run until stable.

use crate::RepairOptions;
use crate::fixpoint::fixpoint;
use crate::normalize::normalize_pass;
use crate::specialize::specialize_pass;

/// A block whose passes never settle within `max_passes` is returned unchanged, so that
/// `repair(repair(s)) == repair(s)` holds for every input.
pub fn repair(text: &str, options: &RepairOptions) -> String {
    let result = fixpoint("repair", text.to_string(), options.max_passes, |current| {
        let normalized = normalize_pass(current, options);
        let next = specialize_pass(&normalized, options);
        (next != current).then_some(next)
    });
    if !result.converged {
        tracing::warn!(
            passes = options.max_passes,
            "repair did not settle; block left as given"
        );
        return text.to_string();
    }
    tracing::trace!(iterations = result.iterations, "repair converged");
    result.value
}
