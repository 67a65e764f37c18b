//! Pairwise fold of accepted entries into one merged entry.

use crate::catalog::{CatalogEntry, CatalogId, CatalogStore, Disk};
use crate::combine::CombineError;

/// Folds `accepted` into a single entry on `output_disk`.
///
/// A single entry is its own result and nothing is merged or removed. For
/// two or more, the first pair is merged at sequence 1 and every further
/// entry is merged into the running result at the next sequence, the
/// superseded result being zapped right after. Once the fold is done the
/// inputs are zapped newest first, so positions of the entries still
/// waiting never shift.
pub fn merge_accepted<S: CatalogStore + ?Sized>(
    store: &mut S,
    id: CatalogId,
    accepted: &[CatalogEntry],
    output_disk: Disk,
) -> Result<CatalogEntry, CombineError> {
    let (first, second, rest) = match accepted {
        [] => {
            return Err(CombineError::NoInput {
                loaded: 0,
                rejected: 0,
            });
        }
        [only] => {
            tracing::debug!(catalog = %id, entry = %only, "Single input, nothing to merge");
            return Ok(only.clone());
        }
        [first, second, rest @ ..] => (first, second, rest),
    };

    let mut sequence = 1;
    let mut combined = store.merge(id, first, second, output_disk, sequence)?;
    for entry in rest {
        sequence += 1;
        let next = store.merge(id, &combined, entry, output_disk, sequence)?;
        store.zap(id, &combined)?;
        combined = next;
    }

    for entry in accepted.iter().rev() {
        store.zap(id, entry)?;
    }

    tracing::info!(
        catalog = %id,
        inputs = accepted.len(),
        merges = sequence,
        result = %combined,
        "Merged accepted spectra"
    );
    Ok(combined)
}
