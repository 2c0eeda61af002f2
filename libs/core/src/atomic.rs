//! All-or-nothing execution over the registry and ledger.
//!
//! Single pair operations mutate the ledger before their guards fire (the
//! optimistic transfers of a swap, the share burn of a withdrawal), and
//! multi-step flows can fail halfway. `transactional` brackets an operation
//! with snapshots of both state stores and rewinds them on any error, so
//! callers observe either the full effect or none of it.

use crate::error::PairError;
use crate::ledger::SnapshotLedger;
use crate::registry::PairRegistry;
use tracing::error;

pub fn transactional<T, E, F>(
    registry: &PairRegistry,
    ledger: &dyn SnapshotLedger,
    op: F,
) -> Result<T, E>
where
    E: From<PairError> + std::fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    let registry_snapshot = registry.snapshot()?;
    let ledger_snapshot = ledger.snapshot();

    match op() {
        Ok(value) => Ok(value),
        Err(err) => {
            error!(%err, "operation failed, rewinding state");
            if let Err(restore_err) = registry.restore(&registry_snapshot) {
                error!(%restore_err, "registry restore failed after rollback");
            }
            if let Err(restore_err) = ledger.restore(&ledger_snapshot) {
                error!(%restore_err, "ledger restore failed after rollback");
            }
            Err(err)
        }
    }
}
