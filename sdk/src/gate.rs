//! Commit-time consistency gate.
//!
//! Builders read the locker version and embed it in the ledger operation.
//! The program rejects the batch if the version moved before commit; this
//! module turns that rejection into [`SdkError::StaleVersion`] so callers
//! know to rebuild from a fresh read.

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use casier::errors::CasierError;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{Result, SdkError};
use crate::ops::Batch;
use crate::pda;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("instruction {index} failed in program {program_id} with code {code}")]
    Program {
        index: usize,
        program_id: Pubkey,
        code: u32,
    },
    #[error("missing signature from {0}")]
    MissingSigner(Pubkey),
    #[error("transport: {0}")]
    Transport(String),
}

/// Signs and sends a batch as a single transaction.
#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    async fn submit(&self, batch: &Batch) -> std::result::Result<(), SubmitError>;
}

pub fn is_stale_version(err: &SubmitError, program_id: &Pubkey) -> bool {
    matches!(
        err,
        SubmitError::Program { program_id: p, code, .. }
            if p == program_id && *code == u32::from(CasierError::StaleLockerVersion)
    )
}

/// Submits `batch`, mapping a version-gate rejection to
/// [`SdkError::StaleVersion`].
pub async fn commit<S: BatchSubmitter + ?Sized>(submitter: &S, batch: &Batch) -> Result<()> {
    let locker = pda::locker_address(&batch.program_id, &batch.locker_owner);
    match submitter.submit(batch).await {
        Ok(()) => {
            info!(
                %locker,
                ops = batch.len(),
                version = ?batch.expected_version(),
                "batch committed"
            );
            Ok(())
        }
        Err(err) if is_stale_version(&err, &batch.program_id) => {
            let expected = batch.expected_version().unwrap_or_default();
            warn!(%locker, expected, "locker version moved, batch rejected");
            Err(SdkError::StaleVersion { locker, expected })
        }
        Err(err) => {
            warn!(%locker, error = %err, "batch rejected");
            Err(SdkError::Rejected(err))
        }
    }
}
