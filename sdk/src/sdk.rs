use std::sync::Arc;

use anchor_lang::prelude::Pubkey;

use crate::builder::{BatchBuilder, DepositRequest, Migration, WithdrawRequest};
use crate::classify::{self, Classification};
use crate::config::{MigrationConfig, SdkConfig};
use crate::error::Result;
use crate::gate::{self, BatchSubmitter};
use crate::ledger::{self, LockerSnapshot};
use crate::migration::MigrationLookup;
use crate::ops::{Batch, Operation};
use crate::reader::AccountReader;

/// Client entry point: reads state, builds batches, commits them through
/// the version gate.
///
/// A batch rejected as [`crate::SdkError::StaleVersion`] is never retried
/// here; callers rebuild it from a fresh read.
pub struct LockerSdk<R> {
    reader: R,
    config: SdkConfig,
    migration: Option<Migration>,
}

impl<R: AccountReader> LockerSdk<R> {
    pub fn new(reader: R, config: SdkConfig) -> Self {
        Self {
            reader,
            config,
            migration: None,
        }
    }

    pub fn with_migration(mut self, config: MigrationConfig, lookup: Arc<dyn MigrationLookup>) -> Self {
        self.migration = Some(Migration { config, lookup });
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    fn builder(&self) -> BatchBuilder<'_, R> {
        BatchBuilder::new(&self.reader, &self.config).with_migration(self.migration.as_ref())
    }

    pub async fn locker(&self, owner: &Pubkey) -> Result<LockerSnapshot> {
        ledger::read_locker(&self.reader, &self.config.program_id, owner).await
    }

    pub async fn classify(
        &self,
        mints: &[Pubkey],
        amounts: &[u64],
        created: &[Pubkey],
    ) -> Result<Classification> {
        classify::classify(&self.reader, mints, amounts, created).await
    }

    pub async fn init_locker_if_needed(
        &self,
        owner: &Pubkey,
        payer: &Pubkey,
    ) -> Result<Option<Operation>> {
        ledger::init_locker_if_needed(
            &self.reader,
            &self.config.program_id,
            owner,
            payer,
            self.config.locker_capacity,
        )
        .await
    }

    pub async fn deposit(&self, req: &DepositRequest) -> Result<Batch> {
        self.builder().deposit(req).await
    }

    pub async fn withdraw(&self, req: &WithdrawRequest) -> Result<Batch> {
        self.builder().withdraw(req).await
    }

    pub async fn submit<S: BatchSubmitter + ?Sized>(&self, submitter: &S, batch: &Batch) -> Result<()> {
        gate::commit(submitter, batch).await
    }
}
