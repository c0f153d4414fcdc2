//! Finalises a built transaction according to the caller's execution mode.
//!
//! Both strategies return the same [`ExecutionResult`] shape, so callers never
//! branch on the mode once a strategy is chosen. Failures are caught here, once,
//! and turned into an error result rather than propagated.

use async_trait::async_trait;
use tracing::{error, info};

use crate::blockchain::{
    client::LedgerClient,
    models::*,
    transaction::Transaction,
};

pub type Describe = dyn Fn(&TransactionReceipt) -> String + Send + Sync;

#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    async fn execute(
        &self,
        tx: Transaction,
        client: &dyn LedgerClient,
        context: &ExecutionContext,
        describe: &Describe,
    ) -> LedgerResult<ExecutionResult>;
}

/// Freeze, sign with the operator, submit, await the receipt.
pub struct AutonomousStrategy;

/// Freeze only and hand back the unsigned bytes. Never touches the network.
pub struct ReturnBytesStrategy;

/// Freezes if needed, signs if unsigned, submits and waits for the receipt.
///
/// Safe to call on a transaction that was already frozen or signed elsewhere.
pub async fn sign_and_execute(
    tx: &mut Transaction,
    client: &dyn LedgerClient,
    payer: AccountId,
) -> LedgerResult<TransactionReceipt> {
    if !tx.is_frozen() {
        client.freeze(tx, payer)?;
    }
    if !tx.is_signed() {
        client.sign_with_operator(tx)?;
    }
    let response = client.submit(tx).await?;
    client.get_receipt(&response).await
}

#[async_trait]
impl ExecutionStrategy for AutonomousStrategy {
    async fn execute(
        &self,
        mut tx: Transaction,
        client: &dyn LedgerClient,
        _context: &ExecutionContext,
        describe: &Describe,
    ) -> LedgerResult<ExecutionResult> {
        let payer = client
            .operator_account_id()
            .ok_or_else(|| LedgerError::resolution("Autonomous execution requires a client operator"))?;
        let receipt = sign_and_execute(&mut tx, client, payer).await?;
        Ok(ExecutionResult {
            human_message: describe(&receipt),
            raw: RawResponse::Receipt(receipt),
        })
    }
}

#[async_trait]
impl ExecutionStrategy for ReturnBytesStrategy {
    async fn execute(
        &self,
        mut tx: Transaction,
        client: &dyn LedgerClient,
        context: &ExecutionContext,
        _describe: &Describe,
    ) -> LedgerResult<ExecutionResult> {
        let payer = context
            .account_id
            .or_else(|| client.operator_account_id())
            .ok_or_else(|| {
                LedgerError::resolution("Returning transaction bytes requires a context account or operator")
            })?;
        if !tx.is_frozen() {
            client.freeze(&mut tx, payer)?;
        }
        let bytes = tx.to_bytes()?;
        let transaction_id = tx
            .transaction_id()
            .map(|id| id.to_string())
            .unwrap_or_default();
        info!("Prepared unsigned {} {}", tx.body().name(), transaction_id);
        Ok(ExecutionResult {
            human_message: format!(
                "Transaction {} prepared. Sign the returned bytes and submit them to the network.",
                transaction_id
            ),
            raw: RawResponse::Bytes { bytes, transaction_id },
        })
    }
}

pub fn strategy_for(mode: ExecutionMode) -> Box<dyn ExecutionStrategy> {
    match mode {
        ExecutionMode::Autonomous => Box::new(AutonomousStrategy),
        ExecutionMode::ReturnBytes => Box::new(ReturnBytesStrategy),
    }
}

/// Runs `tx` through the strategy for `context.mode`. Never fails: errors become
/// an error-shaped [`ExecutionResult`] carrying the protocol status verbatim.
pub async fn handle_transaction(
    tx: Transaction,
    client: &dyn LedgerClient,
    context: &ExecutionContext,
    describe: &Describe,
) -> ExecutionResult {
    let name = tx.body().name();
    match strategy_for(context.mode)
        .execute(tx, client, context, describe)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            error!("{} failed: {}", name, e);
            ExecutionResult::from_error(&e)
        }
    }
}
