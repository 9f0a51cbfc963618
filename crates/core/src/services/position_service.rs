use chrono::NaiveDate;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;
use crate::models::position::{PositionState, PositionTimeline, QUANTITY_EPSILON};
use crate::models::transaction::Transaction;

/// Reconstructs positions from the transaction event log.
///
/// Pure business logic — no I/O, no prices, no FX. Walks transactions in
/// execution order maintaining cumulative quantity and running total cost
/// under the average-cost method: every held unit shares one blended
/// purchase cost, updated on each buy; a sell removes cost proportionally
/// and leaves the per-unit cost of the remaining shares unchanged.
///
/// This is deliberately not FIFO/LIFO lot tracking — it is sufficient for
/// percentage-return reporting but produces different realized-gain figures
/// than tax-lot accounting.
pub struct PositionService;

impl PositionService {
    pub fn new() -> Self {
        Self
    }

    /// Replay an instrument's transactions into a piecewise-constant
    /// position timeline.
    ///
    /// `transactions` must belong to a single instrument and be sorted by
    /// execution timestamp (the ledger keeps them that way). A sell that
    /// exceeds the held quantity is a `LedgerInconsistency` error carrying
    /// the instrument and date — it is never clamped to zero.
    pub fn reconstruct(
        &self,
        isin: &str,
        transactions: &[&Transaction],
    ) -> Result<PositionTimeline, CoreError> {
        let mut states: Vec<PositionState> = Vec::with_capacity(transactions.len());
        let mut quantity = 0.0_f64;
        let mut cost_native = 0.0_f64;

        for transaction in transactions {
            let n = transaction.quantity;
            if n > 0.0 {
                cost_native += n * transaction.price + transaction.fee;
                quantity += n;
            } else {
                let sell = -n;
                if sell > quantity + QUANTITY_EPSILON {
                    return Err(CoreError::LedgerInconsistency {
                        isin: isin.to_uppercase(),
                        date: transaction.date(),
                        attempted: sell,
                        held: quantity,
                    });
                }
                // Average-cost method: remove cost proportionally, then
                // quantity. The per-unit cost of remaining shares is
                // unchanged by a sell.
                if sell >= quantity - QUANTITY_EPSILON {
                    // Full sell (within epsilon): close the position exactly
                    quantity = 0.0;
                    cost_native = 0.0;
                } else {
                    cost_native -= (cost_native / quantity) * sell;
                    quantity -= sell;
                }
            }

            let state = PositionState {
                date: transaction.date(),
                quantity,
                cost_native,
            };
            // One state per date: a later transaction on the same day
            // supersedes the earlier intraday state.
            match states.last_mut() {
                Some(last) if last.date == state.date => *last = state,
                _ => states.push(state),
            }
        }

        Ok(PositionTimeline::new(isin.to_uppercase(), states))
    }

    /// Position state of one instrument as of `date`, recomputed from its
    /// full transaction history.
    pub fn position_on(
        &self,
        ledger: &Ledger,
        isin: &str,
        date: NaiveDate,
    ) -> Result<Option<PositionState>, CoreError> {
        let transactions = ledger.transactions_for(isin);
        let timeline = self.reconstruct(isin, &transactions)?;
        Ok(timeline.state_on(date).copied())
    }

    /// Quantity held per instrument as of `date`, across the whole ledger.
    /// Only open positions (quantity above epsilon) are returned.
    pub fn holdings_on(
        &self,
        ledger: &Ledger,
        date: NaiveDate,
    ) -> Result<HashMap<String, f64>, CoreError> {
        let mut holdings = HashMap::new();
        for isin in ledger.transacted_isins() {
            let transactions = ledger.transactions_for(&isin);
            let timeline = self.reconstruct(&isin, &transactions)?;
            let quantity = timeline.quantity_on(date);
            if quantity > QUANTITY_EPSILON {
                holdings.insert(isin, quantity);
            }
        }
        Ok(holdings)
    }

    /// Check that appending `candidate` to the ledger would not drive any
    /// instrument's cumulative quantity negative. Used before committing an
    /// add, and after a removal, so the stored ledger never holds an
    /// inconsistent history.
    pub fn validate_with(
        &self,
        ledger: &Ledger,
        candidate: &Transaction,
    ) -> Result<(), CoreError> {
        let mut transactions = ledger.transactions_for(&candidate.isin);
        let pos = transactions.partition_point(|t| t.executed_at <= candidate.executed_at);
        transactions.insert(pos, candidate);
        self.reconstruct(&candidate.isin, &transactions)?;
        Ok(())
    }
}

impl Default for PositionService {
    fn default() -> Self {
        Self::new()
    }
}
