//! Reversal entries for posted vouchers.
//!
//! A reversal never edits the original: it is a new voucher whose journal
//! carries the original lines with debit and credit swapped.

use crate::ledger::validation::validate_journal;
use crate::ledger::{JournalLine, JournalTotals, PostingError};

/// Journal lines of a reversal, ready to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalOutput {
    /// Swapped lines, same order and amounts as the original.
    pub lines: Vec<JournalLine>,
    /// Totals of the swapped lines.
    pub totals: JournalTotals,
    /// Narration for the reversal voucher.
    pub narration: String,
}

/// Stateless service for creating reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Swaps debit and credit on every line.
    ///
    /// Line numbers, accounts and amounts are preserved; the narration is
    /// prefixed with `Reversal: `.
    #[must_use]
    pub fn reverse_lines(original: &[JournalLine]) -> Vec<JournalLine> {
        original
            .iter()
            .map(|line| JournalLine {
                line_number: line.line_number,
                account_id: line.account_id,
                debit: line.credit,
                credit: line.debit,
                narration: Some(format!(
                    "Reversal: {}",
                    line.narration.as_deref().unwrap_or_default()
                )),
            })
            .collect()
    }

    /// Builds the reversal journal for a posted voucher.
    ///
    /// The original journal is re-validated first; a posted journal that
    /// does not balance is reported rather than mirrored.
    pub fn create_reversing_entries(
        original_number: &str,
        original: &[JournalLine],
        reason: &str,
    ) -> Result<ReversalOutput, PostingError> {
        validate_journal(original)?;
        let lines = Self::reverse_lines(original);
        let totals = validate_journal(&lines)?;
        Ok(ReversalOutput {
            lines,
            totals,
            narration: format!("Reversal of voucher {original_number}. Reason: {reason}"),
        })
    }
}
