//! Double-entry checks applied to every journal before it is persisted.

use rust_decimal::Decimal;

use super::error::PostingError;
use super::types::{JournalLine, JournalTotals};

/// Validates that a journal is well formed and balanced.
///
/// - at least one line
/// - every line has exactly one positive side
/// - line numbers are unique
/// - total debits equal total credits exactly
///
/// Returns the journal totals on success.
pub fn validate_journal(lines: &[JournalLine]) -> Result<JournalTotals, PostingError> {
    if lines.is_empty() {
        return Err(PostingError::EmptyJournal);
    }

    let mut seen = std::collections::HashSet::with_capacity(lines.len());
    for line in lines {
        validate_line(line)?;
        if !seen.insert(line.line_number) {
            return Err(PostingError::Internal(format!(
                "duplicate journal line number {}",
                line.line_number
            )));
        }
    }

    let totals = JournalTotals::of(lines);
    if !totals.is_balanced() {
        return Err(PostingError::UnbalancedPosting {
            debit: totals.total_debit,
            credit: totals.total_credit,
        });
    }

    Ok(totals)
}

fn validate_line(line: &JournalLine) -> Result<(), PostingError> {
    let one_sided = (line.debit > Decimal::ZERO && line.credit.is_zero())
        || (line.credit > Decimal::ZERO && line.debit.is_zero());
    if one_sided {
        Ok(())
    } else {
        Err(PostingError::Internal(format!(
            "journal line {} must carry exactly one positive side (debit {}, credit {})",
            line.line_number, line.debit, line.credit
        )))
    }
}
