//! Bet history ordering and cursor paging.
//!
//! History is newest first by submission sequence. A page ends with a
//! cursor (the last wager id returned); passing it back as `before` resumes
//! right after it, so a client can restart a listing at any point.

use backlay_types::{BacklayError, Result, Wager, WagerId};
use serde::Serialize;

/// One page of a user's bet history.
#[derive(Debug, Clone, Serialize)]
pub struct BetHistoryPage {
    pub wagers: Vec<Wager>,
    /// Pass as `before` to fetch the next page. `None` on the last page.
    pub next_cursor: Option<WagerId>,
}

/// Sort wagers newest first.
pub fn newest_first(wagers: &mut [Wager]) {
    wagers.sort_by(|a, b| b.sequence.cmp(&a.sequence));
}

/// Cut a page out of a newest-first history.
///
/// # Errors
/// `ValidationError` for a zero `limit` or a cursor that is not in the
/// history.
pub fn page(history: &[Wager], before: Option<&WagerId>, limit: usize) -> Result<BetHistoryPage> {
    if limit == 0 {
        return Err(BacklayError::validation("page limit must be positive"));
    }
    let start = match before {
        None => 0,
        Some(cursor) => {
            history
                .iter()
                .position(|w| &w.id == cursor)
                .ok_or_else(|| BacklayError::validation(format!("unknown history cursor {cursor}")))?
                + 1
        }
    };
    let end = (start + limit).min(history.len());
    let wagers = history[start..end].to_vec();
    let next_cursor = if end < history.len() {
        wagers.last().map(|w| w.id)
    } else {
        None
    };
    Ok(BetHistoryPage {
        wagers,
        next_cursor,
    })
}

#[cfg(test)]
mod tests {
    use backlay_types::Side;
    use rust_decimal::Decimal;

    use super::*;

    fn history(n: u64) -> Vec<Wager> {
        let mut wagers: Vec<_> = (0..n)
            .map(|seq| Wager::dummy_for_user("alice", Side::Back, Decimal::TWO, Decimal::ONE, seq))
            .collect();
        newest_first(&mut wagers);
        wagers
    }

    #[test]
    fn newest_first_by_sequence() {
        let h = history(4);
        let seqs: Vec<_> = h.iter().map(|w| w.sequence).collect();
        assert_eq!(seqs, vec![3, 2, 1, 0]);
    }

    #[test]
    fn pages_cover_history_without_overlap() {
        let h = history(5);
        let first = page(&h, None, 2).unwrap();
        assert_eq!(first.wagers.len(), 2);
        let second = page(&h, first.next_cursor.as_ref(), 2).unwrap();
        let third = page(&h, second.next_cursor.as_ref(), 2).unwrap();
        assert_eq!(third.wagers.len(), 1);
        assert!(third.next_cursor.is_none());

        let seqs: Vec<_> = [first, second, third]
            .iter()
            .flat_map(|p| p.wagers.iter().map(|w| w.sequence))
            .collect();
        assert_eq!(seqs, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn exact_fit_has_no_cursor() {
        let h = history(2);
        assert!(page(&h, None, 2).unwrap().next_cursor.is_none());
        assert!(page(&[], None, 10).unwrap().wagers.is_empty());
    }

    #[test]
    fn bad_requests_rejected() {
        let h = history(2);
        assert!(page(&h, None, 0).is_err());
        assert!(matches!(
            page(&h, Some(&WagerId::new()), 5),
            Err(BacklayError::ValidationError { .. })
        ));
    }
}
