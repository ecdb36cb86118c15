//! Invoice status lifecycle with validated transitions.
//!
//! Draft -> Pending -> Overdue -> Paid, with Pending -> Paid as a shortcut.
//! Paid is final.

use crate::error::{PayPilotError, Result};
use crate::types::InvoiceStatus;

/// Validate that a status transition is allowed.
///
/// Valid transitions:
/// - Draft -> Pending
/// - Pending -> Overdue (reminder scan)
/// - Pending -> Paid
/// - Overdue -> Paid
pub fn validate_transition(from: InvoiceStatus, to: InvoiceStatus) -> Result<()> {
    let valid = matches!(
        (from, to),
        (InvoiceStatus::Draft, InvoiceStatus::Pending)
            | (InvoiceStatus::Pending, InvoiceStatus::Overdue)
            | (InvoiceStatus::Pending, InvoiceStatus::Paid)
            | (InvoiceStatus::Overdue, InvoiceStatus::Paid)
    );

    if valid {
        Ok(())
    } else {
        Err(PayPilotError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
    ];

    // =====================================================================
    // Valid transitions
    // =====================================================================

    #[test]
    fn test_draft_to_pending() {
        assert!(validate_transition(InvoiceStatus::Draft, InvoiceStatus::Pending).is_ok());
    }

    #[test]
    fn test_pending_to_overdue() {
        assert!(validate_transition(InvoiceStatus::Pending, InvoiceStatus::Overdue).is_ok());
    }

    #[test]
    fn test_pending_to_paid() {
        assert!(validate_transition(InvoiceStatus::Pending, InvoiceStatus::Paid).is_ok());
    }

    #[test]
    fn test_overdue_to_paid() {
        assert!(validate_transition(InvoiceStatus::Overdue, InvoiceStatus::Paid).is_ok());
    }

    // =====================================================================
    // Invalid transitions
    // =====================================================================

    #[test]
    fn test_overdue_back_to_pending_rejected() {
        let err = validate_transition(InvoiceStatus::Overdue, InvoiceStatus::Pending).unwrap_err();
        assert!(matches!(
            err,
            PayPilotError::InvalidTransition {
                from: InvoiceStatus::Overdue,
                to: InvoiceStatus::Pending
            }
        ));
    }

    #[test]
    fn test_paid_is_final() {
        for to in ALL {
            assert!(validate_transition(InvoiceStatus::Paid, to).is_err());
        }
    }

    #[test]
    fn test_self_transitions_rejected() {
        for status in ALL {
            assert!(validate_transition(status, status).is_err());
        }
    }

    #[test]
    fn test_exactly_four_transitions_allowed() {
        let allowed = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| validate_transition(*from, *to).is_ok())
            .count();
        assert_eq!(allowed, 4);
    }
}
