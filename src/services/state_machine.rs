//! Transaction status graph and per-edge guards.

use chrono::{DateTime, Utc};

use crate::domain::{Actor, PartyRole, PaymentStatus, Transaction, TransactionStatus};
use crate::error::{CoreError, CoreResult};
use crate::ports::TransactionPatch;
use crate::validation::{self, REASON_MAX_LEN};

use TransactionStatus::*;

/// Statuses reachable in one step from `from`.
pub fn allowed_targets(from: TransactionStatus) -> &'static [TransactionStatus] {
    match from {
        Pending => &[Confirmed, Cancelled],
        Confirmed => &[InProgress, Cancelled],
        InProgress => &[Completed, Disputed],
        Disputed => &[Completed, Cancelled],
        Completed | Cancelled => &[],
    }
}

pub fn is_edge(from: TransactionStatus, to: TransactionStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Validates moving `tx` to `to` on behalf of `actor` and records the
/// resulting field changes in `patch`.
///
/// `actor` must already be known to be a party or elevated. The edge is
/// checked before any guard. An elevated actor who is not a party may only
/// cancel or move a transaction out of `disputed`.
pub fn plan_transition(
    tx: &Transaction,
    actor: &Actor,
    to: TransactionStatus,
    reason: Option<&str>,
    now: DateTime<Utc>,
    patch: &mut TransactionPatch,
) -> CoreResult<()> {
    let from = tx.status;
    if !is_edge(from, to) {
        return Err(CoreError::InvalidTransition { from, to });
    }

    let reason = validation::clean_optional_text("reason", reason, REASON_MAX_LEN)?;

    // Non-parties (elevated actors) may only cancel or resolve a dispute.
    let role = tx.party_role(actor.user_id);
    if role.is_none() && to != Cancelled && from != Disputed {
        return Err(CoreError::NotAuthorized(format!(
            "only the buyer or seller can move a transaction to {}",
            to
        )));
    }

    match to {
        Confirmed => {
            if role != Some(PartyRole::Seller) {
                return Err(CoreError::NotAuthorized(
                    "only the seller can confirm a transaction".to_string(),
                ));
            }
        }
        Completed => {
            if tx.payment_status != PaymentStatus::Completed {
                return Err(CoreError::InvalidPrecondition(format!(
                    "payment status is {}, must be completed",
                    tx.payment_status
                )));
            }
            patch.completed_at = Some(now);
        }
        Disputed => {
            let Some(reason) = reason.clone() else {
                return Err(CoreError::InvalidPrecondition(
                    "a dispute requires a reason".to_string(),
                ));
            };
            patch.dispute_reason = Some(reason);
        }
        Cancelled => {
            patch.cancelled_at = Some(now);
            patch.cancellation_reason = reason.clone();
        }
        Pending | InProgress => {}
    }

    if from == Disputed {
        patch.dispute_resolution = reason;
        patch.dispute_resolved_at = Some(now);
        patch.dispute_resolved_by = Some(actor.user_id);
    }

    patch.expected_status = Some(from);
    patch.status = Some(to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Dispute, LogisticsPoint, PartyInfo, PaymentStatus, ReviewSlots, TransactionMetadata,
        TransactionType,
    };
    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    fn party() -> PartyInfo {
        PartyInfo {
            name: "Someone".to_string(),
            email: "someone@example.com".to_string(),
            phone: None,
            verification_level: "basic".to_string(),
        }
    }

    fn transaction(status: TransactionStatus, payment_status: PaymentStatus) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            status,
            transaction_type: TransactionType::Sale,
            original_price: Some(BigDecimal::from(10)),
            negotiated_price: None,
            final_price: BigDecimal::from(10),
            currency: "ARS".to_string(),
            quantity: 1,
            unit: None,
            payment_method: None,
            payment_status,
            payment_date: None,
            pickup: LogisticsPoint::default(),
            delivery: LogisticsPoint::default(),
            notes: None,
            whatsapp_thread_id: None,
            communication_log: Vec::new(),
            reviews: ReviewSlots::default(),
            dispute: Dispute::default(),
            metadata: TransactionMetadata {
                product_title: "Soja".to_string(),
                product_category: "granos".to_string(),
                price_type: "fixed".to_string(),
                seller: party(),
                buyer: party(),
            },
            created_at: now,
            updated_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    fn seller(tx: &Transaction) -> Actor {
        Actor::member(tx.seller_id)
    }

    #[test]
    fn every_pair_outside_the_table_is_rejected() {
        for from in TransactionStatus::ALL {
            for to in TransactionStatus::ALL {
                let tx = transaction(from, PaymentStatus::Completed);
                let mut patch = TransactionPatch::default();
                let result =
                    plan_transition(&tx, &seller(&tx), to, Some("reason"), Utc::now(), &mut patch);

                if is_edge(from, to) {
                    assert!(result.is_ok(), "{from} -> {to} should be allowed");
                    assert_eq!(patch.status, Some(to));
                    assert_eq!(patch.expected_status, Some(from));
                } else {
                    assert!(
                        matches!(result, Err(CoreError::InvalidTransition { .. })),
                        "{from} -> {to} should be rejected"
                    );
                    assert!(patch.is_empty());
                }
            }
        }
    }

    #[test]
    fn terminal_states_have_no_edges() {
        assert!(allowed_targets(Completed).is_empty());
        assert!(allowed_targets(Cancelled).is_empty());
    }

    #[test]
    fn buyer_cannot_confirm() {
        let tx = transaction(Pending, PaymentStatus::Pending);
        let mut patch = TransactionPatch::default();
        let result = plan_transition(
            &tx,
            &Actor::member(tx.buyer_id),
            Confirmed,
            None,
            Utc::now(),
            &mut patch,
        );
        assert!(matches!(result, Err(CoreError::NotAuthorized(_))));
    }

    #[test]
    fn admin_cannot_confirm_either() {
        let tx = transaction(Pending, PaymentStatus::Pending);
        let mut patch = TransactionPatch::default();
        let result = plan_transition(
            &tx,
            &Actor::admin(Uuid::new_v4()),
            Confirmed,
            None,
            Utc::now(),
            &mut patch,
        );
        assert!(matches!(result, Err(CoreError::NotAuthorized(_))));
    }

    #[test]
    fn non_party_admin_only_cancels_or_resolves() {
        let admin = Actor::admin(Uuid::new_v4());
        for (from, to) in [(Confirmed, InProgress), (InProgress, Completed), (InProgress, Disputed)] {
            let tx = transaction(from, PaymentStatus::Completed);
            let mut patch = TransactionPatch::default();
            let result = plan_transition(&tx, &admin, to, Some("reason"), Utc::now(), &mut patch);
            assert!(
                matches!(result, Err(CoreError::NotAuthorized(_))),
                "admin {from} -> {to} should be rejected"
            );
            assert!(patch.is_empty());
        }

        for (from, to) in [(Pending, Cancelled), (Confirmed, Cancelled), (Disputed, Completed)] {
            let tx = transaction(from, PaymentStatus::Completed);
            let mut patch = TransactionPatch::default();
            plan_transition(&tx, &admin, to, Some("reason"), Utc::now(), &mut patch)
                .unwrap_or_else(|e| panic!("admin {from} -> {to} should be allowed: {e}"));
            assert_eq!(patch.status, Some(to));
        }
    }

    #[test]
    fn completion_requires_completed_payment() {
        for from in [InProgress, Disputed] {
            for payment in [PaymentStatus::Pending, PaymentStatus::Partial, PaymentStatus::Refunded] {
                let tx = transaction(from, payment);
                let mut patch = TransactionPatch::default();
                let result =
                    plan_transition(&tx, &seller(&tx), Completed, None, Utc::now(), &mut patch);
                assert!(matches!(result, Err(CoreError::InvalidPrecondition(_))));
            }
        }
    }

    #[test]
    fn completion_stamps_completed_at() {
        let tx = transaction(InProgress, PaymentStatus::Completed);
        let now = Utc::now();
        let mut patch = TransactionPatch::default();
        plan_transition(&tx, &Actor::member(tx.buyer_id), Completed, None, now, &mut patch)
            .expect("completion allowed");
        assert_eq!(patch.completed_at, Some(now));
    }

    #[test]
    fn cancellation_records_reason_and_time() {
        let tx = transaction(Confirmed, PaymentStatus::Pending);
        let now = Utc::now();
        let mut patch = TransactionPatch::default();
        plan_transition(
            &tx,
            &Actor::member(tx.buyer_id),
            Cancelled,
            Some("  lluvia, no hay cosecha "),
            now,
            &mut patch,
        )
        .expect("cancel allowed");
        assert_eq!(patch.cancelled_at, Some(now));
        assert_eq!(patch.cancellation_reason.as_deref(), Some("lluvia, no hay cosecha"));
    }

    #[test]
    fn dispute_requires_reason() {
        let tx = transaction(InProgress, PaymentStatus::Pending);
        let mut patch = TransactionPatch::default();
        let result = plan_transition(&tx, &seller(&tx), Disputed, Some("  "), Utc::now(), &mut patch);
        assert!(matches!(result, Err(CoreError::InvalidPrecondition(_))));
    }

    #[test]
    fn leaving_dispute_records_resolution() {
        let tx = transaction(Disputed, PaymentStatus::Pending);
        let admin = Actor::admin(Uuid::new_v4());
        let mut patch = TransactionPatch::default();
        plan_transition(&tx, &admin, Cancelled, Some("refund agreed"), Utc::now(), &mut patch)
            .expect("resolution allowed");
        assert_eq!(patch.dispute_resolution.as_deref(), Some("refund agreed"));
        assert_eq!(patch.dispute_resolved_by, Some(admin.user_id));
        assert!(patch.dispute_resolved_at.is_some());
        assert!(patch.cancelled_at.is_some());
    }
}
