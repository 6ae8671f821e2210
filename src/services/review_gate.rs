//! One review per party per completed transaction.

use chrono::{DateTime, Utc};

use crate::domain::{Actor, PartyReview, Transaction, TransactionStatus};
use crate::error::{CoreError, CoreResult};
use crate::ports::TransactionPatch;
use crate::validation::{self, REVIEW_MAX_LEN};

/// Fails with `InvalidReviewRating` for anything outside 1..=5.
pub fn check_rating(rating: i32) -> CoreResult<i16> {
    validation::validate_rating(rating).map_err(|_| CoreError::InvalidReviewRating(rating))?;
    i16::try_from(rating).map_err(|_| CoreError::InvalidReviewRating(rating))
}

/// Builds the guarded write that fills the actor's review slot.
pub fn plan_review(
    tx: &Transaction,
    actor: &Actor,
    rating: i32,
    text: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<TransactionPatch> {
    let rating = check_rating(rating)?;

    let role = tx.party_role(actor.user_id).ok_or_else(|| {
        CoreError::NotAuthorized("only the buyer or seller can review".to_string())
    })?;

    if tx.status != TransactionStatus::Completed {
        return Err(CoreError::TransactionNotCompleted);
    }

    if tx.reviews.slot(role).is_some() {
        return Err(CoreError::ReviewAlreadyExists);
    }

    let text = validation::clean_optional_text("review", text, REVIEW_MAX_LEN)?;

    Ok(TransactionPatch {
        expected_status: Some(TransactionStatus::Completed),
        review: Some((
            role,
            PartyReview {
                rating,
                text,
                reviewed_at: now,
            },
        )),
        ..Default::default()
    })
}
