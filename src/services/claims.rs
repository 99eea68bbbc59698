//! Claims service: filing and adjudicating claims on borrows

use crate::{
    error::{AppError, AppResult},
    models::{
        claim::{
            check_offered_amount, ClaimDecisionResponse, ClaimDetails, ClaimStatus, ClaimType,
            CreateClaim,
        },
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ClaimsService {
    repository: Repository,
}

impl ClaimsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Staff see every claim, readers their own
    pub async fn list(&self, caller: &UserClaims) -> AppResult<Vec<ClaimDetails>> {
        if caller.is_staff() {
            self.repository.claims.list_all().await
        } else {
            self.repository.claims.list_for_user(caller.user_id).await
        }
    }

    pub async fn get(&self, caller: &UserClaims, claim_id: i64) -> AppResult<ClaimDetails> {
        let claim = self.repository.claims.get_by_id(claim_id).await?;
        caller.require_owner_or_staff(claim.user_id, "Not allowed to view this claim")?;
        self.repository.claims.get_details(claim.id).await
    }

    /// File a claim on a borrow held by the caller (or any borrow, for staff)
    pub async fn file(&self, caller: &UserClaims, request: CreateClaim) -> AppResult<ClaimDetails> {
        let (borrow_id, raw_type) = match (request.borrow_id, request.claim_type.as_deref()) {
            (Some(borrow_id), Some(raw_type)) => (borrow_id, raw_type),
            _ => {
                return Err(AppError::Validation(
                    "borrow_id and type are required".to_string(),
                ))
            }
        };
        let claim_type: ClaimType = raw_type.parse().map_err(AppError::Validation)?;

        let borrow = self.repository.borrows.get_by_id(borrow_id).await?;
        caller.require_owner_or_staff(borrow.user_id, "Not allowed to create claim for this borrow")?;
        claim_type.check_borrow(&borrow)?;

        let book = self.repository.books.get_by_id(borrow.book_id).await?;
        let offered_amount = match request.offered_amount {
            Some(offered) => Some(check_offered_amount(offered, &borrow, book.lost_fine)?),
            None => claim_type.default_offered_amount(&borrow, book.lost_fine),
        };

        let claim_id = self
            .repository
            .claims
            .create(
                borrow.id,
                caller.user_id,
                claim_type,
                request.message.as_deref().unwrap_or_default(),
                offered_amount,
            )
            .await?;

        tracing::info!(
            "Claim {} ({}) filed on borrow {} by {}",
            claim_id,
            claim_type,
            borrow.id,
            caller.sub
        );
        self.repository.claims.get_details(claim_id).await
    }

    /// Delete a claim
    pub async fn delete(&self, claim_id: i64) -> AppResult<()> {
        self.repository.claims.delete(claim_id).await
    }

    /// Approve or decline a pending claim. Approval applies the
    /// claim to its borrow in the same transaction.
    pub async fn decide(
        &self,
        caller: &UserClaims,
        claim_id: i64,
        approve: bool,
    ) -> AppResult<ClaimDecisionResponse> {
        let claim = self.repository.claims.get_by_id(claim_id).await?;
        claim.ensure_pending()?;

        let detail = if approve {
            let borrow = self.repository.borrows.get_by_id(claim.borrow_id).await?;
            let closing = claim.closing_fine(&borrow).map(|fine| (&borrow, fine));

            let closed = self
                .repository
                .claims
                .resolve(claim.id, caller.user_id, ClaimStatus::Approved, closing)
                .await?;

            match (claim.claim_type, closed) {
                (ClaimType::Saw, true) => "saw-claim approved: fine marked paid and borrow returned",
                (ClaimType::Returned, true) => "returned-claim approved: borrow marked returned",
                (_, false) => "claim approved: borrow was already returned",
            }
        } else {
            self.repository
                .claims
                .resolve(claim.id, caller.user_id, ClaimStatus::Declined, None)
                .await?;
            "claim declined"
        };

        tracing::info!("Claim {} {} by {}", claim.id, if approve { "approved" } else { "declined" }, caller.sub);

        Ok(ClaimDecisionResponse {
            detail: detail.to_string(),
            claim: self.repository.claims.get_details(claim.id).await?,
        })
    }
}
