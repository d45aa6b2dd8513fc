use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::jwt::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::loans::dto::{
    ActiveLoanView, AdminLoanRow, DashboardResponse, Decision, DecisionRequest, LoanResponse,
    RequestLoanRequest,
};
use crate::loans::engine;
use crate::loans::repo::{Loan, LoanStatus};
use crate::loans::schedule::{self, DEFAULT_PROJECTION};
use crate::payments::ledger;
use crate::payments::repo::Payment;
use crate::state::AppState;
use crate::users::repo::{Role, User};

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/loans", post(request_loan))
        .route("/dashboard", get(dashboard))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/loans", get(list_loans))
        .route("/admin/loans/:id/decision", post(decide_loan))
}

async fn load_borrower(state: &AppState, auth: AuthUser) -> Result<User, ApiError> {
    if auth.role != Role::Client {
        return Err(ApiError::Forbidden);
    }
    User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or(ApiError::NotFound("user"))
}

#[instrument(skip(state))]
pub async fn request_loan(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<RequestLoanRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let borrower = load_borrower(&state, auth).await?;

    if Loan::find_live_by_borrower(&state.db, borrower.id)
        .await?
        .is_some()
    {
        return Err(ApiError::DuplicateActiveLoan);
    }

    let quote = engine::quote(
        &state.config.credit,
        borrower.employed,
        payload.principal,
        payload.installment_count,
        payload.frequency,
    )?;

    let loan = Loan::create(&state.db, borrower.id, &quote).await?;
    info!(
        loan_id = %loan.id,
        borrower_id = %borrower.id,
        principal = loan.principal,
        "loan requested"
    );
    Ok((StatusCode::CREATED, Json(LoanResponse::from(&loan))))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let borrower = load_borrower(&state, auth).await?;

    let live = Loan::find_live_by_borrower(&state.db, borrower.id).await?;
    let history = Loan::list_paid_by_borrower(&state.db, borrower.id).await?;

    let mut active_loan = None;
    let mut pending_loan = None;
    if let Some(loan) = live {
        match loan.status {
            LoanStatus::Active => {
                let total_paid = Payment::total_for_loan(&state.db, loan.id).await?;
                let progress =
                    ledger::progress(loan.installment_value, loan.installment_count, total_paid);
                let upcoming = schedule::project_upcoming(
                    loan.installment_value,
                    loan.installment_count,
                    loan.frequency,
                    loan.anchor_date(),
                    total_paid,
                    DEFAULT_PROJECTION,
                );
                active_loan = Some(ActiveLoanView {
                    loan: LoanResponse::from(&loan),
                    progress,
                    upcoming,
                });
            }
            _ => pending_loan = Some(LoanResponse::from(&loan)),
        }
    }

    Ok(Json(DashboardResponse {
        today: OffsetDateTime::now_utc().date(),
        credit_ceiling: state.config.credit.ceiling_for(borrower.employed),
        profile_complete: borrower.profile_complete(),
        active_loan,
        pending_loan,
        history: history.iter().map(LoanResponse::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn list_loans(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<AdminLoanRow>>, ApiError> {
    let loans = Loan::list(&state.db).await?;
    let users = User::list(&state.db).await?;
    let totals = Payment::totals_by_loan(&state.db).await?;

    let by_id: HashMap<Uuid, &User> = users.iter().map(|u| (u.id, u)).collect();

    let rows = loans
        .iter()
        .map(|loan| {
            let borrower = by_id.get(&loan.borrower_id);
            let total_paid = totals.get(&loan.id).copied().unwrap_or(0);
            let obligation = loan.installment_value * loan.installment_count as i64;
            AdminLoanRow {
                loan: LoanResponse::from(loan),
                borrower_name: borrower
                    .map(|u| u.full_name())
                    .unwrap_or_else(|| "unknown".into()),
                borrower_email: borrower.map(|u| u.email.clone()),
                total_paid,
                balance: obligation - total_paid,
            }
        })
        .collect();
    Ok(Json(rows))
}

/// Approving a loan requires the borrower to have a collector; one may be
/// assigned in the same request.
#[instrument(skip(state, payload))]
pub async fn decide_loan(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = Loan::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("loan"))?;
    if loan.status != LoanStatus::Pending {
        return Err(ApiError::Validation("loan is not pending".into()));
    }

    match payload.decision {
        Decision::Reject => {
            Loan::set_status(&state.db, loan.id, LoanStatus::Rejected).await?;
            info!(loan_id = %loan.id, "loan rejected");
            let rejected = Loan::find_by_id(&state.db, loan.id)
                .await?
                .ok_or(ApiError::NotFound("loan"))?;
            Ok(Json(LoanResponse::from(&rejected)))
        }
        Decision::Approve => {
            let borrower = User::find_by_id(&state.db, loan.borrower_id)
                .await?
                .ok_or(ApiError::NotFound("user"))?;

            if borrower.collector_id.is_none() {
                let email = payload.collector_email.as_deref().ok_or_else(|| {
                    ApiError::Validation("borrower has no assigned collector".into())
                })?;
                let collector = User::find_by_email(&state.db, email)
                    .await?
                    .filter(|u| u.role == Role::Employee)
                    .ok_or(ApiError::NotFound("collector"))?;
                User::assign_collector(&state.db, borrower.id, collector.id).await?;
            }

            let approved = Loan::approve(&state.db, loan.id, OffsetDateTime::now_utc()).await?;
            info!(loan_id = %loan.id, borrower_id = %borrower.id, "loan approved");
            Ok(Json(LoanResponse::from(&approved)))
        }
    }
}
