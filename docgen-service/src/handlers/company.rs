use crate::dtos::{CompanyResponse, UpdateCompanyRequest};
use crate::middleware::user_id::UserId;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;
use validator::Validate;

pub async fn get_company(
    State(state): State<AppState>,
    user_id: UserId,
) -> Result<impl IntoResponse, AppError> {
    // Created lazily on first authenticated access.
    let company = state.pipeline.company_for_user(&user_id.0).await?;
    Ok(Json(CompanyResponse::from(company)))
}

pub async fn update_company(
    State(state): State<AppState>,
    user_id: UserId,
    Json(payload): Json<UpdateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let company = state.pipeline.company_for_user(&user_id.0).await?;
    let updated = state
        .store
        .update_company(company.company_id, &payload.into())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    Ok(Json(CompanyResponse::from(updated)))
}
