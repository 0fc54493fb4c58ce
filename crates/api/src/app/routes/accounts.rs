use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use piggybank_core::AccountId;
use piggybank_infra::ServiceError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_accounts).put(update_account))
        .route("/:account_id", get(get_account))
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    user: UserContext,
) -> axum::response::Response {
    match services.accounts.get_accounts_by_user_id(user.user_id()).await {
        Ok(accounts) => {
            let accounts = accounts.iter().map(dto::AccountResponse::from).collect();
            (StatusCode::OK, Json(dto::AccountsResponse { accounts })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(account_id): Path<String>,
) -> axum::response::Response {
    let Ok(account_id) = account_id.parse::<AccountId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "account id must be an integer");
    };

    match services.accounts.get_account(account_id).await {
        Ok(Some(account)) => (StatusCode::OK, Json(dto::AccountResponse::from(&account))).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_account(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::UpdateAccountRequest>,
) -> axum::response::Response {
    match services
        .accounts
        .update_account_name(body.account_id, &body.account_name)
        .await
    {
        Ok(_) => StatusCode::OK.into_response(),
        Err(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
