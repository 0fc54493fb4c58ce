use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use piggybank_banking::Currency;
use piggybank_core::AccountId;
use piggybank_infra::{CreateTransaction, ServiceError};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_transaction))
        .route("/:account_id", get(list_transactions))
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(account_id): Path<String>,
    Query(query): Query<dto::TransactionsQuery>,
) -> axum::response::Response {
    let Ok(account_id) = account_id.parse::<AccountId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "account id must be an integer");
    };

    match services.transactions.get_transactions(query.limit(), account_id).await {
        Ok(items) => {
            let transactions = items.into_iter().map(dto::TransactionResponse::from).collect();
            (StatusCode::OK, Json(dto::TransactionsResponse { transactions })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateTransactionRequest>,
) -> axum::response::Response {
    let currency = match body.currency.parse::<Currency>() {
        Ok(c) => c,
        Err(e) => return errors::service_error_to_response(ServiceError::Conversion(e)),
    };

    let request = CreateTransaction {
        sender_account_id: body.sender_account_id,
        receiver_account_id: body.receiver_account_id,
        amount: body.amount,
        currency,
        description: body.description,
    };

    match services.transactions.create_transaction(request).await {
        Ok(t) => (StatusCode::OK, Json(dto::TransactionResponse::from(t))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
