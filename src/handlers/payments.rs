use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::AppState;

/// Run the simulated charge for an order. The response carries the updated
/// order either way; a declined charge shows up as `payment_status:
/// "failed"` and may be retried.
async fn process_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .payments
        .process_payment(&user.user_id, order_id)
        .await?;
    Ok(success_response(order))
}

pub fn payments_routes() -> Router<Arc<AppState>> {
    Router::new().route("/orders/:order_id", post(process_payment))
}
