use actix_web::{HttpResponse, web};

use geofeed_shared::ApiResponse;
use geofeed_shared::dto::LocationQuery;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/v1/locations
pub async fn location_label(
    state: web::Data<AppState>,
    query: web::Query<LocationQuery>,
) -> AppResult<HttpResponse> {
    let label = state
        .locations
        .label_for(query.latitude, query.longitude)
        .await?
        .ok_or_else(|| AppError::NotFound("no label for this location".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(label)))
}
