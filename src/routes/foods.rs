use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::foods::{CategoryList, CreateFoodRequest, FoodList, UpdateFoodRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Food,
    response::ApiResponse,
    routes::params::FoodQuery,
    services::food_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_foods).post(create_food))
        .route("/categories", get(list_categories))
        .route("/{id}", get(get_food).put(update_food))
}

#[utoipa::path(
    get,
    path = "/api/foods",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("vegetarian" = Option<bool>, Query, description = "Filter by vegetarian flag")
    ),
    responses(
        (status = 200, description = "List available foods", body = ApiResponse<FoodList>)
    ),
    tag = "Foods"
)]
pub async fn list_foods(
    State(state): State<AppState>,
    Query(query): Query<FoodQuery>,
) -> AppResult<Json<ApiResponse<FoodList>>> {
    let resp = food_service::list_foods(&state.pool, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/foods/categories",
    responses(
        (status = 200, description = "Distinct categories across the catalog", body = ApiResponse<CategoryList>)
    ),
    tag = "Foods"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = food_service::list_categories(&state.pool).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/foods/{id}",
    params(
        ("id" = Uuid, Path, description = "Food ID")
    ),
    responses(
        (status = 200, description = "Get food", body = ApiResponse<Food>),
        (status = 404, description = "Food not found"),
    ),
    tag = "Foods"
)]
pub async fn get_food(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Food>>> {
    let resp = food_service::get_food(&state.pool, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/foods",
    request_body = CreateFoodRequest,
    responses(
        (status = 201, description = "Create food", body = ApiResponse<Food>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Foods"
)]
pub async fn create_food(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateFoodRequest>,
) -> AppResult<Json<ApiResponse<Food>>> {
    let resp = food_service::create_food(&state.pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/foods/{id}",
    params(
        ("id" = Uuid, Path, description = "Food ID")
    ),
    request_body = UpdateFoodRequest,
    responses(
        (status = 200, description = "Updated food", body = ApiResponse<Food>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Food not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Foods"
)]
pub async fn update_food(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFoodRequest>,
) -> AppResult<Json<ApiResponse<Food>>> {
    let resp = food_service::update_food(&state.pool, &user, id, payload).await?;
    Ok(Json(resp))
}
