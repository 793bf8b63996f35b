use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Food;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFoodRequest {
    pub name: String,
    pub description: String,
    /// Minor currency units (cents).
    pub price: i64,
    pub category: String,
    pub image_url: String,
    pub is_vegetarian: bool,
    pub is_available: bool,
    pub preparation_minutes: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFoodRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_vegetarian: Option<bool>,
    pub is_available: Option<bool>,
    pub preparation_minutes: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct FoodList {
    pub items: Vec<Food>,
}

#[derive(Serialize, ToSchema)]
pub struct CategoryList {
    pub categories: Vec<String>,
}
