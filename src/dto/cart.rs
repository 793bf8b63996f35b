use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::CartItem;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub food_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub food_id: Uuid,
    /// Zero (or below) removes the line.
    pub quantity: i32,
}

/// A cart as callers see it. A user without a cart gets the empty shape,
/// never an error.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartDto {
    pub items: Vec<CartItem>,
    pub total_amount: i64,
}

impl CartDto {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_amount: 0,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearCartResponse {
    pub cleared: bool,
}
