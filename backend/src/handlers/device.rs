// src/handlers/device.rs

use axum::{Json, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{error::AppError, utils::device::DeviceTraits};

/// Computes the device id for clients that cannot hash locally.
pub async fn identify(Json(traits): Json<DeviceTraits>) -> Result<impl IntoResponse, AppError> {
    traits.validate()?;

    Ok(Json(json!({
        "success": true,
        "deviceId": traits.device_id(),
    })))
}
