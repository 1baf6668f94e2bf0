// src/utils/mod.rs

pub mod cache_control;
pub mod csrf;
pub mod device;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod points;
pub mod sampler;
