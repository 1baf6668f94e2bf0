// src/handlers/mod.rs

pub mod admin;
pub mod ai;
pub mod auth;
pub mod device;
pub mod gallery;
pub mod gamification;
pub mod health;
pub mod history;
pub mod lessons;
pub mod quiz;
pub mod ratings;
pub mod tags;
