// src/services/mod.rs

pub mod ai;
pub mod document;
pub mod gamification;
pub mod grading;
