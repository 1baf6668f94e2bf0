// src/models/mod.rs

pub mod ai;
pub mod gallery;
pub mod gamification;
pub mod lesson;
pub mod quiz;
pub mod rating;
pub mod result;
pub mod student;
pub mod tag;
