//! Business logic, kept free of HTTP concerns. Route handlers translate
//! [`crate::error::ServiceError`] values into responses.

pub mod catalog_service;
pub mod cleanup_service;
pub mod documentation;
pub mod health_service;
pub mod race_service;
