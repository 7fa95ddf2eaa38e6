//! QMS services: business logic per feature area, one connection per call.

pub mod audit_service;
pub mod calibration_service;
pub mod contract_service;
pub mod document_service;
pub mod export_service;
pub mod management_review_service;
pub mod map_service;
pub mod nonconformance_service;
pub mod ohs_service;
pub mod risk_service;
pub mod training_service;
pub mod user_service;
pub mod waste_service;
