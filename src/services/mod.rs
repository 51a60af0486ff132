pub mod admin_service;
pub mod notification_service;
pub mod onboarding_service;
pub mod registration_service;
pub mod role_service;
pub mod session_service;
