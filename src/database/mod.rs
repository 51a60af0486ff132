pub mod announcement_repo;
pub mod event_repo;
pub mod family_member_repo;
pub mod profile_repo;
pub mod registration_repo;
pub mod schema;
