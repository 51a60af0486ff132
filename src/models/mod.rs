pub mod announcements;
pub mod event_registrations;
pub mod events;
pub mod family_members;
pub mod profiles;

pub use announcements::AnnouncementRow;
pub use event_registrations::EventRegistrationRow;
pub use events::{EventRow, EventWithDetailsRow};
pub use family_members::FamilyMemberRow;
pub use profiles::ProfileRow;
