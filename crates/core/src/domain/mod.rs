pub mod organization;
pub mod person;
pub mod relationship;
pub mod seat;
