pub mod inspect;
pub mod setup;
pub mod types;
