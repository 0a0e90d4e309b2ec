pub mod inspect;
pub mod log;
pub mod mirror;
