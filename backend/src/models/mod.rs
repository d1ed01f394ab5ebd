pub mod organization;
pub mod session;
pub mod user;
