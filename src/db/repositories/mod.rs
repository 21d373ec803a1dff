pub mod admin;
pub mod complaint;
