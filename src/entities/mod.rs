pub mod prelude;

pub mod admin;
pub mod complaint;
