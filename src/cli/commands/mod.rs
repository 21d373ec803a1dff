mod migrate;
mod serve;
mod set_password;

pub use migrate::cmd_migrate;
pub use serve::cmd_serve;
pub use set_password::{MIN_RESET_PASSWORD_LEN, ResetError, cmd_set_password, reset_password};
