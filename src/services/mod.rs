pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, BootstrapOutcome};
pub use auth_service_impl::SeaOrmAuthService;
