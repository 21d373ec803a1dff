pub use super::admin::Entity as Admin;
pub use super::complaint::Entity as Complaint;
