//! Example bounded contexts.

pub mod accounts;
pub mod enrollment;

pub use accounts::{AccountsContext, AccountsError, User};
pub use enrollment::{Enrollment, EnrollmentContext, spawn_user_deleted_listener};
