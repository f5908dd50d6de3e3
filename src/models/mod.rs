//! Domain models for the registration gate.

mod pending;
mod user;

pub use pending::{PendingRegistration, RegistrationState};
pub use user::{NewUser, PublicUser, Role, User};
