//! Services layer: the registration gate and its injected collaborators.

mod email;
pub mod error;
mod gate;
mod jwt;
mod staging;
mod users;

pub use email::{MockMailer, OtpMailer, SmtpMailer};
pub use error::ServiceError;
pub use gate::RegistrationGate;
pub use jwt::{JwtService, TokenClaims};
pub use staging::{InMemoryStaging, StagingInsert, StagingStore};
pub use users::{InMemoryUserStore, PgUserStore, UserStore};
