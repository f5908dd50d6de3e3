pub mod registration;

pub use registration::{resend_otp, sign_up, verify_otp};
