//! Domain services.

pub mod mail;
pub mod principals;

pub use mail::Mailer;
pub use principals::{PrincipalService, ResolvedPrincipal};
