pub mod auth_service;
pub mod movie_service;
pub mod purchase_service;
pub mod role_service;
pub mod verification_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_service::*;
pub use movie_service::*;
pub use purchase_service::*;
pub use role_service::*;
pub use verification_service::*;
