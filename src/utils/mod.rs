pub mod jwt;
pub mod keyed_lock;
pub mod otp;
pub mod password;
pub mod validation;

pub use jwt::*;
pub use keyed_lock::KeyedLocks;
pub use otp::generate_otp;
pub use password::*;
pub use validation::*;
