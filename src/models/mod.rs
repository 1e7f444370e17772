pub mod common;
pub mod movie;
pub mod pagination;
pub mod purchase;
pub mod user;

pub use common::*;
pub use movie::*;
pub use pagination::*;
pub use purchase::*;
pub use user::*;
