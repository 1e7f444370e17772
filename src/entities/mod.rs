pub mod movie_genres;
pub mod movies;
pub mod purchases;
pub mod roles;
pub mod user_roles;
pub mod users;
pub mod verifications;

pub use movie_genres as movie_genre_entity;
pub use movies as movie_entity;
pub use purchases as purchase_entity;
pub use purchases::{PaymentMethod, PurchaseStatus};
pub use roles as role_entity;
pub use roles::RoleName;
pub use user_roles as user_role_entity;
pub use users as user_entity;
pub use verifications as verification_entity;
pub use verifications::VerificationChannel;
