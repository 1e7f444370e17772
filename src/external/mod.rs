pub mod brevo;
pub mod notifier;
pub mod payment;
pub mod twilio;

pub use brevo::*;
pub use notifier::*;
pub use payment::*;
pub use twilio::*;
