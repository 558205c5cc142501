pub mod audit;
pub mod booking;
pub mod car;
pub mod company;
pub mod location;
pub mod payment;
pub mod reference;
pub mod user;

pub use audit::AuditLogRow;
pub use booking::{Booking, BookingWithCompany};
pub use car::Car;
pub use company::Company;
pub use location::Location;
pub use payment::{Payment, PaymentWithCompany};
pub use reference::{Brand, Currency};
pub use user::User;
