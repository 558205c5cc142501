pub mod auth;
pub mod bookings;
pub mod cars;
pub mod companies;
pub mod locations;
pub mod payments;
pub mod reference;
pub mod users;
