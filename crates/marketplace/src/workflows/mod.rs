pub mod bookings;
pub mod profiles;
pub mod providers;
pub mod rides;
