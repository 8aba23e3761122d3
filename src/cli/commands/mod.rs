pub mod battles;
pub mod token;
