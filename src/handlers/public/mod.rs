// handlers/public/mod.rs - Public handlers (no token required)

pub mod token;

pub use token::generate_token;
