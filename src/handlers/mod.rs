// handlers/mod.rs - Handler tiers
//
// Public (no token) → Protected (x-access-token required).
// Protected routes get the token middleware applied in `app()`.

pub mod public;
pub mod protected;
