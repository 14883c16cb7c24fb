// Admin authentication for the recalculation endpoints

pub use middleware::require_admin;
pub use token::TokenConfig;
pub use types::{AdminClaims, ADMIN_ROLE};

mod middleware;
mod token;
mod types;
