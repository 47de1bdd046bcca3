pub mod admin_routes;
pub mod health;
pub mod proposal_routes;
pub mod user_routes;
pub mod verification_routes;
