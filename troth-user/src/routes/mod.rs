pub mod favorites;
pub mod health;
pub mod interests;
pub mod matches;
pub mod photo;
pub mod profile;
pub mod proposals;
pub mod search;
