pub mod admin_users;
pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod register;
pub mod resend_code;
pub mod verify_email;
