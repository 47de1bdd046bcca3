pub mod db;
pub mod email;
pub mod minio;
pub mod rabbitmq;
pub mod redis;
