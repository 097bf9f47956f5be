//! Application services: login flows, email, media and operator admin.

pub mod auth;
pub mod churches;
pub mod email;
pub mod media;
pub mod operators;
pub mod otp;
pub mod rate_limit;

pub use auth::{LoginFlow, ManagerCredentials, OperatorCredentials};
pub use churches::ChurchService;
pub use email::EmailService;
pub use media::MediaService;
pub use operators::OperatorService;
