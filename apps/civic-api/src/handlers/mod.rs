//! Handlers 模块

pub mod admin;
pub mod health;
pub mod media;
pub mod metrics;
pub mod pages;

pub use admin::*;
pub use health::*;
pub use media::*;
pub use metrics::*;
pub use pages::*;
