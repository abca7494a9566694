mod database {
    pub mod actions;
    pub mod composition;
    pub mod error;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
    pub mod viewer;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

pub mod api {
    pub mod filters;
    pub mod handlers;
    pub mod rejection;
}
pub mod config;

pub use authentication::*;
pub use constants::*;
pub use database::*;
