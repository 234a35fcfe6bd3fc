pub mod category;
pub mod config;
pub mod order;
pub mod product;
pub mod upload;
pub mod users;
