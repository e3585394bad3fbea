pub mod form;
pub mod handlers;
pub mod response;
pub mod server;

pub use server::{AppState, build_router, serve};
