pub mod error;
pub mod handlers;
pub mod middleware;
pub mod queue;
pub mod routes;
pub mod stream;
pub mod videos;
pub mod ws;

pub use routes::create_router;
