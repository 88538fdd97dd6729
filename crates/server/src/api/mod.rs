mod handlers;
mod history;
mod jobs;
mod middleware;
mod routes;

pub use routes::create_router;
