// API module for the shopcat HTTP server.
// Thin plumbing over the catalog core: routing, CORS, serialization.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState, Transport};
