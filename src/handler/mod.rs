// Request handling module entry
// Routes incoming requests to the API, media serving, or service pages

pub mod media;
pub mod router;

pub use router::handle_request;
