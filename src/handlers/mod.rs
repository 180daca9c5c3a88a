pub mod health_handlers;
pub mod send_handlers;
