pub mod error;
pub mod registry;
pub mod relay;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use registry::{ConnectionHandle, ConnectionRegistry, Payload};
pub use relay::{PublishResponse, Subscription};
pub use server::{create_router, run_server, serve};
pub use state::AppState;
