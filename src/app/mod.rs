pub mod handlers;
pub mod routes;
pub mod state;

pub use handlers::{ApiError, VIEWER_HEADER};
pub use routes::build_router;
pub use state::AppState;
