pub mod auth;
pub mod error_detail;
pub mod logging;
pub mod request_id;
pub mod tenant;

pub use auth::*;
pub use error_detail::*;
pub use logging::*;
pub use request_id::*;
pub use tenant::*;
