pub mod error;
pub mod paths;
pub mod session;
pub mod settings;
pub mod token;

pub use error::CoreError;
pub use session::{Session, SessionStore};
pub use settings::ClientSettings;
