mod device;
mod session_manager;
mod session_store;
mod sqlite_session_store;

pub use device::DeviceClass;
pub use session_manager::SessionManager;
pub use session_store::{NewSession, Session, SessionStore, SessionToken, SESSION_TOKEN_LEN};
