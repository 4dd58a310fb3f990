pub mod click;
pub mod session;

pub use click::{validate_point, ClickEvent};
pub use session::{OpenSession, Session, SessionGroup, SessionInfo, SessionStatus};
