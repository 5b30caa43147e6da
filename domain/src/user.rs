use uuid::Uuid;

/// Identity of the acting user. It comes from the transport layer and is
/// threaded explicitly into every service call.
pub type UserId = Uuid;
