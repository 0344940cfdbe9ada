use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    NotFound(Ulid),
    /// Free-play table already at capacity.
    TableFull(u32),
    /// The user is already signed up on this table.
    AlreadyJoined,
    InvalidDate(String),
    DateBlocked(String),
    Validation(&'static str),
    LimitExceeded(&'static str),
    /// Read or write against the document store failed.
    Store(String),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::NotFound(id) => write!(f, "not found: {id}"),
            BookingError::TableFull(cap) => {
                write!(f, "table is full: all {cap} seats taken")
            }
            BookingError::AlreadyJoined => write!(f, "already signed up on this table"),
            BookingError::InvalidDate(d) => write!(f, "invalid date: {d}"),
            BookingError::DateBlocked(d) => write!(f, "date is blocked: {d}"),
            BookingError::Validation(msg) => write!(f, "validation: {msg}"),
            BookingError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            BookingError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for BookingError {}
