pub mod access;
pub mod document;
pub mod status;

pub use access::Target;
pub use document::{
    ACCOUNTS_TABLE, FieldError, Filter, REGISTRATIONS_TABLE, Record, SUBSCRIPTIONS_TABLE, Table,
};
pub use status::Status;
