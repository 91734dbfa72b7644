use std::fmt;

/// The resource a request acts on, for authorization purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Registration(String),
    Subscription(String),
    /// An account id the requester claims to be.
    Account(String),
    /// Admin-only actions with no specific resource.
    None,
}

impl Target {
    pub fn registration(id: impl Into<String>) -> Self {
        Self::Registration(id.into())
    }

    pub fn subscription(id: impl Into<String>) -> Self {
        Self::Subscription(id.into())
    }

    pub fn account(id: impl Into<String>) -> Self {
        Self::Account(id.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::Registration(_) => "registration",
            Target::Subscription(_) => "subscription",
            Target::Account(_) => "account",
            Target::None => "none",
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Target::Registration(id) | Target::Subscription(id) | Target::Account(id) => Some(id),
            Target::None => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}:{id}", self.kind()),
            None => f.write_str(self.kind()),
        }
    }
}
