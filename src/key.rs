// src/key.rs
//! Identity of an operation name: the owning application plus the raw name.

use std::fmt;

/// Key shared by the resolved dictionary and the pending set.
///
/// Equality and hashing cover both fields. Names are compared byte for byte,
/// so `"GET /a"` and `"get /a"` are different operations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperationKey {
    application_id: i32,
    operation_name: String,
}

impl OperationKey {
    pub fn new(application_id: i32, operation_name: impl Into<String>) -> Self {
        Self {
            application_id,
            operation_name: operation_name.into(),
        }
    }

    pub fn application_id(&self) -> i32 {
        self.application_id
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.application_id, self.operation_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn structural_equality() {
        assert_eq!(OperationKey::new(1, "GET /a"), OperationKey::new(1, String::from("GET /a")));
        assert_ne!(OperationKey::new(1, "GET /a"), OperationKey::new(2, "GET /a"));
        assert_ne!(OperationKey::new(1, "GET /a"), OperationKey::new(1, "get /a"));
    }

    #[test]
    fn usable_as_set_member() {
        let mut set = HashSet::new();
        assert!(set.insert(OperationKey::new(7, "svc.call()")));
        assert!(!set.insert(OperationKey::new(7, "svc.call()")));
        assert!(set.insert(OperationKey::new(7, "svc.call() ")));
        assert_eq!(set.len(), 2);
    }
}
