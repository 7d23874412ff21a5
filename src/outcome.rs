// src/outcome.rs
//! Result of a dictionary lookup.

/// Either the id assigned by the naming authority, or nothing yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PossibleFound {
    Found(i32),
    NotFound,
}

impl PossibleFound {
    pub fn is_found(&self) -> bool {
        matches!(self, PossibleFound::Found(_))
    }

    pub fn id(&self) -> Option<i32> {
        match self {
            PossibleFound::Found(id) => Some(*id),
            PossibleFound::NotFound => None,
        }
    }

    /// `(found, id)` pair for encoders that write both fields; the id is 0 on a miss.
    pub fn as_pair(&self) -> (bool, i32) {
        match self {
            PossibleFound::Found(id) => (true, *id),
            PossibleFound::NotFound => (false, 0),
        }
    }
}

impl From<Option<i32>> for PossibleFound {
    fn from(id: Option<i32>) -> Self {
        match id {
            Some(id) => PossibleFound::Found(id),
            None => PossibleFound::NotFound,
        }
    }
}
