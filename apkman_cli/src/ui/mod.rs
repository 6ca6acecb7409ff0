pub mod guard;
pub mod modal;
pub mod page;
pub mod toast;
pub mod tree;

/// Remote data shown by a view, from request to outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    Loading,
    Loaded(Vec<T>),
    Failed(String),
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Listing::Loading
    }
}

impl<T> Listing<T> {
    pub fn from_result<E: std::fmt::Display>(result: Result<Vec<T>, E>) -> Self {
        match result {
            Ok(items) => Listing::Loaded(items),
            Err(err) => Listing::Failed(err.to_string()),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Listing::Loaded(items) => items,
            _ => &[],
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut Vec<T>> {
        match self {
            Listing::Loaded(items) => Some(items),
            _ => None,
        }
    }
}
