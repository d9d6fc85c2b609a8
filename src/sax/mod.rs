pub mod attributes;
pub mod error;
pub mod handler;
pub mod parser;
pub mod source;

use std::sync::{
    Arc, RwLock,
    atomic::{AtomicUsize, Ordering},
};

/// Position provider handed to a [`ContentHandler`](handler::ContentHandler)
/// via `set_document_locator`.
///
/// The locator is shared with the parser and updated as input is consumed;
/// querying it from within a callback yields the position of the event
/// currently being reported. Both line and column are 1-based.
pub struct Locator {
    system_id: RwLock<Arc<str>>,
    line: AtomicUsize,
    column: AtomicUsize,
}

impl Locator {
    pub(crate) fn new(system_id: Arc<str>, line: usize, column: usize) -> Self {
        Self {
            system_id: RwLock::new(system_id),
            line: line.into(),
            column: column.into(),
        }
    }

    /// Identifier of the document being parsed. Empty if unknown.
    pub fn system_id(&self) -> Arc<str> {
        self.system_id.read().unwrap().clone()
    }

    pub fn line(&self) -> usize {
        self.line.load(Ordering::Acquire)
    }

    pub fn column(&self) -> usize {
        self.column.load(Ordering::Acquire)
    }

    pub(crate) fn set_column(&self, column: usize) {
        self.column.store(column, Ordering::Release);
    }

    pub(crate) fn update_line(&self, f: impl Fn(usize) -> usize) {
        while self
            .line
            .fetch_update(Ordering::Release, Ordering::Acquire, |line| Some(f(line)))
            .is_err()
        {}
    }

    pub(crate) fn update_column(&self, f: impl Fn(usize) -> usize) {
        while self
            .column
            .fetch_update(Ordering::Release, Ordering::Acquire, |column| {
                Some(f(column))
            })
            .is_err()
        {}
    }
}
