//! Scoped transaction over a [`ModelWriter`].

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::{ModelError, ModelWriter};

/// A named transaction that rolls back unless committed.
///
/// Dereferences to the underlying writer, so writes go through the guard.
/// Dropping the guard without [`commit`](Self::commit), including on an early
/// `?` return, discards every write made inside it.
pub struct Transaction<'a, W: ModelWriter + ?Sized> {
    writer: &'a mut W,
    name: String,
    open: bool,
}

impl<'a, W: ModelWriter + ?Sized> Transaction<'a, W> {
    pub fn start(writer: &'a mut W, name: &str) -> Result<Self, ModelError> {
        writer.begin_transaction(name)?;
        debug!(transaction = name, "transaction started");
        Ok(Self {
            writer,
            name: name.to_string(),
            open: true,
        })
    }

    /// Commit all writes. On failure the guard still rolls back when dropped.
    pub fn commit(mut self) -> Result<(), ModelError> {
        self.writer.commit()?;
        self.open = false;
        debug!(transaction = %self.name, "transaction committed");
        Ok(())
    }
}

impl<W: ModelWriter + ?Sized> Deref for Transaction<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.writer
    }
}

impl<W: ModelWriter + ?Sized> DerefMut for Transaction<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.writer
    }
}

impl<W: ModelWriter + ?Sized> Drop for Transaction<'_, W> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        match self.writer.rollback() {
            Ok(()) => warn!(transaction = %self.name, "transaction rolled back"),
            Err(e) => warn!(transaction = %self.name, error = %e, "rollback failed"),
        }
    }
}
