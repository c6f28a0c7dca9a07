//! Live view of a reply in progress.

use std::io;

use crate::error::ChatError;

/// Receives the state of a reply as it streams.
///
/// `update` is always called with the whole text so far, never a delta, so
/// an implementation must redraw rather than append. Calling it twice with
/// the same snapshot must leave the same visible state.
pub trait LiveView {
    /// Show an empty panel for a new reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be written.
    fn start(&mut self, title: &str) -> io::Result<()>;

    /// Redraw with the latest snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be written.
    fn update(&mut self, snapshot: &str) -> io::Result<()>;

    /// Draw the final text and mark the reply complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be written.
    fn finish(&mut self, snapshot: &str) -> io::Result<()>;

    /// Report a failed reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be written.
    fn fail(&mut self, error: &ChatError) -> io::Result<()>;

    /// Report a reply cancelled by the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be written.
    fn interrupt(&mut self) -> io::Result<()>;
}

impl<V: LiveView + ?Sized> LiveView for &mut V {
    fn start(&mut self, title: &str) -> io::Result<()> {
        (**self).start(title)
    }

    fn update(&mut self, snapshot: &str) -> io::Result<()> {
        (**self).update(snapshot)
    }

    fn finish(&mut self, snapshot: &str) -> io::Result<()> {
        (**self).finish(snapshot)
    }

    fn fail(&mut self, error: &ChatError) -> io::Result<()> {
        (**self).fail(error)
    }

    fn interrupt(&mut self) -> io::Result<()> {
        (**self).interrupt()
    }
}
