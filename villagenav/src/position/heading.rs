//! Device compass heading.
//!
//! Many fixes arrive without a heading (the device is stationary, or the
//! platform does not derive one). The compass fills that gap for dead
//! reckoning. The heading stream is optional: without it, prediction relies
//! on fix headings alone.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::geo::normalize_heading;

/// Latest compass heading, shared between the listener and readers.
#[derive(Debug, Clone, Default)]
pub struct HeadingCell {
    inner: Arc<RwLock<Option<f64>>>,
}

impl HeadingCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest heading in degrees [0, 360), if any has been received.
    pub fn get(&self) -> Option<f64> {
        *self.inner.read()
    }

    /// Record a heading. Non-finite readings are ignored.
    pub fn set(&self, degrees: f64) {
        if degrees.is_finite() {
            *self.inner.write() = Some(normalize_heading(degrees));
        }
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

/// Spawn a task that copies headings from `rx` into `cell`.
///
/// The task ends when the stream closes or `cancellation` fires.
pub fn spawn_heading_listener(
    mut rx: mpsc::Receiver<f64>,
    cell: HeadingCell,
    cancellation: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!("Compass heading listener started");
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                heading = rx.recv() => match heading {
                    Some(degrees) => cell.set(degrees),
                    None => break,
                },
            }
        }
        tracing::debug!("Compass heading listener stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_normalizes() {
        let cell = HeadingCell::new();
        assert_eq!(cell.get(), None);

        cell.set(-45.0);
        assert_eq!(cell.get(), Some(315.0));

        cell.set(f64::NAN);
        assert_eq!(cell.get(), Some(315.0));

        cell.set(-1e-14);
        assert_eq!(cell.get(), Some(0.0));

        cell.clear();
        assert_eq!(cell.get(), None);
    }

    #[tokio::test]
    async fn test_listener_updates_cell() {
        let (tx, rx) = mpsc::channel(4);
        let cell = HeadingCell::new();
        let handle = spawn_heading_listener(rx, cell.clone(), CancellationToken::new());

        tx.send(90.0).await.unwrap();
        tx.send(370.0).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(cell.get(), Some(10.0));
    }

    #[tokio::test]
    async fn test_listener_stops_on_cancel() {
        let (_tx, rx) = mpsc::channel::<f64>(4);
        let cancellation = CancellationToken::new();
        let handle = spawn_heading_listener(rx, HeadingCell::new(), cancellation.clone());

        cancellation.cancel();
        handle.await.unwrap();
    }
}
