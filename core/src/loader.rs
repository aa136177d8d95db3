//! Visibility-triggered "load more".
//!
//! The presentation layer reports whether the list's trailing sentinel is on
//! screen. [`EdgeTrigger`] turns those reports into at most one `fetch_next`
//! per not-visible -> visible transition. It fires again only after a fetch
//! settles while the sentinel is still visible. This covers a first page
//! shorter than the viewport without spinning on fast scrolls.

use crate::pagination::{ListView, PageSource, PaginatedCoordinator};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Edge-triggered decision logic, independent of any runtime
#[derive(Debug, Default, Clone)]
pub struct EdgeTrigger {
    visible: bool,
}

impl EdgeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Record a visibility report; true when a fetch should be triggered
    pub fn on_visibility(&mut self, visible: bool, has_next: bool, is_fetching: bool) -> bool {
        let rising = visible && !self.visible;
        self.visible = visible;
        rising && has_next && !is_fetching
    }

    /// Record that an in-flight fetch settled; true when a fetch should be
    /// triggered because the sentinel is still on screen
    pub fn on_fetch_settled(&mut self, has_next: bool) -> bool {
        self.visible && has_next
    }
}

/// Runs an [`EdgeTrigger`] against a coordinator in a background task.
///
/// Dropping the loader stops it.
pub struct VisibilityLoader {
    task: JoinHandle<()>,
}

impl VisibilityLoader {
    /// Watch `sentinel` (true = on screen) and pull pages from `coordinator`
    pub fn spawn<P: PageSource>(
        coordinator: Arc<PaginatedCoordinator<P>>,
        sentinel: watch::Receiver<bool>,
    ) -> Self {
        let views = coordinator.subscribe();
        let task = tokio::spawn(Self::run(coordinator, sentinel, views));
        Self { task }
    }

    async fn run<P: PageSource>(
        coordinator: Arc<PaginatedCoordinator<P>>,
        mut sentinel: watch::Receiver<bool>,
        mut views: watch::Receiver<ListView<P::Item>>,
    ) {
        let mut trigger = EdgeTrigger::new();
        let (mut was_fetching, initial_visible) = {
            let view = views.borrow_and_update();
            (view.is_fetching(), *sentinel.borrow_and_update())
        };

        let (has_next, is_fetching) = Self::flags(&views);
        if trigger.on_visibility(initial_visible, has_next, is_fetching) {
            was_fetching |= coordinator.fetch_next().await;
        }

        loop {
            let fire = tokio::select! {
                changed = sentinel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let visible = *sentinel.borrow_and_update();
                    let (has_next, is_fetching) = Self::flags(&views);
                    trace!(target: "loader", visible, has_next, is_fetching, "Sentinel visibility changed");
                    trigger.on_visibility(visible, has_next, is_fetching)
                }
                changed = views.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let (has_next, is_fetching) = {
                        let view = views.borrow_and_update();
                        (view.has_next, view.is_fetching())
                    };
                    let settled = was_fetching && !is_fetching;
                    was_fetching = is_fetching;
                    settled && trigger.on_fetch_settled(has_next)
                }
            };

            if fire {
                debug!(target: "loader", "Sentinel visible; requesting next page");
                // The settle may be coalesced with the request in the view stream
                was_fetching |= coordinator.fetch_next().await;
            }
        }
    }

    fn flags<T>(views: &watch::Receiver<ListView<T>>) -> (bool, bool) {
        let view = views.borrow();
        (view.has_next, view.is_fetching())
    }
}

impl Drop for VisibilityLoader {
    fn drop(&mut self) {
        self.task.abort();
    }
}
