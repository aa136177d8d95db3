// Debounced value propagation
//
// Raw values go in through a watch channel; a single task forwards the latest
// one once the input has been quiet for the configured window.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Delays propagation of a rapidly changing value until it settles.
///
/// The initial value is visible downstream immediately. Dropping the
/// debouncer cancels any pending emission.
pub struct Debouncer<T> {
    input: watch::Sender<T>,
    output: Arc<watch::Sender<T>>,
    delay: Duration,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Must be called from within a tokio runtime
    pub fn new(initial: T, delay: Duration) -> Self {
        let (input, input_rx) = watch::channel(initial.clone());
        let (output, _) = watch::channel(initial);
        let output = Arc::new(output);

        let task = tokio::spawn(Self::run(input_rx, Arc::clone(&output), delay));

        Self {
            input,
            output,
            delay,
            task,
        }
    }

    /// Push a new raw value; restarts the quiescence window
    pub fn set(&self, value: T) {
        self.input.send_replace(value);
    }

    /// Emit `value` now, cancelling whatever was pending
    pub fn flush(&self, value: T) {
        self.input.send_replace(value.clone());
        Self::emit(&self.output, value);
    }

    /// Last emitted value
    pub fn current(&self) -> T {
        self.output.borrow().clone()
    }

    /// Stream of emitted values
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.subscribe()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    async fn run(mut input: watch::Receiver<T>, output: Arc<watch::Sender<T>>, delay: Duration) {
        loop {
            if input.changed().await.is_err() {
                return;
            }

            // Restart the window on every newer value
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => break,
                    changed = input.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        trace!(target: "debounce", "Input changed; restarting window");
                    }
                }
            }

            let latest = input.borrow_and_update().clone();
            Self::emit(&output, latest);
        }
    }

    fn emit(output: &watch::Sender<T>, value: T) {
        output.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
