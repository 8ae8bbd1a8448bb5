// Form synchronization adapter
//
// Binds a SettingsForm to the SettingsStore:
// - once, on the store's first initialization, the form is seeded from the store
// - afterwards every form change is pushed to the store (form → store only)
// - edits made before initialization are dropped, not buffered

use crate::metrics::Metrics;
use crate::state::SettingsStore;
use crate::ui::form::{FormModel, SettingsForm};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle to a running form ↔ store binding.
///
/// Dropping the handle, or calling [`detach()`](Self::detach), stops the
/// binding; no store write happens after that.
pub struct FormSync {
    detached: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    label: &'static str,
}

impl FormSync {
    /// Start syncing `form` with `store` on the current tokio runtime.
    ///
    /// If the store is already initialized the form is seeded immediately.
    pub fn attach<F: FormModel>(
        store: SettingsStore,
        form: SettingsForm<F>,
        metrics: Arc<Metrics>,
        label: &'static str,
    ) -> Self {
        let detached = Arc::new(AtomicBool::new(false));

        // Subscribe before spawning so no transition or edit is missed
        let initialized = store.subscribe_initialized();
        let edits = form.subscribe();

        let task = tokio::spawn(run_sync(
            store,
            form,
            initialized,
            edits,
            Arc::clone(&detached),
            metrics,
            label,
        ));

        tracing::debug!("Form sync attached: {}", label);

        Self {
            detached,
            task: Some(task),
            label,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.task.is_some()
    }

    /// Stop observing the form
    pub fn detach(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            self.detached.store(true, Ordering::SeqCst);
            task.abort();
            tracing::debug!("Form sync detached: {}", self.label);
        }
    }
}

impl Drop for FormSync {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_sync<F: FormModel>(
    store: SettingsStore,
    form: SettingsForm<F>,
    mut initialized: watch::Receiver<bool>,
    mut edits: watch::Receiver<F>,
    detached: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
    label: &'static str,
) {
    let mut seeded = false;

    if *initialized.borrow_and_update() {
        seeded = seed(&store, &form, &mut edits, label);
    }

    loop {
        tokio::select! {
            biased;

            changed = initialized.changed(), if !seeded => {
                if changed.is_err() {
                    break;
                }
                if *initialized.borrow_and_update() {
                    seeded = seed(&store, &form, &mut edits, label);
                }
            }

            changed = edits.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = edits.borrow_and_update().clone();

                if !seeded {
                    tracing::debug!("Discarding {} form edit made before initialization", label);
                    continue;
                }
                if detached.load(Ordering::SeqCst) {
                    break;
                }

                let base = F::load(&store);
                if !F::save(&store, snapshot.into_settings(base.as_ref())).is_empty() {
                    metrics.record_settings_update();
                }
            }
        }
    }
}

/// Copy stored settings into the form and swallow the resulting notification
fn seed<F: FormModel>(
    store: &SettingsStore,
    form: &SettingsForm<F>,
    edits: &mut watch::Receiver<F>,
    label: &'static str,
) -> bool {
    let Some(settings) = F::load(store) else {
        return false;
    };

    form.set(F::from_settings(&settings));
    drop(edits.borrow_and_update());
    tracing::debug!("Seeded {} form from settings store", label);
    true
}
