// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Operation-state machine driving screen feedback.
//!
//! Tracks one state at a time (idle, the busy states, success, error) for the
//! UI shell to render. Transitions are debounced so a burst of state writes
//! settles on the last one; success and error auto-revert to idle after a
//! delay; an error transition rolls back every registered optimistic update.
//!
//! The controller is cheap to clone and all clones share state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::Result;

/// Operation state shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiState {
    #[default]
    Idle,
    Uploading,
    Saving,
    Calculating,
    Updating,
    Success,
    Error,
}

impl UiState {
    /// Loading states: non-idle and not yet settled.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            UiState::Uploading | UiState::Saving | UiState::Calculating | UiState::Updating
        )
    }
}

/// Snapshot of the current operation state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UiStateData {
    pub state: UiState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Percent complete, 0-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Controller tuning knobs.
#[derive(Debug, Clone)]
pub struct UiStateOptions {
    /// Quiet period before a transition (and the click guard) settles.
    pub debounce: Duration,
    /// Delay before success/error revert to idle. Zero disables auto-reset.
    pub auto_reset: Duration,
    /// Whether the optimistic-update ledger accepts registrations.
    pub optimistic_updates: bool,
}

impl Default for UiStateOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            auto_reset: Duration::from_millis(3000),
            optimistic_updates: false,
        }
    }
}

/// Handle for a registered optimistic update. Generated by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdateId(u64);

type RollbackFn = Box<dyn FnOnce() + Send + 'static>;

struct OptimisticUpdate {
    #[allow(dead_code)]
    data: serde_json::Value,
    rollback: RollbackFn,
}

struct Inner {
    options: UiStateOptions,
    data: Mutex<UiStateData>,
    pending_transition: Mutex<Option<JoinHandle<()>>>,
    pending_reset: Mutex<Option<JoinHandle<()>>>,
    ledger: Mutex<HashMap<u64, OptimisticUpdate>>,
    next_update_id: AtomicU64,
    last_accepted: Mutex<Option<Instant>>,
    dropped_actions: AtomicU64,
}

/// Shared operation-state controller.
#[derive(Clone)]
pub struct UiStateController {
    inner: Arc<Inner>,
}

impl UiStateController {
    pub fn new(options: UiStateOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                data: Mutex::new(UiStateData::default()),
                pending_transition: Mutex::new(None),
                pending_reset: Mutex::new(None),
                ledger: Mutex::new(HashMap::new()),
                next_update_id: AtomicU64::new(1),
                last_accepted: Mutex::new(None),
                dropped_actions: AtomicU64::new(0),
            }),
        }
    }

    // ─── State Accessors ─────────────────────────────────────────

    pub fn snapshot(&self) -> UiStateData {
        self.inner.data.lock().unwrap().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.data.lock().unwrap().state.is_busy()
    }

    pub fn is_idle(&self) -> bool {
        self.inner.data.lock().unwrap().state == UiState::Idle
    }

    /// Number of consecutive actions dropped by the click guard.
    pub fn dropped_actions(&self) -> u64 {
        self.inner.dropped_actions.load(Ordering::Relaxed)
    }

    // ─── Transitions ─────────────────────────────────────────────

    /// Reset to idle immediately, bypassing the debounce queue.
    pub fn set_idle(&self) {
        if let Some(handle) = self.inner.pending_transition.lock().unwrap().take() {
            handle.abort();
        }
        Self::commit(&self.inner, UiStateData::default());
    }

    pub fn set_uploading(&self, message: Option<String>, progress: Option<u8>) {
        self.schedule(UiStateData {
            state: UiState::Uploading,
            message: message.or_else(|| Some("Uploading...".to_string())),
            progress,
            ..Default::default()
        });
    }

    pub fn set_saving(&self, message: Option<String>, progress: Option<u8>) {
        self.schedule(UiStateData {
            state: UiState::Saving,
            message: message.or_else(|| Some("Saving...".to_string())),
            progress,
            ..Default::default()
        });
    }

    pub fn set_calculating(&self, message: Option<String>, progress: Option<u8>) {
        self.schedule(UiStateData {
            state: UiState::Calculating,
            message: message.or_else(|| Some("Calculating...".to_string())),
            progress,
            ..Default::default()
        });
    }

    pub fn set_updating(&self, message: Option<String>, progress: Option<u8>) {
        self.schedule(UiStateData {
            state: UiState::Updating,
            message: message.or_else(|| Some("Updating...".to_string())),
            progress,
            ..Default::default()
        });
    }

    pub fn set_success(&self, message: Option<String>, data: Option<serde_json::Value>) {
        self.schedule(UiStateData {
            state: UiState::Success,
            message: message.or_else(|| Some("Operation completed successfully!".to_string())),
            data,
            ..Default::default()
        });
    }

    /// Transition to the error state.
    ///
    /// Every registered optimistic update is rolled back before this returns,
    /// regardless of when the debounced transition itself settles.
    pub fn set_error(&self, message: Option<String>, error: Option<String>) {
        self.rollback_all_optimistic_updates();
        self.schedule(UiStateData {
            state: UiState::Error,
            message: message.or_else(|| Some("An error occurred".to_string())),
            error,
            ..Default::default()
        });
    }

    /// Update progress and message of the current state, synchronously and
    /// outside the debounce queue.
    pub fn update_progress(&self, progress: u8, message: Option<String>) {
        let mut data = self.inner.data.lock().unwrap();
        data.progress = Some(progress.min(100));
        if message.is_some() {
            data.message = message;
        }
    }

    /// Schedule a debounced transition: the previous pending transition is
    /// aborted, so a burst of writes settles on the last one.
    fn schedule(&self, next: UiStateData) {
        let inner = Arc::clone(&self.inner);
        let delay = self.inner.options.debounce;

        let mut pending = self.inner.pending_transition.lock().unwrap();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            Self::commit(&inner, next);
        }));
    }

    /// Apply a transition now. Cancels a pending auto-reset, and schedules a
    /// fresh one when the new state is success or error.
    fn commit(inner: &Arc<Inner>, next: UiStateData) {
        if let Some(handle) = inner.pending_reset.lock().unwrap().take() {
            handle.abort();
        }

        let wants_reset = matches!(next.state, UiState::Success | UiState::Error)
            && !inner.options.auto_reset.is_zero();

        *inner.data.lock().unwrap() = next;

        if wants_reset {
            let reset_inner = Arc::clone(inner);
            let delay = inner.options.auto_reset;
            *inner.pending_reset.lock().unwrap() = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                *reset_inner.data.lock().unwrap() = UiStateData::default();
            }));
        }
    }

    // ─── Click Guard ─────────────────────────────────────────────

    /// Run `action` unless another action was accepted within the debounce
    /// window; dropped invocations are counted, not queued.
    ///
    /// Returns whether the action ran. Action errors are logged, not
    /// propagated; the guard exists to absorb repeated taps.
    pub async fn with_debounce<F, Fut>(&self, action: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let now = Instant::now();
        {
            let mut last = self.inner.last_accepted.lock().unwrap();
            if let Some(previous) = *last {
                if now.duration_since(previous) < self.inner.options.debounce {
                    let dropped = self.inner.dropped_actions.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::debug!(dropped, "Action dropped by click guard");
                    return false;
                }
            }
            *last = Some(now);
            self.inner.dropped_actions.store(0, Ordering::Relaxed);
        }

        if let Err(err) = action().await {
            tracing::warn!(error = %err, "Guarded action failed");
        }
        true
    }

    // ─── Optimistic Updates ──────────────────────────────────────

    /// Register an optimistic update with its rollback. Returns `None` when
    /// optimistic updates are disabled for this controller.
    pub fn add_optimistic_update(
        &self,
        data: serde_json::Value,
        rollback: impl FnOnce() + Send + 'static,
    ) -> Option<UpdateId> {
        if !self.inner.options.optimistic_updates {
            return None;
        }

        let id = self.inner.next_update_id.fetch_add(1, Ordering::Relaxed);
        self.inner.ledger.lock().unwrap().insert(
            id,
            OptimisticUpdate {
                data,
                rollback: Box::new(rollback),
            },
        );
        Some(UpdateId(id))
    }

    /// Discard a registered update, keeping its changes.
    pub fn commit_optimistic_update(&self, id: UpdateId) {
        self.inner.ledger.lock().unwrap().remove(&id.0);
    }

    /// Invoke and discard one registered update's rollback.
    pub fn rollback_optimistic_update(&self, id: UpdateId) {
        let update = self.inner.ledger.lock().unwrap().remove(&id.0);
        if let Some(update) = update {
            (update.rollback)();
        }
    }

    /// Invoke and discard every registered rollback, in unspecified order.
    pub fn rollback_all_optimistic_updates(&self) {
        let drained: Vec<OptimisticUpdate> = {
            let mut ledger = self.inner.ledger.lock().unwrap();
            ledger.drain().map(|(_, update)| update).collect()
        };

        let count = drained.len();
        for update in drained {
            (update.rollback)();
        }
        if count > 0 {
            tracing::debug!(count, "Rolled back optimistic updates");
        }
    }

    // ─── Async Operation Wrappers ────────────────────────────────

    /// Run an async operation under a loading state, transitioning to success
    /// or error when it settles. The error is propagated to the caller after
    /// the error transition (and its rollbacks) have run.
    pub async fn with_async_state<T, Fut>(
        &self,
        operation: Fut,
        loading_state: UiState,
        loading_message: Option<String>,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.schedule(UiStateData {
            state: loading_state,
            message: loading_message,
            ..Default::default()
        });

        match operation.await {
            Ok(value) => {
                self.set_success(None, None);
                Ok(value)
            }
            Err(err) => {
                self.set_error(Some("Operation failed".to_string()), Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Run operations in sequential chunks of `batch_size`; operations within
    /// a chunk run concurrently. Results are returned in input order and
    /// progress is updated after each chunk. The first failure propagates.
    pub async fn with_batch_operations<T, F, Fut>(
        &self,
        operations: Vec<F>,
        batch_size: usize,
    ) -> Result<Vec<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total = operations.len();
        let batch_size = batch_size.max(1);

        self.schedule(UiStateData {
            state: UiState::Saving,
            message: Some(format!("Processing {} operations...", total)),
            progress: Some(0),
            ..Default::default()
        });

        let mut results = Vec::with_capacity(total);
        let mut completed = 0usize;
        let mut remaining = operations.into_iter();

        loop {
            let chunk: Vec<F> = remaining.by_ref().take(batch_size).collect();
            if chunk.is_empty() {
                break;
            }

            let chunk_results =
                futures_util::future::try_join_all(chunk.into_iter().map(|op| op())).await?;
            completed += chunk_results.len();
            results.extend(chunk_results);

            let progress = ((completed as f64 / total as f64) * 100.0).round() as u8;
            self.update_progress(
                progress,
                Some(format!("Processed {}/{} operations", completed, total)),
            );
        }

        self.set_success(
            Some(format!("Successfully processed {} operations!", total)),
            None,
        );
        Ok(results)
    }
}

impl Default for UiStateController {
    fn default() -> Self {
        Self::new(UiStateOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::AtomicU32;
    use tokio::time::sleep;

    fn controller() -> UiStateController {
        UiStateController::new(UiStateOptions {
            debounce: Duration::from_millis(300),
            auto_reset: Duration::from_millis(3000),
            optimistic_updates: true,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_settles_after_quiet_period() {
        let ui = controller();
        ui.set_saving(None, None);

        // Not yet committed
        assert_eq!(ui.snapshot().state, UiState::Idle);

        sleep(Duration::from_millis(301)).await;
        assert_eq!(ui.snapshot().state, UiState::Saving);
        assert!(ui.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_write_wins_within_debounce() {
        let ui = controller();
        ui.set_saving(None, None);
        sleep(Duration::from_millis(100)).await;
        ui.set_uploading(Some("photo".to_string()), None);

        sleep(Duration::from_millis(301)).await;
        let data = ui.snapshot();
        assert_eq!(data.state, UiState::Uploading);
        assert_eq!(data.message.as_deref(), Some("photo"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_busy_state_settles() {
        let ui = controller();
        assert!(ui.is_idle());

        ui.set_calculating(None, None);
        sleep(Duration::from_millis(301)).await;
        assert_eq!(ui.snapshot().state, UiState::Calculating);

        ui.set_updating(None, Some(40));
        sleep(Duration::from_millis(301)).await;
        let data = ui.snapshot();
        assert_eq!(data.state, UiState::Updating);
        assert_eq!(data.progress, Some(40));
        assert!(!ui.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_progress_is_synchronous() {
        let ui = controller();
        ui.set_uploading(None, Some(10));
        sleep(Duration::from_millis(301)).await;

        ui.update_progress(55, None);
        let data = ui.snapshot();
        assert_eq!(data.progress, Some(55));
        assert_eq!(data.state, UiState::Uploading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_auto_resets_to_idle() {
        let ui = controller();
        ui.set_success(None, None);

        sleep(Duration::from_millis(301)).await;
        assert_eq!(ui.snapshot().state, UiState::Success);

        sleep(Duration::from_millis(3001)).await;
        assert_eq!(ui.snapshot().state, UiState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_transition_cancels_pending_reset() {
        let ui = controller();
        ui.set_success(None, None);
        sleep(Duration::from_millis(301)).await;

        // Schedule a new transition before the reset fires
        sleep(Duration::from_millis(2000)).await;
        ui.set_saving(None, None);
        sleep(Duration::from_millis(301)).await;
        assert_eq!(ui.snapshot().state, UiState::Saving);

        // The old reset would have fired by now; saving must survive it
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(ui.snapshot().state, UiState::Saving);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_idle_is_immediate() {
        let ui = controller();
        ui.set_saving(None, None);
        sleep(Duration::from_millis(301)).await;

        ui.set_idle();
        assert_eq!(ui.snapshot().state, UiState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_rolls_back_ledger_exactly_once() {
        let ui = controller();
        let rollbacks = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&rollbacks);
        let id = ui
            .add_optimistic_update(serde_json::json!({"entry": "a"}), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .expect("ledger enabled");

        ui.set_error(Some("x".to_string()), None);
        assert_eq!(rollbacks.load(Ordering::SeqCst), 1);

        // Ledger is empty: committing or rolling back again is a no-op
        ui.rollback_optimistic_update(id);
        ui.rollback_all_optimistic_updates();
        assert_eq!(rollbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_discards_without_invoking() {
        let ui = controller();
        let rollbacks = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&rollbacks);
        let id = ui
            .add_optimistic_update(serde_json::Value::Null, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        ui.commit_optimistic_update(id);
        ui.rollback_all_optimistic_updates();
        assert_eq!(rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_disabled_returns_none() {
        let ui = UiStateController::new(UiStateOptions {
            optimistic_updates: false,
            ..Default::default()
        });
        assert!(ui
            .add_optimistic_update(serde_json::Value::Null, || {})
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_guard_drops_rapid_invocations() {
        let ui = controller();
        let runs = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let counter = Arc::clone(&runs);
            ui.with_debounce(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(ui.dropped_actions(), 1);

        // After the quiet period the guard accepts again
        sleep(Duration::from_millis(301)).await;
        let counter = Arc::clone(&runs);
        let ran = ui
            .with_debounce(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(ran);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(ui.dropped_actions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_async_state_success() {
        let ui = controller();
        let result = ui
            .with_async_state(
                async { Ok::<_, AppError>(7) },
                UiState::Calculating,
                Some("Crunching...".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(result, 7);

        sleep(Duration::from_millis(301)).await;
        assert_eq!(ui.snapshot().state, UiState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_async_state_failure_propagates_after_rollback() {
        let ui = controller();
        let rollbacks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&rollbacks);
        ui.add_optimistic_update(serde_json::Value::Null, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let result: Result<()> = ui
            .with_async_state(
                async { Err(AppError::BadRequest("nope".to_string())) },
                UiState::Saving,
                None,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(rollbacks.load(Ordering::SeqCst), 1);

        sleep(Duration::from_millis(301)).await;
        let data = ui.snapshot();
        assert_eq!(data.state, UiState::Error);
        assert!(data.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_operations_order_and_concurrency() {
        let ui = controller();
        let gate = Arc::new(tokio::sync::Notify::new());

        // op1 only completes if op2 runs concurrently in the same chunk
        let wait_gate = Arc::clone(&gate);
        let signal_gate = Arc::clone(&gate);
        let ops: Vec<Box<dyn FnOnce() -> futures_util::future::BoxFuture<'static, Result<u32>>>> = vec![
            Box::new(move || {
                Box::pin(async move {
                    wait_gate.notified().await;
                    Ok(1)
                })
            }),
            Box::new(move || {
                Box::pin(async move {
                    signal_gate.notify_one();
                    Ok(2)
                })
            }),
            Box::new(|| Box::pin(async { Ok(3) })),
        ];

        let results = tokio::time::timeout(
            Duration::from_secs(5),
            ui.with_batch_operations(ops, 2),
        )
        .await
        .expect("batch should not deadlock")
        .unwrap();

        assert_eq!(results, vec![1, 2, 3]);

        sleep(Duration::from_millis(301)).await;
        assert_eq!(ui.snapshot().state, UiState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_operations_first_failure_wins() {
        let ui = controller();
        let ops: Vec<Box<dyn FnOnce() -> futures_util::future::BoxFuture<'static, Result<u32>>>> = vec![
            Box::new(|| Box::pin(async { Ok(1) })),
            Box::new(|| Box::pin(async { Err(AppError::BadRequest("boom".to_string())) })),
            Box::new(|| Box::pin(async { Ok(3) })),
        ];

        let result = ui.with_batch_operations(ops, 2).await;
        assert!(result.is_err());
    }
}
