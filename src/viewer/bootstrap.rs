use std::sync::{Arc, Mutex};

use crate::viewer::document::{DocumentNode, find_first_geometry};
use crate::viewer::sdk::{TokenSource, ViewerError, ViewerHandle, ViewerSdk};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskKey {
    pub urn: String,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    Displayed {
        handle: ViewerHandle,
        geometry: DocumentNode,
    },
    /// A newer `begin` or a `teardown` happened while this task was in flight.
    Superseded,
}

#[derive(Debug, Default)]
struct BootstrapState {
    generation: u64,
    current: Option<TaskKey>,
    active: Option<ViewerHandle>,
}

struct Inner<T, S> {
    tokens: T,
    sdk: S,
    container: String,
    state: Mutex<BootstrapState>,
}

pub struct ViewerBootstrap<T, S> {
    inner: Arc<Inner<T, S>>,
}

impl<T, S> Clone for ViewerBootstrap<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> ViewerBootstrap<T, S>
where
    T: TokenSource,
    S: ViewerSdk,
{
    pub fn new(tokens: T, sdk: S, container: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                tokens,
                sdk,
                container: container.into(),
                state: Mutex::new(BootstrapState::default()),
            }),
        }
    }

    pub fn begin(&self, urn: &str) -> Result<TaskKey, ViewerError> {
        let urn = urn.trim();
        if urn.is_empty() {
            return Err(ViewerError::EmptyUrn);
        }

        let (key, previous) = {
            let mut state = self.lock_state();
            state.generation += 1;
            let key = TaskKey {
                urn: urn.to_string(),
                generation: state.generation,
            };
            state.current = Some(key.clone());
            (key, state.active.take())
        };

        if let Some(handle) = previous {
            self.inner.sdk.dispose(handle);
        }

        tracing::debug!(urn = %key.urn, generation = key.generation, "viewer bootstrap started");
        Ok(key)
    }

    pub fn teardown(&self) {
        let active = {
            let mut state = self.lock_state();
            state.current = None;
            state.active.take()
        };

        if let Some(handle) = active {
            self.inner.sdk.dispose(handle);
            tracing::debug!(handle = handle.0, "viewer disposed");
        }
    }

    pub fn is_current(&self, task: &TaskKey) -> bool {
        self.lock_state().current.as_ref() == Some(task)
    }

    pub fn active_viewer(&self) -> Option<ViewerHandle> {
        self.lock_state().active
    }

    pub async fn run(&self, task: &TaskKey) -> Result<BootstrapOutcome, ViewerError> {
        let result = self.run_steps(task).await;
        if let Err(error) = &result {
            tracing::error!(urn = %task.urn, error = %error, "viewer bootstrap failed");
        }
        result
    }

    async fn run_steps(&self, task: &TaskKey) -> Result<BootstrapOutcome, ViewerError> {
        if !self.is_current(task) {
            return Ok(BootstrapOutcome::Superseded);
        }

        let token = self.inner.tokens.fetch_token().await?;
        if !self.is_current(task) {
            return Ok(BootstrapOutcome::Superseded);
        }

        self.inner.sdk.init(&token.access_token).await?;
        if !self.is_current(task) {
            return Ok(BootstrapOutcome::Superseded);
        }

        let handle = self.inner.sdk.start(&self.inner.container)?;
        if !self.adopt(task, handle) {
            self.inner.sdk.dispose(handle);
            return Ok(BootstrapOutcome::Superseded);
        }

        let document = self.inner.sdk.load_document(&task.urn).await?;
        if !self.is_current(task) {
            return Ok(BootstrapOutcome::Superseded);
        }

        let geometry = find_first_geometry(&document)
            .cloned()
            .ok_or_else(|| ViewerError::NoGeometry {
                urn: task.urn.clone(),
            })?;
        self.inner.sdk.display(handle, &geometry)?;

        tracing::info!(
            urn = %task.urn,
            guid = geometry.guid.as_deref().unwrap_or_default(),
            "geometry displayed"
        );

        Ok(BootstrapOutcome::Displayed { handle, geometry })
    }

    fn adopt(&self, task: &TaskKey, handle: ViewerHandle) -> bool {
        let previous = {
            let mut state = self.lock_state();
            if state.current.as_ref() != Some(task) {
                return false;
            }
            state.active.replace(handle)
        };

        if let Some(previous) = previous {
            self.inner.sdk.dispose(previous);
        }
        true
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BootstrapState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
