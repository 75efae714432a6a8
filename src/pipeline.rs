//! Ordered chain-of-responsibility executor.
//!
//! Each [`Middleware`] receives the shared context and a [`Next`]
//! continuation. Calling [`Next::run`] advances to the following middleware;
//! returning without calling it short-circuits the rest of the chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// What a middleware is, as far as chain placement is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareKind {
    Custom,
    Route,
    /// The fallback route. Kept last by [`crate::router::Routes`].
    Default,
    Redirect,
}

/// One step of a [`Pipeline`].
#[async_trait]
pub trait Middleware<C>: Send + Sync {
    fn kind(&self) -> MiddlewareKind {
        MiddlewareKind::Custom
    }

    /// Handle `ctx`, calling `next.run(ctx)` to continue the chain.
    async fn handle(&self, ctx: &mut C, next: Next<'_, C>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Next
// ---------------------------------------------------------------------------

/// Continuation handed to each middleware. Usable once.
pub struct Next<'a, C> {
    rest: &'a [Arc<dyn Middleware<C>>],
    called: AtomicBool,
}

impl<'a, C: Send> Next<'a, C> {
    fn new(rest: &'a [Arc<dyn Middleware<C>>]) -> Self {
        Self {
            rest,
            called: AtomicBool::new(false),
        }
    }

    /// Run the remainder of the chain.
    ///
    /// A second call on the same continuation fails with
    /// [`Error::NextCalledTwice`] without touching the chain.
    pub async fn run(&self, ctx: &mut C) -> Result<()> {
        if self.called.swap(true, Ordering::AcqRel) {
            return Err(Error::NextCalledTwice);
        }
        run_chain(self.rest, ctx).await
    }

    /// Middlewares still ahead of this continuation.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

fn run_chain<'a, C: Send>(
    chain: &'a [Arc<dyn Middleware<C>>],
    ctx: &'a mut C,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        match chain.split_first() {
            Some((head, rest)) => head.handle(ctx, Next::new(rest)).await,
            None => Ok(()),
        }
    })
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Middlewares executed strictly in registration order.
pub struct Pipeline<C> {
    middlewares: Vec<Arc<dyn Middleware<C>>>,
}

impl<C: Send> Pipeline<C> {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Append a middleware to the end of the chain.
    pub fn push(&mut self, middleware: impl Middleware<C> + 'static) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn push_shared(&mut self, middleware: Arc<dyn Middleware<C>>) {
        self.middlewares.push(middleware);
    }

    /// Insert at `index`, shifting later middlewares back.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, middleware: Arc<dyn Middleware<C>>) {
        self.middlewares.insert(index, middleware);
    }

    /// The registered middlewares, in execution order.
    pub fn middlewares(&self) -> &[Arc<dyn Middleware<C>>] {
        &self.middlewares
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run the chain against `ctx`.
    ///
    /// Resolves once the whole chain, or the step that short-circuited it,
    /// has resolved.
    pub async fn execute(&self, ctx: &mut C) -> Result<()> {
        run_chain(&self.middlewares, ctx).await
    }
}

impl<C: Send> Default for Pipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
