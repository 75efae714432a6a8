//! Where an app's mountable comes from.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use super::mountable::{ModuleLoader, Mountable};
use crate::error::{Error, Result};

pub type Factory = Box<dyn Fn() -> anyhow::Result<Arc<dyn Mountable>> + Send + Sync>;

type Pending = BoxFuture<'static, anyhow::Result<Arc<dyn Mountable>>>;

/// The four ways an app can be supplied. Each resolves to a [`Mountable`].
pub enum Bootstrap {
    /// Used as-is.
    Object(Arc<dyn Mountable>),
    /// Invoked to produce the mountable.
    Factory(Factory),
    /// Awaited once. A second resolution after a failure cannot succeed.
    Deferred(Mutex<Option<Pending>>),
    /// Resolved through the [`ModuleLoader`] with this identifier.
    Remote(String),
}

impl Bootstrap {
    pub fn object(mountable: impl Mountable + 'static) -> Self {
        Bootstrap::Object(Arc::new(mountable))
    }

    pub fn factory<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<dyn Mountable>> + Send + Sync + 'static,
    {
        Bootstrap::Factory(Box::new(f))
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<Arc<dyn Mountable>>> + Send + 'static,
    {
        Bootstrap::Deferred(Mutex::new(Some(Box::pin(future))))
    }

    pub fn remote(identifier: impl Into<String>) -> Self {
        Bootstrap::Remote(identifier.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Bootstrap::Object(_) => "object",
            Bootstrap::Factory(_) => "factory",
            Bootstrap::Deferred(_) => "deferred",
            Bootstrap::Remote(_) => "remote",
        }
    }

    /// The remote identifier, if this is a remote reference.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Bootstrap::Remote(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) async fn resolve(
        &self,
        app: &str,
        loader: Option<&dyn ModuleLoader>,
    ) -> Result<Arc<dyn Mountable>> {
        match self {
            Bootstrap::Object(m) => Ok(m.clone()),
            Bootstrap::Factory(f) => f().map_err(|e| Error::resolve(app, e)),
            Bootstrap::Deferred(slot) => {
                let pending = slot.lock().take();
                match pending {
                    Some(future) => future.await.map_err(|e| Error::resolve(app, e)),
                    None => Err(Error::resolve(
                        app,
                        anyhow::anyhow!("deferred source was already consumed"),
                    )),
                }
            }
            Bootstrap::Remote(id) => {
                let loader = loader.ok_or_else(|| {
                    Error::resolve(app, anyhow::anyhow!("no module loader for `{id}`"))
                })?;
                loader.resolve(id).await.map_err(|e| Error::resolve(app, e))
            }
        }
    }
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bootstrap::Object(_) => f.write_str("Object"),
            Bootstrap::Factory(_) => f.write_str("Factory"),
            Bootstrap::Deferred(_) => f.write_str("Deferred"),
            Bootstrap::Remote(id) => f.debug_tuple("Remote").field(id).finish(),
        }
    }
}

impl<M: Mountable + 'static> From<Arc<M>> for Bootstrap {
    fn from(m: Arc<M>) -> Self {
        Bootstrap::Object(m)
    }
}

impl From<&str> for Bootstrap {
    fn from(identifier: &str) -> Self {
        Bootstrap::remote(identifier)
    }
}
