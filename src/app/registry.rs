//! The set of apps known to a shell.

use std::sync::Arc;

use super::App;
use crate::error::{Error, Result};

/// Apps by unique name, in registration order.
#[derive(Debug, Default)]
pub struct AppRegistry {
    apps: Vec<Arc<App>>,
}

impl AppRegistry {
    /// Build a registry, failing on the first duplicated name.
    pub fn new(apps: impl IntoIterator<Item = App>) -> Result<Self> {
        let mut registry = Self::default();
        for app in apps {
            registry.register(app)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, app: App) -> Result<()> {
        if self.contains(app.name()) {
            return Err(Error::DuplicateAppName(app.name().to_owned()));
        }
        self.apps.push(Arc::new(app));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<App>> {
        self.apps.iter().find(|a| a.name() == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.apps.iter().any(|a| a.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.apps.iter().map(|a| a.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<App>> {
        self.apps.iter()
    }

    /// Remote identifiers by app name, for hosts that generate import maps.
    pub fn remote_identifiers(&self) -> Vec<(&str, &str)> {
        self.apps
            .iter()
            .filter_map(|a| a.source().identifier().map(|id| (a.name(), id)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}
