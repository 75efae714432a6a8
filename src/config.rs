//! Shell configuration.
//!
//! [`ShellOptions`] is the host-facing option set; it deserializes from the
//! same camelCase JSON hosts already use. [`BootstrapConfig`] bundles the
//! options with the collaborators a shell is assembled from.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::app::{AppRegistry, ModuleLoader};
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::router::{History, Routes};

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Toggles for non-fatal diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Warnings {
    /// Warn when one app holds more than the leak threshold of subscriptions.
    pub subscriptions: bool,
}

impl Default for Warnings {
    fn default() -> Self {
        Self {
            subscriptions: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ShellOptions
// ---------------------------------------------------------------------------

/// Options forwarded into the shell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShellOptions {
    /// Log lifecycle and routing events. Never changes behavior.
    pub debug: bool,
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_base_path")]
    base_path: String,
    /// Do not run the initial route change during bootstrap.
    pub manually_start_router: bool,
    pub warnings: Warnings,
}

fn normalize_base_path(path: &str) -> String {
    path.trim_end_matches('/').to_owned()
}

fn deserialize_base_path<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_base_path(&raw))
}

impl ShellOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON, applying defaults for missing keys.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Base path without a trailing `/`; empty when unset.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the base path (builder). A trailing `/` is stripped.
    pub fn with_base_path(mut self, path: &str) -> Self {
        self.base_path = normalize_base_path(path);
        self
    }

    pub fn with_manually_start_router(mut self, manual: bool) -> Self {
        self.manually_start_router = manual;
        self
    }

    pub fn with_subscription_warnings(mut self, enabled: bool) -> Self {
        self.warnings.subscriptions = enabled;
        self
    }
}

// ---------------------------------------------------------------------------
// BootstrapConfig
// ---------------------------------------------------------------------------

/// Everything [`crate::shell::bootstrap`] needs.
pub struct BootstrapConfig {
    pub document: Arc<dyn Document>,
    pub container: NodeId,
    pub apps: AppRegistry,
    pub routes: Option<Routes>,
    /// Defaults to an in-memory history when routes are given.
    pub history: Option<Arc<dyn History>>,
    pub loader: Option<Arc<dyn ModuleLoader>>,
    /// Forwarded unchanged, for hosts that build import maps.
    pub shared_libs: BTreeMap<String, String>,
    pub options: ShellOptions,
}

impl BootstrapConfig {
    pub fn new(document: Arc<dyn Document>, container: NodeId, apps: AppRegistry) -> Self {
        Self {
            document,
            container,
            apps,
            routes: None,
            history: None,
            loader: None,
            shared_libs: BTreeMap::new(),
            options: ShellOptions::default(),
        }
    }

    pub fn with_routes(mut self, routes: Routes) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn History>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_shared_lib(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.shared_libs.insert(name.into(), url.into());
        self
    }

    pub fn with_options(mut self, options: ShellOptions) -> Self {
        self.options = options;
        self
    }
}

impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("container", &self.container)
            .field("apps", &self.apps.names())
            .field("routes", &self.routes.is_some())
            .field("shared_libs", &self.shared_libs)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
