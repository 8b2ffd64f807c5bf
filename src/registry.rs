use indexmap::IndexMap;
use log::debug;
use url::Url;

use crate::auth::Credentials;
use crate::error::{JenkinsError, Result};

/// A named Jenkins endpoint with the credentials used to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub name: String,
    pub url: Url,
    pub credentials: Credentials,
    pub is_default: bool,
}

impl Environment {
    pub fn new(name: impl Into<String>, url: &str, credentials: Credentials) -> Result<Self> {
        let name = name.into();
        let mut url = Url::parse(url)
            .map_err(|e| JenkinsError::Config(format!("Invalid URL for '{name}': {e}")))?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(JenkinsError::Config(format!(
                "URL for '{name}' must be an http(s) address"
            )));
        }

        // Relative joins only work against a directory-like base
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            name,
            url,
            credentials,
            is_default: false,
        })
    }
}

/// The set of configured environments for one invocation.
///
/// Keeps insertion order and guarantees that a non-empty registry has
/// exactly one default environment.
#[derive(Debug, Default, Clone)]
pub struct EnvironmentRegistry {
    environments: IndexMap<String, Environment>,
}

impl EnvironmentRegistry {
    /// Builds a registry from persisted environments.
    ///
    /// `current` names the default; when it is absent or unknown the first
    /// environment becomes the default.
    pub fn from_environments(
        environments: impl IntoIterator<Item = Environment>,
        current: Option<&str>,
    ) -> Self {
        let mut registry = Self::default();
        for mut env in environments {
            env.is_default = false;
            registry.environments.insert(env.name.clone(), env);
        }

        let fallback = registry.environments.keys().next().cloned();
        let default = current
            .filter(|name| registry.environments.contains_key(*name))
            .map(str::to_owned)
            .or(fallback);

        if let Some(default) = default {
            registry.mark_default(&default);
        }

        registry
    }

    /// Resolves an explicit name, or the default environment when `name` is empty.
    pub fn resolve(&self, name: &str) -> Result<&Environment> {
        if self.environments.is_empty() {
            return Err(JenkinsError::NoEnvironmentsConfigured);
        }

        if name.is_empty() {
            return self
                .environments
                .values()
                .find(|env| env.is_default)
                .ok_or(JenkinsError::NoEnvironmentsConfigured);
        }

        self.environments
            .get(name)
            .ok_or_else(|| JenkinsError::EnvironmentNotFound(name.to_owned()))
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.environments.contains_key(name) {
            return Err(JenkinsError::EnvironmentNotFound(name.to_owned()));
        }

        self.mark_default(name);
        Ok(())
    }

    /// Adds or replaces an environment. A replaced environment keeps its default
    /// flag; the first environment added becomes the default.
    pub fn set(&mut self, mut env: Environment) {
        env.is_default = self
            .environments
            .get(&env.name)
            .is_some_and(|existing| existing.is_default);

        let name = env.name.clone();
        self.environments.insert(name.clone(), env);

        if self.default_name().is_none() {
            self.mark_default(&name);
        }
    }

    /// Removes an environment. Deleting the default hands the flag to the first
    /// remaining environment.
    pub fn delete(&mut self, name: &str) -> Result<Environment> {
        let removed = self
            .environments
            .shift_remove(name)
            .ok_or_else(|| JenkinsError::EnvironmentNotFound(name.to_owned()))?;

        if removed.is_default {
            if let Some(next) = self.environments.keys().next().cloned() {
                debug!("Default environment '{name}' deleted, '{next}' is now the default");
                self.mark_default(&next);
            }
        }

        Ok(removed)
    }

    /// Environment names in configuration order.
    pub fn list(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }

    pub fn environments(&self) -> impl Iterator<Item = &Environment> {
        self.environments.values()
    }

    pub fn default_name(&self) -> Option<&str> {
        self.environments
            .values()
            .find(|env| env.is_default)
            .map(|env| env.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    fn mark_default(&mut self, name: &str) {
        for env in self.environments.values_mut() {
            env.is_default = env.name == name;
        }
    }
}
