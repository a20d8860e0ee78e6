//! Plugin registry with domain-based lookup and a generic fallback.

use tracing::{debug, instrument};
use url::Url;

use super::{ANY_DOMAIN, GenericPlugin, Plugin};
use crate::download::HttpClient;

/// An ordered collection of plugins.
///
/// Lookup tries plugins in registration order; the first one that lists the
/// URL host among its domains and accepts the URL wins. When none does, the
/// [`GenericPlugin`] fallback is used.
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
    fallback: GenericPlugin,
}

impl PluginRegistry {
    /// Creates an empty registry with the given fallback.
    #[must_use]
    pub fn new(fallback: GenericPlugin) -> Self {
        Self {
            plugins: Vec::new(),
            fallback,
        }
    }

    /// Registers a plugin; earlier registrations win.
    #[instrument(skip(self, plugin), fields(plugin_name = plugin.name()))]
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        debug!(domains = ?plugin.domains(), "registering plugin");
        self.plugins.push(plugin);
    }

    /// Returns the number of registered plugins (excluding the fallback).
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if only the fallback is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Registered plugins followed by the fallback, in lookup order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Plugin> {
        let fallback: &dyn Plugin = &self.fallback;
        self.plugins
            .iter()
            .map(|plugin| {
                let plugin: &dyn Plugin = plugin.as_ref();
                plugin
            })
            .chain(std::iter::once(fallback))
    }

    /// Finds the plugin responsible for `url`.
    #[must_use]
    #[instrument(skip(self), fields(url = %url))]
    pub fn find(&self, url: &Url) -> &dyn Plugin {
        let host = url.host_str().unwrap_or_default();
        let found = self.plugins.iter().find(|plugin| {
            plugin
                .domains()
                .iter()
                .any(|domain| *domain == ANY_DOMAIN || domain.eq_ignore_ascii_case(host))
                && plugin.can_handle(url)
        });
        match found {
            Some(plugin) => {
                debug!(plugin = plugin.name(), "found plugin");
                plugin.as_ref()
            }
            None => {
                debug!(plugin = self.fallback.name(), "no plugin matched; using fallback");
                &self.fallback
            }
        }
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

/// Builds the registry used by the download service.
#[must_use]
pub fn build_default_plugin_registry(client: HttpClient) -> PluginRegistry {
    PluginRegistry::new(GenericPlugin::new(client))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::{Path, PathBuf};

    use async_trait::async_trait;

    use super::*;
    use crate::model::{Content, Manifest};
    use crate::plugin::PluginError;

    struct SitePlugin {
        name: &'static str,
        domains: &'static [&'static str],
        path_prefix: &'static str,
    }

    #[async_trait]
    impl Plugin for SitePlugin {
        fn name(&self) -> &str {
            self.name
        }

        fn domains(&self) -> &[&str] {
            self.domains
        }

        fn can_handle(&self, url: &Url) -> bool {
            url.path().starts_with(self.path_prefix)
        }

        async fn extract_content(&self, _url: &Url) -> Result<Vec<Content>, PluginError> {
            Ok(Vec::new())
        }

        async fn write_content(
            &self,
            _manifest: &Manifest,
            to_path: &Path,
        ) -> Result<PathBuf, PluginError> {
            Ok(to_path.to_path_buf())
        }
    }

    fn registry() -> PluginRegistry {
        let mut registry = build_default_plugin_registry(HttpClient::new());
        registry.register(Box::new(SitePlugin {
            name: "videos",
            domains: &["videos.example.com"],
            path_prefix: "/watch",
        }));
        registry.register(Box::new(SitePlugin {
            name: "music",
            domains: &["music.example.com", "www.music.example.com"],
            path_prefix: "/",
        }));
        registry
    }

    #[test]
    fn test_find_matches_domain_and_can_handle() {
        let registry = registry();
        let url: Url = "https://videos.example.com/watch?v=1".parse().unwrap();
        assert_eq!(registry.find(&url).name(), "videos");

        let url: Url = "https://WWW.music.example.com/track/2".parse().unwrap();
        assert_eq!(registry.find(&url).name(), "music");
    }

    #[test]
    fn test_find_falls_back_when_can_handle_rejects() {
        let registry = registry();
        let url: Url = "https://videos.example.com/about".parse().unwrap();
        assert_eq!(registry.find(&url).name(), GenericPlugin::NAME);
    }

    #[test]
    fn test_find_falls_back_for_unknown_domain() {
        let registry = registry();
        let url: Url = "https://elsewhere.example.org/watch".parse().unwrap();
        assert_eq!(registry.find(&url).name(), GenericPlugin::NAME);
    }

    #[test]
    fn test_iter_lists_fallback_last() {
        let registry = registry();
        let names: Vec<_> = registry.iter().map(|plugin| plugin.name()).collect();
        assert_eq!(names, vec!["videos", "music", GenericPlugin::NAME]);
        assert_eq!(registry.len(), 2);
    }
}
