use crate::domain::Domain;
use crate::provider::ProviderConfig;
use crate::settings::OidcSettings;

use serde::{Deserialize, Serialize};

use std::sync::Arc;

/// Template the host renders for the provider configuration page.
pub const CONFIGURE_TEMPLATE: &str = "oidc/configure.html";

/// Template context of the provider configuration page.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct ConfigurePage {
    provider_name: String,
    domains: Vec<Domain>,
}
impl ConfigurePage {
    /// Display name of the identity issuer; empty when none is configured.
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Domains configured for the provider.
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }
}

/// A template and the context to render it with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedView {
    template: &'static str,
    context: ConfigurePage,
}
impl RenderedView {
    /// Template name.
    pub fn template(&self) -> &'static str {
        self.template
    }

    /// Template context.
    pub fn context(&self) -> &ConfigurePage {
        &self.context
    }

    /// Consumes the view, returning its context.
    pub fn into_context(self) -> ConfigurePage {
        self.context
    }
}

/// Read-only configuration page showing which domains a provider is bound to.
#[derive(Clone, Debug)]
pub struct ConfigureView {
    settings: Arc<OidcSettings>,
}
impl ConfigureView {
    /// Creates the view.
    pub fn new(settings: Arc<OidcSettings>) -> Self {
        Self { settings }
    }

    /// Renders the page for a provider's stored configuration.
    pub fn dispatch(&self, config: &ProviderConfig) -> RenderedView {
        RenderedView {
            template: CONFIGURE_TEMPLATE,
            context: ConfigurePage {
                provider_name: self
                    .settings
                    .issuer()
                    .map(|issuer| issuer.to_string())
                    .unwrap_or_default(),
                domains: config.configured_domains(),
            },
        }
    }
}
