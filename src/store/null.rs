use std::time::Duration;

use async_trait::async_trait;

use super::{LinkStore, Lookup, StoreError};
use crate::config::Config;
use crate::link::ResolvedLink;
use crate::resolver::LinkResolver;

/// A store that remembers nothing; every `get` resolves.
pub struct NullStore {
    resolver: LinkResolver,
    config: Config,
}

impl NullStore {
    #[must_use]
    pub fn new(resolver: LinkResolver, config: Config) -> Self {
        Self { resolver, config }
    }
}

#[async_trait]
impl LinkStore for NullStore {
    async fn resolve(&self, url_text: &str) -> ResolvedLink {
        self.resolver.resolve_with_config(url_text, &self.config).await
    }

    async fn find(&self, _url_text: &str) -> Result<Lookup, StoreError> {
        Ok(Lookup::miss())
    }

    async fn save(&self, _link: &ResolvedLink, _ttl: Option<Duration>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
