//! Endpoint registry.
//!
//! Maps endpoint names to request builders. Builders take different argument
//! types, so they are stored type-erased and the call arguments are checked
//! against the registered type on every dispatch.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use querybox_core::{EndpointMode, Provides, RequestDef, TagSet};
use smol_str::SmolStr;

use crate::error::ApiError;

type ErasedBuilder<Req> = Arc<dyn Fn(&dyn Any) -> Option<RequestDef<Req>> + Send + Sync>;

/// Per-endpoint settings given at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointOptions {
    tags: TagSet,
    ttl: Option<Duration>,
}

impl EndpointOptions {
    /// Options with no static tags and the api-wide ttl.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags added to every call, after the ones the builder produces.
    ///
    /// For a query these are provided, for a mutation invalidated.
    pub fn tags(mut self, tags: impl Into<TagSet>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Overrides the api-wide ttl of responses cached by this query.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Returns the static tags.
    pub fn static_tags(&self) -> &TagSet {
        &self.tags
    }

    /// Returns the ttl override.
    pub fn ttl_override(&self) -> Option<Duration> {
        self.ttl
    }
}

/// A registered endpoint.
pub struct Endpoint<Req> {
    name: SmolStr,
    mode: EndpointMode,
    args_type: &'static str,
    builder: ErasedBuilder<Req>,
    options: EndpointOptions,
}

impl<Req> Endpoint<Req> {
    /// Returns the endpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether this is a query or a mutation.
    pub fn mode(&self) -> EndpointMode {
        self.mode
    }

    /// Returns the options given at registration.
    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    /// Runs the request builder and appends the static tags.
    ///
    /// Fails with [`ApiError::ArgumentType`] when `args` is not of the type
    /// the builder was registered with.
    pub fn build<E>(&self, args: &dyn Any) -> Result<RequestDef<Req>, ApiError<E>> {
        let def = (self.builder)(args).ok_or_else(|| ApiError::ArgumentType {
            name: self.name.clone(),
            expected: self.args_type,
        })?;
        if self.options.tags.is_empty() {
            return Ok(def);
        }
        let (request, tags) = def.into_parts();
        Ok(RequestDef::RequestWithTags(
            request,
            tags.merged(&self.options.tags),
        ))
    }
}

impl<Req> fmt::Debug for Endpoint<Req> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("args_type", &self.args_type)
            .field("options", &self.options)
            .finish()
    }
}

/// Endpoints by name.
pub struct Registry<Req> {
    endpoints: HashMap<SmolStr, Endpoint<Req>>,
}

impl<Req> Default for Registry<Req> {
    fn default() -> Self {
        Registry {
            endpoints: HashMap::new(),
        }
    }
}

impl<Req> Registry<Req> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `builder` under `name`, replacing any previous endpoint
    /// with that name.
    pub fn register<A, F>(
        &mut self,
        name: impl Into<SmolStr>,
        mode: EndpointMode,
        options: EndpointOptions,
        builder: F,
    ) where
        Req: 'static,
        A: Any,
        F: Fn(&A) -> Provides<Req, A> + Send + Sync + 'static,
    {
        let name = name.into();
        let builder: ErasedBuilder<Req> = Arc::new(move |args: &dyn Any| {
            args.downcast_ref::<A>()
                .map(|args| builder(args).resolve(args))
        });
        let endpoint = Endpoint {
            name: name.clone(),
            mode,
            args_type: type_name::<A>(),
            builder,
            options,
        };
        if self.endpoints.insert(name.clone(), endpoint).is_some() {
            tracing::debug!(endpoint = %name, %mode, "Endpoint re-registered");
        }
    }

    /// Finds the endpoint registered under `name` with `mode`.
    pub fn lookup<E>(&self, name: &str, mode: EndpointMode) -> Result<&Endpoint<Req>, ApiError<E>> {
        let endpoint = self
            .endpoints
            .get(name)
            .ok_or_else(|| ApiError::EndpointNotFound {
                name: SmolStr::new(name),
            })?;
        if endpoint.mode != mode {
            return Err(ApiError::ModeMismatch {
                name: endpoint.name.clone(),
                expected: mode,
                actual: endpoint.mode,
            });
        }
        Ok(endpoint)
    }

    /// Returns the endpoint registered under `name`, whatever its mode.
    pub fn get(&self, name: &str) -> Option<&Endpoint<Req>> {
        self.endpoints.get(name)
    }

    /// Returns the number of registered endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl<Req> fmt::Debug for Registry<Req> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.endpoints.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use querybox_core::Tag;

    use super::*;

    type Error = ApiError<std::io::Error>;

    fn registry() -> Registry<String> {
        let mut registry = Registry::new();
        registry.register(
            "getItem",
            EndpointMode::Query,
            EndpointOptions::new().tags(Tag::class("Items")),
            |id: &u64| Provides::tags_from(format!("/items/{id}"), |id: &u64| Tag::instance("Item", id).into()),
        );
        registry.register(
            "updateItem",
            EndpointMode::Mutation,
            EndpointOptions::new(),
            |id: &u64| Provides::request(format!("/items/{id}")),
        );
        registry
    }

    #[test]
    fn test_lookup_unknown_endpoint() {
        let err = registry()
            .lookup::<std::io::Error>("nope", EndpointMode::Query)
            .unwrap_err();
        assert!(matches!(err, Error::EndpointNotFound { name } if name == "nope"));
    }

    #[test]
    fn test_lookup_with_wrong_mode() {
        let registry = registry();
        let err = registry
            .lookup::<std::io::Error>("updateItem", EndpointMode::Query)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ModeMismatch {
                expected: EndpointMode::Query,
                actual: EndpointMode::Mutation,
                ..
            }
        ));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_merges_static_tags_after_builder_tags() {
        let registry = registry();
        let endpoint = registry
            .lookup::<std::io::Error>("getItem", EndpointMode::Query)
            .unwrap();

        let (request, tags) = endpoint.build::<std::io::Error>(&42u64).unwrap().into_parts();

        assert_eq!(request, "/items/42");
        let rendered: Vec<String> = tags.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["Item:42", "Items"]);
    }

    #[test]
    fn test_build_with_wrong_argument_type() {
        let registry = registry();
        let endpoint = registry.get("getItem").unwrap();

        let err = endpoint.build::<std::io::Error>(&"42").unwrap_err();

        assert!(matches!(err, Error::ArgumentType { expected: "u64", .. }));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = registry();
        registry.register(
            "getItem",
            EndpointMode::Mutation,
            EndpointOptions::new(),
            |_: &()| Provides::request("/reset".to_owned()),
        );

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("getItem").unwrap().mode(), EndpointMode::Mutation);
        assert!(registry
            .lookup::<std::io::Error>("getItem", EndpointMode::Query)
            .is_err());
    }
}
