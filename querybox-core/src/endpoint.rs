//! What request builders produce.
//!
//! A request builder is a user-declared pure function from call arguments
//! to a request descriptor, optionally with tags. It returns a [`Provides`]
//! value; the engine resolves it against the same call arguments into a
//! [`RequestDef`], the closed two-variant form the rest of the pipeline uses.
//!
//! ```
//! use querybox_core::{Provides, RequestDef, Tag};
//!
//! fn get_item(id: &u64) -> Provides<String, u64> {
//!     Provides::tags_from(format!("/items/{id}"), |id: &u64| Tag::instance("Item", id).into())
//! }
//!
//! let def = get_item(&42).resolve(&42);
//! assert_eq!(def.request(), "/items/42");
//! assert_eq!(def.tags().unwrap().iter().next().unwrap().to_string(), "Item:42");
//!
//! let bare: RequestDef<String> = Provides::<_, u64>::request("/health".to_owned()).resolve(&0);
//! assert!(bare.tags().is_none());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TagSet;

/// Whether an endpoint reads (and caches) or writes (and invalidates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointMode {
    /// Read operation; responses are cached under the request and its tags.
    Query,
    /// Write operation; never served from cache, invalidates its tags.
    Mutation,
}

impl fmt::Display for EndpointMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointMode::Query => f.write_str("query"),
            EndpointMode::Mutation => f.write_str("mutation"),
        }
    }
}

/// Tag-producing function evaluated against the call arguments.
pub type TagFn<A> = Box<dyn FnOnce(&A) -> TagSet + Send>;

/// Output of a request builder.
pub enum Provides<Req, A> {
    /// A bare request without tags.
    Request(Req),
    /// A request with a literal tag set.
    Tagged(Req, TagSet),
    /// A request whose tags are computed from the call arguments.
    TagsFrom(Req, TagFn<A>),
}

impl<Req, A> Provides<Req, A> {
    /// A bare request without tags.
    pub fn request(request: Req) -> Self {
        Provides::Request(request)
    }

    /// A request carrying `tags`.
    pub fn tagged(request: Req, tags: impl Into<TagSet>) -> Self {
        Provides::Tagged(request, tags.into())
    }

    /// A request whose tags are produced by `tags` from the call arguments.
    pub fn tags_from<F>(request: Req, tags: F) -> Self
    where
        F: FnOnce(&A) -> TagSet + Send + 'static,
    {
        Provides::TagsFrom(request, Box::new(tags))
    }

    /// Resolves lazily computed tags against the call arguments.
    pub fn resolve(self, args: &A) -> RequestDef<Req> {
        match self {
            Provides::Request(request) => RequestDef::RequestOnly(request),
            Provides::Tagged(request, tags) => RequestDef::RequestWithTags(request, tags),
            Provides::TagsFrom(request, tags) => RequestDef::RequestWithTags(request, tags(args)),
        }
    }
}

impl<Req: fmt::Debug, A> fmt::Debug for Provides<Req, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provides::Request(request) => f.debug_tuple("Request").field(request).finish(),
            Provides::Tagged(request, tags) => {
                f.debug_tuple("Tagged").field(request).field(tags).finish()
            }
            Provides::TagsFrom(request, _) => {
                f.debug_tuple("TagsFrom").field(request).field(&"...").finish()
            }
        }
    }
}

/// A built request, with or without tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDef<Req> {
    /// The builder produced only a request.
    RequestOnly(Req),
    /// The builder produced a request and the tags it provides or invalidates.
    RequestWithTags(Req, TagSet),
}

impl<Req> RequestDef<Req> {
    /// Returns the request descriptor.
    pub fn request(&self) -> &Req {
        match self {
            RequestDef::RequestOnly(request) | RequestDef::RequestWithTags(request, _) => request,
        }
    }

    /// Returns the tags, if the builder produced any.
    pub fn tags(&self) -> Option<&TagSet> {
        match self {
            RequestDef::RequestOnly(_) => None,
            RequestDef::RequestWithTags(_, tags) => Some(tags),
        }
    }

    /// Splits into the request and its tags (empty when none were produced).
    pub fn into_parts(self) -> (Req, TagSet) {
        match self {
            RequestDef::RequestOnly(request) => (request, TagSet::new()),
            RequestDef::RequestWithTags(request, tags) => (request, tags),
        }
    }
}
