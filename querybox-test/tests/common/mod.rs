#![allow(dead_code)]

use querybox::{Api, ApiConfig, EndpointOptions, Provides, Tag};
use querybox_backend::Backend;
use querybox_test::{MockTransport, Request};
use serde_json::json;

pub type ItemsApi = Api<Request, MockTransport>;

#[derive(Debug, Clone)]
pub struct ItemUpdate {
    pub id: u64,
    pub name: String,
}

impl ItemUpdate {
    pub fn new(id: u64, name: &str) -> Self {
        ItemUpdate {
            id,
            name: name.to_owned(),
        }
    }
}

/// Items api over `transport` and `backend`:
///
/// - `getItem(u64)` query tagged `Item:{id}`
/// - `listItems(u32)` query with the static tag `Items`
/// - `updateItem(ItemUpdate)` mutation tagged `Item:{id}`, tags computed from the arguments
/// - `createItem(String)` mutation with the static tag `Items`
/// - `ping(())` mutation without tags
pub fn items_api<B>(transport: MockTransport, backend: B, config: ApiConfig) -> ItemsApi
where
    B: Backend + 'static,
{
    Api::builder(transport)
        .backend(backend)
        .config(config)
        .query("getItem", |id: &u64| {
            Provides::tagged(Request::get(format!("/items/{id}")), Tag::instance("Item", id))
        })
        .query_with(
            "listItems",
            EndpointOptions::new().tags(Tag::class("Items")),
            |page: &u32| Provides::request(Request::get(format!("/items?page={page}"))),
        )
        .mutation("updateItem", |update: &ItemUpdate| {
            Provides::tags_from(
                Request::put(format!("/items/{}", update.id), json!({ "name": update.name })),
                |update: &ItemUpdate| Tag::instance("Item", update.id).into(),
            )
        })
        .mutation_with(
            "createItem",
            EndpointOptions::new().tags(Tag::class("Items")),
            |name: &String| Provides::request(Request::post("/items", json!({ "name": name }))),
        )
        .mutation("ping", |_: &()| Provides::request(Request::post("/ping", json!({}))))
        .build()
}

pub fn item_request(id: u64) -> Request {
    Request::get(format!("/items/{id}"))
}
