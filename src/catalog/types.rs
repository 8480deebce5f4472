use serde::Deserialize;
use std::time::Duration;

// ─── Domain types ───────────────────────────────────────────────────────────

/// Bearer token for the commerce API together with its reported validity.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub valid_for: Duration,
}

/// Immutable catalog snapshot of one product. Fetched per turn, never cached
/// by the bot beyond its image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Pre-tax unit price, already formatted by the backend (e.g. `100 ₴`).
    pub price: String,
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    /// Weight in kilograms.
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub total: String,
}

/// Business outcome of an add-to-cart request. A 400 from the backend is an
/// expected result the dialogue branches on, not a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOutcome {
    Added,
    InsufficientStock,
    Rejected(String),
}

// ─── Wire types (Elastic Path JSON shapes) ──────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Wrapped<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductData {
    pub id: String,
    pub attributes: ProductAttributes,
    pub meta: ProductMeta,
    #[serde(default)]
    pub relationships: Option<ProductRelationships>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductAttributes {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductMeta {
    pub display_price: ProductDisplayPrice,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductDisplayPrice {
    pub without_tax: FormattedPrice,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FormattedPrice {
    pub formatted: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductRelationships {
    #[serde(default)]
    pub main_image: Option<ImageRelationship>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageRelationship {
    #[serde(default)]
    pub data: Option<IdRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartItemsResponse {
    pub data: Vec<CartItemData>,
    pub meta: CartMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartItemData {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub meta: CartItemMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartItemMeta {
    pub display_price: CartItemDisplayPrice,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartItemDisplayPrice {
    pub with_tax: CartItemWithTax,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartItemWithTax {
    pub unit: FormattedPrice,
    pub value: FormattedPrice,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartMeta {
    pub display_price: CartDisplayPrice,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CartDisplayPrice {
    pub with_tax: FormattedPrice,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileData {
    pub link: FileLink,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileLink {
    pub href: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrors {
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub title: String,
}

impl From<ProductData> for Product {
    fn from(data: ProductData) -> Self {
        let image_id = data
            .relationships
            .and_then(|r| r.main_image)
            .and_then(|img| img.data)
            .map(|id_ref| id_ref.id);
        Self {
            id: data.id,
            name: data.attributes.name,
            description: data.attributes.description,
            price: data.meta.display_price.without_tax.formatted,
            image_id,
        }
    }
}

impl From<CartItemData> for CartItem {
    fn from(data: CartItemData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            quantity: data.quantity,
            unit_price: data.meta.display_price.with_tax.unit.formatted,
            line_total: data.meta.display_price.with_tax.value.formatted,
        }
    }
}
