pub mod types;


use crate::error::CatalogError;
use std::time::Duration;

pub use types::{Cart, CartItem, CartOutcome, Credential, Product};
use types::{ApiErrors, CartItemsResponse, FileData, ProductData, TokenResponse, Wrapped};

const INSUFFICIENT_STOCK_TITLE: &str = "Insufficient stock";

/// Thin client for the Elastic Path commerce API.
///
/// Every method takes the credential explicitly — callers read the current
/// token from the lifecycle manager at call time, the gateway never caches it.
pub struct CatalogGateway {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_api_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Exchange client credentials for a bearer token and its validity period.
    pub async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Credential, CatalogError> {
        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "client_credentials"),
        ];
        let resp = self
            .client
            .post(self.url("/oauth/access_token"))
            .form(&form)
            .send()
            .await?;
        let body: TokenResponse = check(resp).await?.json().await?;
        Ok(Credential {
            token: body.access_token,
            valid_for: Duration::from_secs(body.expires_in),
        })
    }

    /// Full catalog listing. Backend order is display order and is preserved.
    pub async fn list_products(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Product>, CatalogError> {
        let resp = self
            .client
            .get(self.url("/catalog/products"))
            .bearer_auth(&credential.token)
            .send()
            .await?;
        let body: Wrapped<Vec<ProductData>> = check(resp).await?.json().await?;
        Ok(body.data.into_iter().map(Product::from).collect())
    }

    pub async fn get_product(
        &self,
        credential: &Credential,
        product_id: &str,
    ) -> Result<Product, CatalogError> {
        let resp = self
            .client
            .get(self.url(&format!("/catalog/products/{product_id}")))
            .bearer_auth(&credential.token)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(product_id.to_string()));
        }
        let body: Wrapped<ProductData> = check(resp).await?.json().await?;
        Ok(Product::from(body.data))
    }

    pub async fn cart_contents(
        &self,
        credential: &Credential,
        cart_id: &str,
    ) -> Result<Cart, CatalogError> {
        let resp = self
            .client
            .get(self.url(&format!("/v2/carts/{cart_id}/items")))
            .bearer_auth(&credential.token)
            .send()
            .await?;
        let body: CartItemsResponse = check(resp).await?.json().await?;
        Ok(Cart {
            items: body.data.into_iter().map(CartItem::from).collect(),
            total: body.meta.display_price.with_tax.formatted,
        })
    }

    /// Add `qty` kg of a product to the user's cart.
    ///
    /// HTTP 400 is a business outcome, not an error: the backend rejected the
    /// quantity (usually insufficient stock) and the dialogue must tell the
    /// user, not crash the turn.
    pub async fn add_to_cart(
        &self,
        credential: &Credential,
        cart_id: &str,
        product_id: &str,
        qty: u32,
    ) -> Result<CartOutcome, CatalogError> {
        let body = serde_json::json!({
            "data": {
                "id": product_id,
                "type": "cart_item",
                "quantity": qty,
            }
        });
        let resp = self
            .client
            .post(self.url(&format!("/v2/carts/{cart_id}/items")))
            .bearer_auth(&credential.token)
            .json(&body)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::BAD_REQUEST {
            let payload: ApiErrors = resp.json().await?;
            let title = payload
                .errors
                .into_iter()
                .next()
                .map_or_else(String::new, |e| e.title);
            if title == INSUFFICIENT_STOCK_TITLE {
                return Ok(CartOutcome::InsufficientStock);
            }
            return Ok(CartOutcome::Rejected(title));
        }

        check(resp).await?;
        Ok(CartOutcome::Added)
    }

    pub async fn remove_from_cart(
        &self,
        credential: &Credential,
        cart_id: &str,
        product_id: &str,
    ) -> Result<(), CatalogError> {
        let resp = self
            .client
            .delete(self.url(&format!("/v2/carts/{cart_id}/items/{product_id}")))
            .bearer_auth(&credential.token)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Create a customer record after checkout. The backend does not
    /// deduplicate — repeated checkouts create repeated records.
    pub async fn create_customer(
        &self,
        credential: &Credential,
        customer_id: &str,
        name: &str,
        email: &str,
    ) -> Result<(), CatalogError> {
        let body = serde_json::json!({
            "data": {
                "type": "customer",
                "name": format!("{customer_id} -- {name}"),
                "email": email,
                "password": customer_id,
            }
        });
        let resp = self
            .client
            .post(self.url("/v2/customers"))
            .bearer_auth(&credential.token)
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Resolve the download URL for a stored file (used by the asset cache).
    pub async fn image_url(
        &self,
        credential: &Credential,
        image_id: &str,
    ) -> Result<String, CatalogError> {
        let resp = self
            .client
            .get(self.url(&format!("/v2/files/{image_id}")))
            .bearer_auth(&credential.token)
            .send()
            .await?;
        let body: Wrapped<FileData> = check(resp).await?.json().await?;
        Ok(body.data.link.href)
    }
}

/// Map any unexpected non-2xx response to [`CatalogError::Remote`].
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
    Err(CatalogError::Remote { status, body })
}

fn build_api_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
