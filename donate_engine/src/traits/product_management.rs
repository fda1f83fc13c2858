use crate::{
    db_types::{NewProduct, Product, UpdateProductRequest},
    traits::StorefrontDbError,
};

/// Product catalog CRUD.
#[allow(async_fn_in_trait)]
pub trait ProductManagement: Clone {
    /// Every product, including hidden and archived ones. The admin view.
    async fn all_products(&self) -> Result<Vec<Product>, StorefrontDbError>;

    /// Active products only, ordered by ascending price. The public catalog.
    async fn listed_products(&self) -> Result<Vec<Product>, StorefrontDbError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StorefrontDbError>;

    /// Apply a partial update. Only the supplied fields are written; `updated_at` is always refreshed.
    async fn update_product(&self, product_id: i64, update: UpdateProductRequest)
        -> Result<Product, StorefrontDbError>;

    /// Delete the product and, in the same transaction, its orders and their payments.
    async fn delete_product(&self, product_id: i64) -> Result<Product, StorefrontDbError>;
}
