use std::fmt::Debug;

use log::*;
use serde_json::json;

use crate::{
    api::errors::OrderFlowError,
    db_types::{NewAuditEntry, NewProduct, Product, UpdateProductRequest},
    traits::{AuditLogging, ProductManagement},
};

/// Product catalog management, with audit-trail writes on every mutation.
pub struct ProductApi<B> {
    db: B,
}

impl<B> Debug for ProductApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProductApi")
    }
}

impl<B: Clone> Clone for ProductApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> ProductApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ProductApi<B>
where B: ProductManagement + AuditLogging
{
    /// Active products ordered by ascending price. The public catalog.
    pub async fn listed_products(&self) -> Result<Vec<Product>, OrderFlowError> {
        Ok(self.db.listed_products().await?)
    }

    /// Every product, hidden and archived included. The admin view.
    pub async fn all_products(&self) -> Result<Vec<Product>, OrderFlowError> {
        Ok(self.db.all_products().await?)
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, OrderFlowError> {
        let product = self.db.insert_product(product).await?;
        let entry = NewAuditEntry::new("PRODUCT_CREATE", "product")
            .for_entity_id(product.id)
            .with_metadata(json!({ "name": product.name, "price": product.price.value() }));
        self.db.insert_audit_entry(entry).await?;
        info!("🗃️ Product #{} ({}) created", product.id, product.name);
        Ok(product)
    }

    pub async fn update_product(
        &self,
        product_id: i64,
        update: UpdateProductRequest,
    ) -> Result<Product, OrderFlowError> {
        let product = self.db.update_product(product_id, update).await?;
        let entry = NewAuditEntry::new("PRODUCT_UPDATE", "product").for_entity_id(product.id);
        self.db.insert_audit_entry(entry).await?;
        info!("🗃️ Product #{} ({}) updated", product.id, product.name);
        Ok(product)
    }

    /// Delete a product along with its orders and their payments.
    pub async fn delete_product(&self, product_id: i64) -> Result<Product, OrderFlowError> {
        let product = self.db.delete_product(product_id).await?;
        let entry = NewAuditEntry::new("PRODUCT_DELETE", "product")
            .for_entity_id(product.id)
            .with_metadata(json!({ "name": product.name }));
        self.db.insert_audit_entry(entry).await?;
        info!("🗃️ Product #{} ({}) deleted", product.id, product.name);
        Ok(product)
    }
}
