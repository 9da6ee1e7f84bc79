//! Product catalog database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::Product;

impl Database {
    /// Insert or update a product.
    pub fn upsert_product(&self, product: &Product) -> DbResult<()> {
        let aliases_json = serde_json::to_string(&product.aliases)?;

        self.conn.execute(
            r#"
            INSERT INTO products (
                sku, name, aliases, prescription_required, active, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
            ON CONFLICT(sku) DO UPDATE SET
                name = excluded.name,
                aliases = excluded.aliases,
                prescription_required = excluded.prescription_required,
                active = excluded.active,
                updated_at = datetime('now')
            "#,
            params![
                product.sku,
                product.name,
                aliases_json,
                product.prescription_required,
                product.active,
            ],
        )?;
        Ok(())
    }

    /// Get a product by SKU.
    pub fn get_product(&self, sku: &str) -> DbResult<Option<Product>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT sku, name, aliases, prescription_required, active
                FROM products
                WHERE sku = ?
                "#,
                [sku],
                |row| {
                    Ok(ProductRow {
                        sku: row.get(0)?,
                        name: row.get(1)?,
                        aliases: row.get(2)?,
                        prescription_required: row.get(3)?,
                        active: row.get(4)?,
                    })
                },
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// Search products using FTS5 (BM25 ranking), active items only.
    pub fn search_products(&self, query: &str, limit: usize) -> DbResult<Vec<Product>> {
        let escaped_query = escape_fts_query(query);
        if escaped_query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.sku, p.name, p.aliases, p.prescription_required, p.active,
                   bm25(products_fts) as rank
            FROM products p
            JOIN products_fts fts ON p.rowid = fts.rowid
            WHERE products_fts MATCH ?
            AND p.active = 1
            ORDER BY rank
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(params![escaped_query, limit as i64], |row| {
            Ok(ProductRow {
                sku: row.get(0)?,
                name: row.get(1)?,
                aliases: row.get(2)?,
                prescription_required: row.get(3)?,
                active: row.get(4)?,
            })
        })?;

        let mut products = Vec::new();
        for row in rows {
            products.push(row?.try_into()?);
        }
        Ok(products)
    }

    /// Mark a product as inactive (soft delete).
    pub fn deactivate_product(&self, sku: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE products SET active = 0, updated_at = datetime('now') WHERE sku = ?",
            [sku],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct ProductRow {
    sku: String,
    name: String,
    aliases: String,
    prescription_required: bool,
    active: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            sku: row.sku,
            name: row.name,
            aliases: serde_json::from_str(&row.aliases)?,
            prescription_required: row.prescription_required,
            active: row.active,
        })
    }
}

/// Escape special FTS5 characters and prepare query for prefix matching.
fn escape_fts_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| format!("{}*", word))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup_db();

        let mut product = Product::new("AMOX-250".into(), "Amoxicillin 250mg Capsules".into())
            .requiring_prescription();
        product.aliases = vec!["amoxil".into()];
        db.upsert_product(&product).unwrap();

        let retrieved = db.get_product("AMOX-250").unwrap().unwrap();
        assert_eq!(retrieved.name, "Amoxicillin 250mg Capsules");
        assert!(retrieved.prescription_required);
        assert_eq!(retrieved.aliases, vec!["amoxil"]);
    }

    #[test]
    fn test_upsert_updates() {
        let db = setup_db();

        let mut product = Product::new("AMOX-250".into(), "Original".into());
        db.upsert_product(&product).unwrap();

        product.name = "Updated".into();
        db.upsert_product(&product).unwrap();

        let retrieved = db.get_product("AMOX-250").unwrap().unwrap();
        assert_eq!(retrieved.name, "Updated");
    }

    #[test]
    fn test_search_by_name_alias_and_prefix() {
        let db = setup_db();

        let mut amox = Product::new("AMOX-250".into(), "Amoxicillin 250mg Capsules".into());
        amox.aliases = vec!["amoxil".into()];
        db.upsert_product(&amox).unwrap();
        db.upsert_product(&Product::new("PARA-500".into(), "Paracetamol 500mg".into()))
            .unwrap();

        let results = db.search_products("amoxicillin", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].sku, "AMOX-250");

        let results = db.search_products("amoxil", 10).unwrap();
        assert_eq!(results.len(), 1);

        let results = db.search_products("amox", 10).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_search_punctuation_only_query() {
        let db = setup_db();
        let results = db.search_products("***", 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_deactivated_hidden_from_search() {
        let db = setup_db();
        db.upsert_product(&Product::new("AMOX-250".into(), "Amoxicillin 250mg".into()))
            .unwrap();
        db.deactivate_product("AMOX-250").unwrap();

        assert!(db.search_products("amoxicillin", 10).unwrap().is_empty());
        assert!(!db.get_product("AMOX-250").unwrap().unwrap().active);
    }
}
