//! Categories, products and operator-defined inline buttons

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use strum::{Display, EnumString};

use crate::core::{AppError, AppResult};
use crate::storage::db::{decimal_column, parsed_column};

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub position: i64,
}

/// Where a custom button is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ParentKind {
    Category,
    Product,
    /// Main menu; `parent_id` is ignored and stored as 0
    Global,
}

/// What a custom button does when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ButtonAction {
    /// Opens `payload` as a link
    OpenUrl,
    /// Buys the product whose id is `payload`
    Buy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomButton {
    pub id: i64,
    pub parent_kind: ParentKind,
    pub parent_id: i64,
    pub label: String,
    pub action: ButtonAction,
    pub payload: String,
}

/// Input for [`add_button`]. The parent is not checked for existence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewButton {
    pub parent_kind: ParentKind,
    pub parent_id: i64,
    pub label: String,
    pub action: ButtonAction,
    pub payload: String,
}

/// Field-wise product edit; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

/// New rows sort after everything created before them.
fn next_position() -> i64 {
    Utc::now().timestamp_millis()
}

fn validate_name(name: &str, what: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(format!("{} name cannot be empty.", what)));
    }
    Ok(name.to_string())
}

fn validate_price(price: Decimal) -> AppResult<Decimal> {
    if price < Decimal::ZERO {
        return Err(AppError::Validation("Price must be a non-negative number.".to_string()));
    }
    Ok(price.normalize())
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        position: row.get(2)?,
    })
}

const PRODUCT_COLUMNS: &str = "id, category_id, name, price, description, position";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
        price: decimal_column(row, 3)?,
        description: row.get(4)?,
        position: row.get(5)?,
    })
}

const BUTTON_COLUMNS: &str = "id, parent_kind, parent_id, label, action, payload";

fn button_from_row(row: &Row<'_>) -> rusqlite::Result<CustomButton> {
    Ok(CustomButton {
        id: row.get(0)?,
        parent_kind: parsed_column(row, 1)?,
        parent_id: row.get(2)?,
        label: row.get(3)?,
        action: parsed_column(row, 4)?,
        payload: row.get(5)?,
    })
}

// ==================== Categories ====================

pub fn add_category(conn: &Connection, name: &str) -> AppResult<Category> {
    let name = validate_name(name, "Category")?;
    let position = next_position();
    conn.execute(
        "INSERT INTO categories (name, position) VALUES (?1, ?2)",
        params![name, position],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        name,
        position,
    })
}

pub fn get_category(conn: &Connection, id: i64) -> AppResult<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name, position FROM categories WHERE id = ?1",
            [id],
            category_from_row,
        )
        .optional()?;
    Ok(category)
}

pub fn list_categories(conn: &Connection) -> AppResult<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name, position FROM categories ORDER BY position ASC, id ASC")?;
    let categories = stmt.query_map([], category_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn rename_category(conn: &Connection, id: i64, name: &str) -> AppResult<()> {
    let name = validate_name(name, "Category")?;
    let changed = conn.execute("UPDATE categories SET name = ?1 WHERE id = ?2", params![name, id])?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Category #{}", id)));
    }
    Ok(())
}

pub fn set_category_position(conn: &Connection, id: i64, position: i64) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE categories SET position = ?1 WHERE id = ?2",
        params![position, id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Category #{}", id)));
    }
    Ok(())
}

/// Deletes a category together with its products in one transaction.
///
/// Returns the number of products removed.
pub fn delete_category(conn: &mut Connection, id: i64) -> AppResult<usize> {
    let tx = conn.transaction()?;
    let products = tx.execute("DELETE FROM products WHERE category_id = ?1", [id])?;
    let changed = tx.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    if changed == 0 {
        // Dropping the transaction rolls back
        return Err(AppError::NotFound(format!("Category #{}", id)));
    }
    tx.commit()?;
    Ok(products)
}

// ==================== Products ====================

/// Adds a product at the end of its category's listing.
pub fn add_product(
    conn: &Connection,
    category_id: i64,
    name: &str,
    price: Decimal,
    description: &str,
) -> AppResult<Product> {
    let name = validate_name(name, "Product")?;
    let price = validate_price(price)?;
    if get_category(conn, category_id)?.is_none() {
        return Err(AppError::Validation(format!("Category #{} does not exist.", category_id)));
    }

    let description = description.trim().to_string();
    let position = next_position();
    conn.execute(
        "INSERT INTO products (category_id, name, price, description, position) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![category_id, name, price.to_string(), description, position],
    )?;
    Ok(Product {
        id: conn.last_insert_rowid(),
        category_id,
        name,
        price,
        description,
        position,
    })
}

pub fn get_product(conn: &Connection, id: i64) -> AppResult<Option<Product>> {
    let product = conn
        .query_row(
            &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS),
            [id],
            product_from_row,
        )
        .optional()?;
    Ok(product)
}

pub fn list_products(conn: &Connection, category_id: i64) -> AppResult<Vec<Product>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM products WHERE category_id = ?1 ORDER BY position ASC, id ASC",
        PRODUCT_COLUMNS
    ))?;
    let products = stmt
        .query_map([category_id], product_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(products)
}

/// Applies the given fields. Orders keep the price they were placed at.
pub fn update_product(conn: &Connection, id: i64, update: &ProductUpdate) -> AppResult<Product> {
    let mut product = get_product(conn, id)?.ok_or_else(|| AppError::NotFound(format!("Product #{}", id)))?;

    if let Some(name) = &update.name {
        product.name = validate_name(name, "Product")?;
    }
    if let Some(price) = update.price {
        product.price = validate_price(price)?;
    }
    if let Some(description) = &update.description {
        product.description = description.trim().to_string();
    }

    conn.execute(
        "UPDATE products SET name = ?1, price = ?2, description = ?3 WHERE id = ?4",
        params![product.name, product.price.to_string(), product.description, id],
    )?;
    Ok(product)
}

pub fn set_product_position(conn: &Connection, id: i64, position: i64) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE products SET position = ?1 WHERE id = ?2",
        params![position, id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Product #{}", id)));
    }
    Ok(())
}

pub fn delete_product(conn: &Connection, id: i64) -> AppResult<()> {
    let changed = conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Product #{}", id)));
    }
    Ok(())
}

pub fn count_products(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?)
}

// ==================== Custom buttons ====================

pub fn add_button(conn: &Connection, button: &NewButton) -> AppResult<CustomButton> {
    let label = button.label.trim();
    if label.is_empty() {
        return Err(AppError::Validation("Button label cannot be empty.".to_string()));
    }
    let parent_id = match button.parent_kind {
        ParentKind::Global => 0,
        _ => button.parent_id,
    };
    let payload = button.payload.trim();

    conn.execute(
        "INSERT INTO buttons (parent_kind, parent_id, label, action, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            button.parent_kind.to_string(),
            parent_id,
            label,
            button.action.to_string(),
            payload
        ],
    )?;
    Ok(CustomButton {
        id: conn.last_insert_rowid(),
        parent_kind: button.parent_kind,
        parent_id,
        label: label.to_string(),
        action: button.action,
        payload: payload.to_string(),
    })
}

pub fn list_buttons(conn: &Connection) -> AppResult<Vec<CustomButton>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM buttons ORDER BY id", BUTTON_COLUMNS))?;
    let buttons = stmt.query_map([], button_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(buttons)
}

/// Buttons attached to one parent. For [`ParentKind::Global`] the id is ignored.
pub fn buttons_for(conn: &Connection, parent_kind: ParentKind, parent_id: i64) -> AppResult<Vec<CustomButton>> {
    let parent_id = match parent_kind {
        ParentKind::Global => 0,
        _ => parent_id,
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM buttons WHERE parent_kind = ?1 AND parent_id = ?2 ORDER BY id",
        BUTTON_COLUMNS
    ))?;
    let buttons = stmt
        .query_map(params![parent_kind.to_string(), parent_id], button_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(buttons)
}
