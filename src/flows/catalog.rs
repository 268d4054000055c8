//! Operator catalog flows: categories, products and custom buttons

use rusqlite::Connection;
use url::Url;

use crate::core::money::format_credits;
use crate::core::{AppError, AppResult};
use crate::flows::parse::{
    invalid, optional_field, parse_amount, parse_id, rest_from, split_fields, split_words, usage,
};
use crate::flows::{audit, FlowContext, FlowOutcome};
use crate::storage::catalog::{self, ButtonAction, NewButton, ParentKind, ProductUpdate};

pub fn new_category(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let category = catalog::add_category(conn, text)?;
    audit(conn, user_id, &format!("add_category {}", category.name));
    Ok(FlowOutcome::reply(format!(
        "✅ Category added: {} (id={})",
        category.name, category.id
    )))
}

pub fn edit_category(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let fields = split_fields(text);
    if fields.len() != 2 {
        return invalid(usage::EDIT_CATEGORY);
    }
    let id = parse_id(fields[0], usage::EDIT_CATEGORY)?;
    catalog::rename_category(conn, id, fields[1])?;
    audit(conn, user_id, &format!("edit_category {} {}", id, fields[1]));
    Ok(FlowOutcome::reply(format!("✅ Category #{} renamed to {}.", id, fields[1])))
}

/// `categoryId | name | price | description?`
pub fn new_product(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let fields = split_fields(text);
    if fields.len() < 3 {
        return invalid(usage::NEW_PRODUCT);
    }
    let category_id = parse_id(fields[0], usage::NEW_PRODUCT)?;
    let price = parse_amount(fields[2], usage::NEW_PRODUCT)?;
    let description = rest_from(&fields, 3);

    let product = catalog::add_product(conn, category_id, fields[1], price, &description)?;
    audit(
        conn,
        user_id,
        &format!("add_product {} in category {}", product.name, category_id),
    );
    Ok(FlowOutcome::reply(format!(
        "✅ Product {} added at {} (id={}).",
        product.name,
        format_credits(product.price),
        product.id
    )))
}

/// `productId | name | price | description`, empty fields keep their value.
pub fn edit_product(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let fields = split_fields(text);
    if fields.len() < 2 {
        return invalid(usage::EDIT_PRODUCT);
    }
    let id = parse_id(fields[0], usage::EDIT_PRODUCT)?;
    let price = match optional_field(&fields, 2) {
        Some(raw) => Some(parse_amount(&raw, usage::EDIT_PRODUCT)?),
        None => None,
    };
    let description = rest_from(&fields, 3);
    let update = ProductUpdate {
        name: optional_field(&fields, 1),
        price,
        description: (!description.is_empty()).then_some(description),
    };
    if update == ProductUpdate::default() {
        return invalid(usage::EDIT_PRODUCT);
    }

    let product = catalog::update_product(conn, id, &update)?;
    audit(conn, user_id, &format!("edit_product {}", id));
    Ok(FlowOutcome::reply(format!(
        "✅ Product #{} updated: {} at {}.",
        product.id,
        product.name,
        format_credits(product.price)
    )))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Category,
    Product,
}

fn parse_item_kind(word: &str, usage: &str) -> AppResult<ItemKind> {
    match word.to_lowercase().as_str() {
        "category" | "cat" => Ok(ItemKind::Category),
        "product" | "prod" => Ok(ItemKind::Product),
        _ => invalid(usage),
    }
}

/// `category <id>` or `product <id>`. A category takes its products with it.
pub fn delete_item(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let words = split_words(text);
    if words.len() != 2 {
        return invalid(usage::DELETE_ITEM);
    }
    let kind = parse_item_kind(words[0], usage::DELETE_ITEM)?;
    let id = parse_id(words[1], usage::DELETE_ITEM)?;

    let reply = match kind {
        ItemKind::Category => {
            let removed = catalog::delete_category(conn, id)?;
            audit(conn, user_id, &format!("delete_category {}", id));
            format!("🗑 Category #{} deleted together with {} product(s).", id, removed)
        }
        ItemKind::Product => {
            catalog::delete_product(conn, id)?;
            audit(conn, user_id, &format!("delete_product {}", id));
            format!("🗑 Product #{} deleted.", id)
        }
    };
    Ok(FlowOutcome::reply(reply))
}

/// `category <id> <position>` or `product <id> <position>`; lower sorts first.
pub fn reorder(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let words = split_words(text);
    if words.len() != 3 {
        return invalid(usage::REORDER);
    }
    let kind = parse_item_kind(words[0], usage::REORDER)?;
    let id = parse_id(words[1], usage::REORDER)?;
    let position = parse_id(words[2], usage::REORDER)?;

    match kind {
        ItemKind::Category => catalog::set_category_position(conn, id, position)?,
        ItemKind::Product => catalog::set_product_position(conn, id, position)?,
    }
    audit(conn, user_id, &format!("reorder {} {} {}", words[0], id, position));
    Ok(FlowOutcome::reply(format!("✅ Position of #{} set to {}.", id, position)))
}

/// `parentType | parentId | label | action | payload?`
///
/// The parent is not checked: a button pointing at a deleted category simply
/// never shows up.
pub fn new_button(conn: &mut Connection, ctx: &FlowContext, user_id: i64, text: &str) -> AppResult<FlowOutcome> {
    ctx.require_operator(user_id)?;
    let fields = split_fields(text);
    if fields.len() < 4 || fields.len() > 5 {
        return invalid(usage::NEW_BUTTON);
    }

    let parent_kind: ParentKind = match fields[0].parse() {
        Ok(kind) => kind,
        Err(_) => {
            return Err(AppError::Validation(format!(
                "Parent type must be category, product or global. {}",
                usage::NEW_BUTTON
            )))
        }
    };
    let parent_id = parse_id(fields[1], usage::NEW_BUTTON)?;
    let action: ButtonAction = match fields[3].parse() {
        Ok(action) => action,
        Err(_) => {
            return Err(AppError::Validation(format!(
                "Action must be open_url or buy. {}",
                usage::NEW_BUTTON
            )))
        }
    };
    let payload = fields.get(4).copied().unwrap_or_default();
    match action {
        ButtonAction::OpenUrl if Url::parse(payload).is_err() => {
            return Err(AppError::Validation("open_url needs a valid link as payload.".to_string()))
        }
        ButtonAction::Buy if payload.parse::<i64>().is_err() => {
            return Err(AppError::Validation("buy needs a product id as payload.".to_string()))
        }
        _ => {}
    }

    let button = catalog::add_button(
        conn,
        &NewButton {
            parent_kind,
            parent_id,
            label: fields[2].to_string(),
            action,
            payload: payload.to_string(),
        },
    )?;
    audit(
        conn,
        user_id,
        &format!("add_button {} to {}:{}", button.label, button.parent_kind, button.parent_id),
    );
    Ok(FlowOutcome::reply(format!("✅ Button #{} added.", button.id)))
}
