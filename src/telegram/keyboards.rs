//! Conversion of dispatch keyboards into Telegram inline markup

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::dispatch::{Button, ButtonKind, Keyboard};

fn inline_button(button: &Button) -> Option<InlineKeyboardButton> {
    match &button.kind {
        ButtonKind::Callback(data) => Some(InlineKeyboardButton::callback(button.label.clone(), data.clone())),
        ButtonKind::Url(raw) => match Url::parse(raw) {
            Ok(url) => Some(InlineKeyboardButton::url(button.label.clone(), url)),
            Err(e) => {
                log::warn!("Skipping button {:?} with invalid link {:?}: {}", button.label, raw, e);
                None
            }
        },
    }
}

/// Builds the inline markup; buttons Telegram would reject are left out.
pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .iter()
        .map(|row| row.iter().filter_map(inline_button).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();
    InlineKeyboardMarkup::new(rows)
}
