use crate::catalog::{Cart, Product};
use crate::transport::{Button, Keyboard};

/// Telegram caps photo captions at 1024 characters.
pub(crate) const MAX_CAPTION_CHARS: usize = 1024;

/// Product card caption: name, price, description — truncated to the cap
/// AFTER concatenation, so a long description can never push the price out.
pub(crate) fn product_caption(product: &Product) -> String {
    let full = format!(
        "{}\n\nЦена: {}/кг\n\n{}",
        product.name, product.price, product.description
    );
    truncate_chars(full, MAX_CAPTION_CHARS)
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        text
    } else {
        text.chars().take(max).collect()
    }
}

/// One row per product in backend order, then the cart button.
pub(crate) fn menu_keyboard(products: &[Product]) -> Keyboard {
    let mut keyboard = Keyboard::default();
    for product in products {
        keyboard = keyboard.row(vec![Button::new(&product.name, &product.id)]);
    }
    keyboard.row(vec![Button::new("🛒 КОРЗИНА", "cart")])
}

/// Quantity choices plus cart/back navigation under a product card.
pub(crate) fn product_keyboard() -> Keyboard {
    Keyboard::default()
        .row(vec![
            Button::new("➕ 1 кг", "1"),
            Button::new("➕ 5 кг", "5"),
            Button::new("➕ 10 кг", "10"),
        ])
        .row(vec![Button::new("🛒 КОРЗИНА", "cart")])
        .row(vec![Button::new("Назад", "back")])
}

pub(crate) fn cart_text(cart: &Cart) -> String {
    let mut text = String::new();
    for item in &cart.items {
        text.push_str(&format!(
            "✔ {}\n{}/кг\n{} кг на {}\n\n",
            item.name, item.unit_price, item.quantity, item.line_total
        ));
    }
    text.push_str(&format!("ИТОГО: {}", cart.total));
    text
}

/// Removal button per item, then menu and checkout rows.
pub(crate) fn cart_keyboard(cart: &Cart) -> Keyboard {
    let mut keyboard = Keyboard::default();
    for item in &cart.items {
        keyboard = keyboard.row(vec![Button::new(format!("{} ✖️", item.name), &item.id)]);
    }
    keyboard
        .row(vec![Button::new("📄 В МЕНЮ", "get_menu")])
        .row(vec![Button::new("💳 ОПЛАТА", "check_out")])
}
