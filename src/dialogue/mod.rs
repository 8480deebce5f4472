mod render;


use crate::assets::AssetCache;
use crate::catalog::{CartOutcome, CatalogGateway};
use crate::session::SessionState;
use crate::token::TokenManager;
use crate::transport::{InboundKind, Keyboard, OutboundMessage};
use regex::Regex;
use std::sync::{Arc, LazyLock};

use render::{cart_keyboard, cart_text, menu_keyboard, product_caption, product_keyboard};

// User-facing copy, verbatim from the shop's voice.
const MSG_MENU_PROMPT: &str = "Пожалуйста, выберите товар:";
const MSG_ADDED: &str = "Добавили в корзину";
const MSG_INSUFFICIENT_STOCK: &str = "Недостаточно товара в наличии";
pub const MSG_GENERIC_FAILURE: &str = "Произошла ошибка. Попробуйте снова";
const MSG_EMAIL_PROMPT: &str = "Пришлите, пожалуйста, ваш email";
const MSG_FAREWELL: &str = "Будем рады видеть вас снова 😊";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("email pattern is valid")
});

/// Where the conversation with one user currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialogueState {
    #[default]
    ShowMenu,
    HandleMenu,
    HandleDescription,
    HandleCart,
    WaitingEmail,
    /// Terminal state, reachable only via an explicit `/finish`.
    Finished,
}

/// A user action after mapping from the raw inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueAction {
    Restart,
    Finish,
    GoToCart,
    GoToMenu,
    Checkout,
    Back,
    SelectProduct(String),
    AddQuantity(u32),
    RemoveCartItem(String),
    SubmitEmail(String),
}

impl DialogueAction {
    /// Map a raw event to an action given the user's current state.
    ///
    /// `None` means the input matches nothing we understand here — the turn
    /// is dropped without a message or a state change, so stray free text
    /// (or a stale button) can never crash a conversation.
    pub fn derive(state: DialogueState, event: &InboundKind) -> Option<Self> {
        match event {
            InboundKind::Text { text } => {
                let text = text.trim();
                match text {
                    "/start" => Some(Self::Restart),
                    "/finish" => Some(Self::Finish),
                    _ if state == DialogueState::WaitingEmail && EMAIL_RE.is_match(text) => {
                        Some(Self::SubmitEmail(text.to_string()))
                    }
                    _ => None,
                }
            }
            InboundKind::ButtonPress { payload, .. } => match payload.as_str() {
                "cart" => Some(Self::GoToCart),
                "get_menu" => Some(Self::GoToMenu),
                "check_out" => Some(Self::Checkout),
                "back" => Some(Self::Back),
                other => {
                    if let Ok(qty) = other.parse::<u32>() {
                        Some(Self::AddQuantity(qty))
                    } else {
                        // Opaque payloads are ids; what kind depends on
                        // which keyboard the user pressed.
                        match state {
                            DialogueState::ShowMenu | DialogueState::HandleMenu => {
                                Some(Self::SelectProduct(other.to_string()))
                            }
                            DialogueState::HandleCart => {
                                Some(Self::RemoveCartItem(other.to_string()))
                            }
                            _ => None,
                        }
                    }
                }
            },
        }
    }
}

/// Result of one transition: what to send and what to remember.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    Reply {
        messages: Vec<OutboundMessage>,
        next: SessionState,
        /// Delete the message that hosted the pressed button before sending
        /// (menu/cart/product re-renders replace it).
        replace_origin: bool,
    },
    /// Undefined (state, action) pair: no message, no state change.
    Ignored,
}

/// The conversation state machine. Given (session, user, action) it calls the
/// gateway and asset cache, and produces the outbound messages plus the next
/// session state. It never mutates the session itself — the caller commits
/// the returned state only after the turn succeeds, so a transport failure
/// leaves the user somewhere they can retry from.
pub struct DialogueController {
    gateway: Arc<CatalogGateway>,
    assets: Arc<AssetCache>,
    tokens: Arc<TokenManager>,
}

impl DialogueController {
    pub fn new(
        gateway: Arc<CatalogGateway>,
        assets: Arc<AssetCache>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            gateway,
            assets,
            tokens,
        }
    }

    pub async fn transition(
        &self,
        session: &SessionState,
        user_id: &str,
        first_name: &str,
        action: DialogueAction,
    ) -> anyhow::Result<Turn> {
        use DialogueAction as A;
        use DialogueState as S;

        let turn = match (session.state, action) {
            // Escape hatch, available from every state.
            (_, A::Finish) => Turn::Reply {
                messages: vec![text(MSG_FAREWELL, None)],
                next: SessionState {
                    state: S::Finished,
                    product_id: session.product_id.clone(),
                },
                replace_origin: false,
            },

            // /start re-enters the conversation from anywhere.
            (_, A::Restart) => {
                let keyboard = self.menu().await?;
                Turn::Reply {
                    messages: vec![text(
                        format!("Привет, {first_name}! Хотите заказать рыбки?"),
                        Some(keyboard),
                    )],
                    next: SessionState {
                        state: S::HandleMenu,
                        product_id: session.product_id.clone(),
                    },
                    replace_origin: false,
                }
            }

            // Any button press while idle re-renders the menu.
            (S::ShowMenu, _) => {
                let keyboard = self.menu().await?;
                Turn::Reply {
                    messages: vec![text(MSG_MENU_PROMPT, Some(keyboard))],
                    next: SessionState {
                        state: S::HandleMenu,
                        product_id: session.product_id.clone(),
                    },
                    replace_origin: true,
                }
            }

            (S::HandleMenu | S::HandleDescription, A::GoToCart) => {
                self.cart_turn(user_id, session).await?
            }

            (S::HandleMenu, A::SelectProduct(product_id)) => {
                let credential = self.tokens.current();
                let product = self.gateway.get_product(&credential, &product_id).await?;
                let caption = product_caption(&product);
                let keyboard = product_keyboard();

                let message = if let Some(image_id) = &product.image_id {
                    let path = self.assets.ensure_local(&credential, image_id).await?;
                    OutboundMessage::Photo {
                        path,
                        caption,
                        keyboard,
                    }
                } else {
                    text(caption, Some(keyboard))
                };

                Turn::Reply {
                    messages: vec![message],
                    next: SessionState {
                        state: S::HandleDescription,
                        product_id: Some(product_id),
                    },
                    replace_origin: true,
                }
            }

            (S::HandleDescription, A::Back) => Turn::Reply {
                messages: vec![],
                next: SessionState {
                    state: S::ShowMenu,
                    product_id: session.product_id.clone(),
                },
                replace_origin: false,
            },

            (S::HandleDescription, A::AddQuantity(qty)) => {
                let Some(product_id) = &session.product_id else {
                    return Ok(Turn::Ignored);
                };
                let credential = self.tokens.current();
                let reply = match self
                    .gateway
                    .add_to_cart(&credential, user_id, product_id, qty)
                    .await?
                {
                    CartOutcome::Added => format!("{MSG_ADDED} {qty} кг"),
                    CartOutcome::InsufficientStock => MSG_INSUFFICIENT_STOCK.to_string(),
                    CartOutcome::Rejected(title) => {
                        tracing::warn!(user_id, %title, "add-to-cart rejected by backend");
                        MSG_GENERIC_FAILURE.to_string()
                    }
                };
                // Stay on the card so the user can add more or navigate.
                Turn::Reply {
                    messages: vec![text(reply, None)],
                    next: session.clone(),
                    replace_origin: false,
                }
            }

            (S::HandleCart, A::GoToMenu) => {
                let keyboard = self.menu().await?;
                Turn::Reply {
                    messages: vec![text(MSG_MENU_PROMPT, Some(keyboard))],
                    next: SessionState {
                        state: S::ShowMenu,
                        product_id: session.product_id.clone(),
                    },
                    replace_origin: true,
                }
            }

            (S::HandleCart, A::Checkout) => Turn::Reply {
                messages: vec![text(MSG_EMAIL_PROMPT, None)],
                next: SessionState {
                    state: S::WaitingEmail,
                    product_id: session.product_id.clone(),
                },
                replace_origin: false,
            },

            (S::HandleCart, A::RemoveCartItem(item_id)) => {
                let credential = self.tokens.current();
                self.gateway
                    .remove_from_cart(&credential, user_id, &item_id)
                    .await?;
                self.cart_turn(user_id, session).await?
            }

            (S::WaitingEmail, A::SubmitEmail(email)) => {
                let credential = self.tokens.current();
                self.gateway
                    .create_customer(&credential, user_id, first_name, &email)
                    .await?;
                Turn::Reply {
                    messages: vec![text(
                        format!("Благодарим за заказ! Мы свяжемся с вами по email {email}"),
                        None,
                    )],
                    next: SessionState {
                        state: S::ShowMenu,
                        product_id: session.product_id.clone(),
                    },
                    replace_origin: false,
                }
            }

            _ => Turn::Ignored,
        };

        Ok(turn)
    }

    async fn menu(&self) -> anyhow::Result<Keyboard> {
        let credential = self.tokens.current();
        let products = self.gateway.list_products(&credential).await?;
        Ok(menu_keyboard(&products))
    }

    /// Render the user's cart and move them to [`DialogueState::HandleCart`].
    async fn cart_turn(&self, user_id: &str, session: &SessionState) -> anyhow::Result<Turn> {
        let credential = self.tokens.current();
        let cart = self.gateway.cart_contents(&credential, user_id).await?;
        Ok(Turn::Reply {
            messages: vec![text(cart_text(&cart), Some(cart_keyboard(&cart)))],
            next: SessionState {
                state: DialogueState::HandleCart,
                product_id: session.product_id.clone(),
            },
            replace_origin: true,
        })
    }
}

fn text(text: impl Into<String>, keyboard: Option<Keyboard>) -> OutboundMessage {
    OutboundMessage::Text {
        text: text.into(),
        keyboard,
    }
}
