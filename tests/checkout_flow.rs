//! End-to-end conversation walk: menu → product card → add to cart → cart →
//! checkout → email, against a mocked commerce backend.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fishmonger::assets::AssetCache;
use fishmonger::catalog::CatalogGateway;
use fishmonger::dialogue::{DialogueAction, DialogueController, DialogueState, Turn};
use fishmonger::session::SessionStore;
use fishmonger::token::TokenManager;
use fishmonger::transport::InboundKind;

async fn mount_backend(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "expires_in": 3600
        })))
        .mount(server)
        .await;

    let product = json!({
        "id": "42",
        "attributes": { "name": "Форель", "description": "свежая речная форель" },
        "meta": { "display_price": { "without_tax": { "formatted": "100 ₴" } } },
        "relationships": { "main_image": { "data": { "id": "img-42" } } }
    });

    Mock::given(method("GET"))
        .and(path("/catalog/products"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [product.clone()] })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalog/products/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": product })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/files/img-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "link": { "href": format!("{}/dl/img-42.jpg", server.uri()) } }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dl/img-42.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".as_slice()))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/carts/777/items"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/carts/777/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "item-1",
                "name": "Форель",
                "quantity": 5,
                "meta": { "display_price": { "with_tax": {
                    "unit": { "formatted": "100 ₴" },
                    "value": { "formatted": "500 ₴" }
                } } }
            }],
            "meta": { "display_price": { "with_tax": { "formatted": "500 ₴" } } }
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/customers"))
        .and(body_partial_json(json!({
            "data": { "email": "ivan@example.com", "name": "777 -- Ivan" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_checkout_journey() {
    let server = MockServer::start().await;
    mount_backend(&server).await;

    let gateway = Arc::new(CatalogGateway::new(server.uri()));
    let images = TempDir::new().unwrap();
    let assets = Arc::new(AssetCache::new(images.path(), Arc::clone(&gateway)).unwrap());
    let tokens = TokenManager::bootstrap(Arc::clone(&gateway), "cid", "secret")
        .await
        .unwrap();
    let controller = DialogueController::new(gateway, assets, tokens);
    let sessions = SessionStore::new();

    let cell = sessions.get("777");
    let mut session = cell.lock().await;

    // /start → greeting + menu
    let action = DialogueAction::derive(
        session.state,
        &InboundKind::Text {
            text: "/start".into(),
        },
    )
    .unwrap();
    let turn = controller
        .transition(&session, "777", "Ivan", action)
        .await
        .unwrap();
    let Turn::Reply { next, .. } = turn else {
        panic!("expected a reply")
    };
    *session = next;
    assert_eq!(session.state, DialogueState::HandleMenu);

    // pick the trout → product card, image cached
    let action = DialogueAction::derive(
        session.state,
        &InboundKind::ButtonPress {
            payload: "42".into(),
            message_id: 1,
        },
    )
    .unwrap();
    let turn = controller
        .transition(&session, "777", "Ivan", action)
        .await
        .unwrap();
    let Turn::Reply { next, .. } = turn else {
        panic!("expected a reply")
    };
    *session = next;
    assert_eq!(session.state, DialogueState::HandleDescription);
    assert_eq!(session.product_id.as_deref(), Some("42"));

    // add 5 kg
    let action = DialogueAction::derive(
        session.state,
        &InboundKind::ButtonPress {
            payload: "5".into(),
            message_id: 2,
        },
    )
    .unwrap();
    let turn = controller
        .transition(&session, "777", "Ivan", action)
        .await
        .unwrap();
    let Turn::Reply { next, .. } = turn else {
        panic!("expected a reply")
    };
    *session = next;
    assert_eq!(session.state, DialogueState::HandleDescription);

    // open the cart
    let action = DialogueAction::derive(
        session.state,
        &InboundKind::ButtonPress {
            payload: "cart".into(),
            message_id: 3,
        },
    )
    .unwrap();
    let turn = controller
        .transition(&session, "777", "Ivan", action)
        .await
        .unwrap();
    let Turn::Reply { next, .. } = turn else {
        panic!("expected a reply")
    };
    *session = next;
    assert_eq!(session.state, DialogueState::HandleCart);

    // checkout → email prompt
    let action = DialogueAction::derive(
        session.state,
        &InboundKind::ButtonPress {
            payload: "check_out".into(),
            message_id: 4,
        },
    )
    .unwrap();
    let turn = controller
        .transition(&session, "777", "Ivan", action)
        .await
        .unwrap();
    let Turn::Reply { next, .. } = turn else {
        panic!("expected a reply")
    };
    *session = next;
    assert_eq!(session.state, DialogueState::WaitingEmail);

    // stray text is dropped without leaving WaitingEmail
    assert!(
        DialogueAction::derive(
            session.state,
            &InboundKind::Text {
                text: "это не email".into()
            }
        )
        .is_none()
    );

    // a real address completes the order
    let action = DialogueAction::derive(
        session.state,
        &InboundKind::Text {
            text: "ivan@example.com".into(),
        },
    )
    .unwrap();
    let turn = controller
        .transition(&session, "777", "Ivan", action)
        .await
        .unwrap();
    let Turn::Reply { next, .. } = turn else {
        panic!("expected a reply")
    };
    *session = next;
    assert_eq!(session.state, DialogueState::ShowMenu);
}
