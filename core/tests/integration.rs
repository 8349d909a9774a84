//! End-to-end tests against the fake Trello server.
//!
//! # Design
//! Starts `trello-mock-server` on a random port, then drives the real
//! `UreqTransport` through the endpoint methods. Validates that request
//! building, the ureq round-trip and response parsing agree with the server
//! over actual HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::sync::oneshot;
use trello_core::{
    Board, Card, Checklist, Credentials, Label, List, Params, QueryValue, Transport, Trello, TrelloError, UreqTransport,
    Webhook,
};
use trello_mock::ECHO_USER_AGENT;

async fn start_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { trello_mock::run(listener, "key", "token").await.unwrap() });
    addr
}

fn client(addr: SocketAddr, key: &str, token: &str) -> Trello {
    Trello::builder(Credentials::new(key, token))
        .base_url(format!("http://{addr}"))
        .timeout(Some(Duration::from_secs(5)))
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn board_and_card_lifecycle() {
    let addr = start_server().await;
    let trello = client(addr, "key", "token");

    // Step 1: board with two lists.
    let board: Board = trello
        .add_board("Roadmap", Some("Q3 plans"), None)
        .send()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(board.name, "Roadmap");
    assert_eq!(board.desc, "Q3 plans");

    let todo: List = trello.add_list_to_board(&board.id, "Todo").send().unwrap().json().await.unwrap();
    let done: List = trello.add_list_to_board(&board.id, "Done").send().unwrap().json().await.unwrap();
    let lists: Vec<List> = trello.get_lists_on_board(&board.id).send().unwrap().json().await.unwrap();
    assert_eq!(lists.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(), ["Todo", "Done"]);

    // Step 2: rename a list.
    let renamed: List = trello.rename_list(&done.id, "Shipped").send().unwrap().json().await.unwrap();
    assert_eq!(renamed.name, "Shipped");

    // Step 3: card with extended fields.
    let due = Utc.with_ymd_and_hms(2015, 3, 25, 0, 0, 0).unwrap();
    let extra: Params = [
        ("desc", QueryValue::from("description")),
        ("due", QueryValue::from(due)),
        ("dueComplete", QueryValue::from(false)),
    ]
    .into_iter()
    .collect();
    let card: Card = trello
        .add_card_with_extra_params("Integration test", &extra, &todo.id)
        .send()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(card.desc, "description");
    assert_eq!(card.due.as_deref(), Some("2015-03-25T00:00:00.000Z"));
    assert_eq!(card.id_list.as_deref(), Some(todo.id.as_str()));

    // Step 4: fetch it plain and board-scoped.
    let fetched: Card = trello.get_card(None, &card.id).send().unwrap().json().await.unwrap();
    assert_eq!(fetched, card);
    let scoped: Card = trello.get_card(Some(&board.id), &card.id).send().unwrap().json().await.unwrap();
    assert_eq!(scoped.id, card.id);

    // Step 5: move it to the other list.
    trello.update_card_list(&card.id, &done.id).send().unwrap().await.unwrap();
    let on_done: Vec<Card> = trello.get_cards_on_list(&done.id).send().unwrap().json().await.unwrap();
    assert_eq!(on_done.len(), 1);
    let on_todo: Vec<Card> = trello.get_cards_on_list(&todo.id).send().unwrap().json().await.unwrap();
    assert!(on_todo.is_empty());

    // Step 6: labels travel in the JSON body.
    let label: Label = trello
        .add_label_on_board(&board.id, "bug", "red")
        .send()
        .unwrap()
        .json()
        .await
        .unwrap();
    trello.add_label_to_card(&card.id, &label.id).send().unwrap().await.unwrap();
    let labelled: Card = trello.get_card(None, &card.id).send().unwrap().json().await.unwrap();
    assert_eq!(labelled.id_labels, [label.id.clone()]);
    trello.delete_label_from_card(&card.id, &label.id).send().unwrap().await.unwrap();

    // Step 7: checklists, fresh and copied.
    let checklist: Checklist = trello
        .add_checklist_to_card(&card.id, "Release")
        .send()
        .unwrap()
        .json()
        .await
        .unwrap();
    trello
        .add_existing_checklist_to_card(&card.id, &checklist.id)
        .send()
        .unwrap()
        .await
        .unwrap();
    let checklists: Vec<Checklist> = trello.get_checklists_on_card(&card.id).send().unwrap().json().await.unwrap();
    assert_eq!(checklists.len(), 2);
    assert!(checklists.iter().all(|c| c.name == "Release"));

    // Step 8: webhook under the client's token.
    let hook: Webhook = trello
        .add_webhook("webhook", "http://callback", &board.id)
        .send()
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hook.id_model, board.id);
    trello.delete_webhook(&hook.id).send().unwrap().await.unwrap();

    // Step 9: delete the card; it is gone afterwards.
    trello.delete_card(&card.id).send().unwrap().await.unwrap();
    let err = trello.get_card(None, &card.id).send().unwrap().await.unwrap_err();
    assert!(matches!(err, TrelloError::NotFound));
    let err = trello.delete_card(&card.id).send().unwrap().await.unwrap_err();
    assert!(matches!(err, TrelloError::NotFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn chains_many_calls_without_failing() {
    let addr = start_server().await;
    let trello = client(addr, "key", "token");
    let board: Board = trello.add_board("Chain", None, None).send().unwrap().json().await.unwrap();
    let list: List = trello.add_list_to_board(&board.id, "Cards").send().unwrap().json().await.unwrap();

    const CARDS: usize = 30;
    let created: Vec<_> = (0..CARDS)
        .map(|i| {
            trello
                .add_card(&format!("Test card #{i}"), Some("test card"), &list.id)
                .send()
                .unwrap()
        })
        .collect();

    let mut removals = Vec::new();
    for pending in created {
        let card: Card = serde_json::from_value(pending.await.unwrap()).unwrap();
        let (tx, rx) = oneshot::channel();
        trello
            .delete_card(&card.id)
            .send_with(move |result| {
                let _ = tx.send(result);
            })
            .unwrap();
        removals.push(rx);
    }
    for rx in removals {
        rx.await.unwrap().unwrap();
    }

    let remaining: Vec<Card> = trello.get_cards_on_list(&list.id).send().unwrap().json().await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bad_credentials_are_rejected_by_the_service() {
    let addr = start_server().await;
    let trello = client(addr, "key", "wrong");
    let err = trello.get_board("anything").send().unwrap().await.unwrap_err();
    assert!(matches!(err, TrelloError::HttpStatus { status: 401, ref body } if body == "invalid token"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_service_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let trello = client(addr, "key", "token");
    let err = trello.get_board("anything").send().unwrap().await.unwrap_err();
    assert!(matches!(err, TrelloError::Transport(_)), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn configured_user_agent_reaches_the_service() {
    let addr = start_server().await;
    let trello = client(addr, "key", "token");
    let transport = UreqTransport::new(Some(Duration::from_secs(5)), Some("trello-integration/1.0".to_string()));

    let request = trello.get_board("missing").build().unwrap();
    let response = transport.send(request).await.unwrap();
    assert_eq!(response.status, 404);
    let echoed = response.headers.iter().find(|(k, _)| k == ECHO_USER_AGENT).map(|(_, v)| v.as_str());
    assert_eq!(echoed, Some("trello-integration/1.0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn caller_supplied_agent_is_used_as_is() {
    let addr = start_server().await;
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();
    let trello = Trello::builder(Credentials::new("key", "token"))
        .base_url(format!("http://{addr}"))
        .transport(UreqTransport::with_agent(agent))
        .build();

    let board: Board = trello.add_board("Agent", None, None).send().unwrap().json().await.unwrap();
    assert_eq!(board.name, "Agent");
    let err = trello.get_board("missing").send().unwrap().await.unwrap_err();
    assert!(matches!(err, TrelloError::NotFound));
}
