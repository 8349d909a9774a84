//! Verify every endpoint method against the vectors in `test-vectors/`.
//!
//! Each case names an endpoint method and its arguments, and describes the
//! request it must dispatch. Cases are sent through a `MockTransport` so the
//! recorded request is exactly what would reach the network. Query strings
//! are compared as maps and bodies as parsed JSON, so ordering differences
//! do not produce false negatives.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use trello_core::mock::MockTransport;
use trello_core::{Call, Credentials, HttpMethod, Params, RequestOptions, Sticker, Trello};

const BASE_URL: &str = "https://api.trello.com";

fn parse_method(s: &str) -> HttpMethod {
    s.parse().unwrap_or_else(|e| panic!("bad method in vector: {e}"))
}

fn str_arg(args: &[Value], i: usize) -> &str {
    args[i].as_str().unwrap_or_else(|| panic!("argument {i} must be a string: {args:?}"))
}

fn params_arg(args: &[Value], i: usize) -> Params {
    RequestOptions::try_from(json!({ "query": args[i].clone() })).unwrap().query
}

/// Map a vector's method name and arguments onto the endpoint call.
fn endpoint<'a>(client: &'a Trello, name: &str, args: &[Value]) -> Call<'a> {
    let s = |i| str_arg(args, i);
    match name {
        "add_board" => client.add_board(s(0), args[1].as_str(), args[2].as_str()),
        "copy_board" => client.copy_board(s(0), s(1)),
        "get_board" => client.get_board(s(0)),
        "update_board_pref" => client.update_board_pref(s(0), s(1), s(2)),
        "add_list_to_board" => client.add_list_to_board(s(0), s(1)),
        "get_lists_on_board" => client.get_lists_on_board(s(0)),
        "get_lists_on_board_by_filter" => client.get_lists_on_board_by_filter(s(0), s(1)),
        "rename_list" => client.rename_list(s(0), s(1)),
        "add_card" => client.add_card(s(0), args[1].as_str(), s(2)),
        "add_card_with_extra_params" => client.add_card_with_extra_params(s(0), &params_arg(args, 1), s(2)),
        "get_card" => client.get_card(args[0].as_str(), s(1)),
        "get_cards_on_list_with_extra_params" => {
            client.get_cards_on_list_with_extra_params(s(0), &params_arg(args, 1))
        }
        "get_cards_on_board_with_extra_params" => {
            client.get_cards_on_board_with_extra_params(s(0), &params_arg(args, 1))
        }
        "update_card_list" => client.update_card_list(s(0), s(1)),
        "update_card_description" => client.update_card_description(s(0), s(1)),
        "delete_card" => client.delete_card(s(0)),
        "add_comment_to_card" => client.add_comment_to_card(s(0), s(1)),
        "add_attachment_to_card" => client.add_attachment_to_card(s(0), s(1)),
        "add_label_to_card" => client.add_label_to_card(s(0), s(1)),
        "delete_label_from_card" => client.delete_label_from_card(s(0), s(1)),
        "add_due_date_to_card" => client.add_due_date_to_card(s(0), s(1)),
        "get_card_stickers" => client.get_card_stickers(s(0)),
        "add_sticker_to_card" => {
            let sticker = Sticker {
                image: s(1).to_string(),
                left: args[2].as_f64().unwrap(),
                top: args[3].as_f64().unwrap(),
                z_index: args[4].as_i64().unwrap(),
                rotate: args[5].as_f64().unwrap(),
            };
            client.add_sticker_to_card(s(0), &sticker)
        }
        "add_checklist_to_card" => client.add_checklist_to_card(s(0), s(1)),
        "add_existing_checklist_to_card" => client.add_existing_checklist_to_card(s(0), s(1)),
        "get_checklists_on_card" => client.get_checklists_on_card(s(0)),
        "add_item_to_checklist" => client.add_item_to_checklist(s(0), s(1), s(2)),
        "update_checklist" => client.update_checklist(s(0), s(1), s(2)),
        "add_webhook" => client.add_webhook(s(0), s(1), s(2)),
        "delete_webhook" => client.delete_webhook(s(0)),
        "get_board_members" => client.get_board_members(s(0)),
        "add_member_to_board" => client.add_member_to_board(s(0), s(1), s(2)),
        "get_actions_on_board" => client.get_actions_on_board(s(0)),
        "get_custom_fields_on_board" => client.get_custom_fields_on_board(s(0)),
        "get_labels_for_board" => client.get_labels_for_board(s(0)),
        "add_label_on_board" => client.add_label_on_board(s(0), s(1), s(2)),
        "update_label" => client.update_label(s(0), s(1), s(2)),
        "delete_label" => client.delete_label(s(0)),
        "get_boards" => client.get_boards(s(0)),
        "get_org_members" => client.get_org_members(s(0)),
        "get_org_boards" => client.get_org_boards(s(0)),
        other => panic!("no endpoint named {other}"),
    }
}

#[tokio::test]
async fn endpoint_test_vectors() {
    let raw = include_str!("../../test-vectors/endpoints.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let key = vectors["credentials"]["key"].as_str().unwrap();
    let token = vectors["credentials"]["token"].as_str().unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_request"];

        let mock = MockTransport::new();
        let client = Trello::builder(Credentials::new(key, token))
            .transport(mock.clone())
            .build();

        let call = endpoint(&client, case["call"].as_str().unwrap(), case["args"].as_array().unwrap());
        let result = call.send().unwrap().await.unwrap();
        assert_eq!(result, Value::Null, "{name}: mock payload");

        let req = mock.single();
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");

        // Credentials lead the query, followed by exactly the expected fields.
        assert_eq!(req.query[0], ("key".to_string(), key.to_string()), "{name}: key");
        assert_eq!(req.query[1], ("token".to_string(), token.to_string()), "{name}: token");
        let query: BTreeMap<&str, &str> = req.query[2..]
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let expected_query: BTreeMap<&str, &str> = expected["query"]
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str().unwrap()))
            .collect();
        assert_eq!(query, expected_query, "{name}: query");

        match expected.get("data") {
            Some(data) => assert_eq!(req.body_json().as_ref(), Some(data), "{name}: body"),
            None => assert!(req.body.is_none(), "{name}: unexpected body {:?}", req.body),
        }
    }
}
