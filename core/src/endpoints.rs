//! Typed endpoint methods.
//!
//! Every method only shapes data: it picks a verb, formats a path and fills
//! a `RequestOptions`, then hands back a [`Call`]. Nothing is sent until the
//! call is executed with [`Call::send`] or [`Call::send_with`], so a call can
//! also be inspected or turned into a plain `HttpRequest` with
//! [`Call::build`].
//!
//! Ids are inserted into paths verbatim.

use serde_json::Value;

use crate::client::{PendingRequest, Trello};
use crate::error::TrelloError;
use crate::http::{HttpMethod, HttpRequest};
use crate::options::{Params, QueryValue, RequestOptions};

/// A prepared endpoint call.
#[derive(Debug, Clone)]
#[must_use = "a Call does nothing until it is sent"]
pub struct Call<'a> {
    client: &'a Trello,
    method: HttpMethod,
    path: String,
    options: RequestOptions,
}

impl<'a> Call<'a> {
    fn new(client: &'a Trello, method: HttpMethod, path: String) -> Self {
        Self {
            client,
            method,
            path,
            options: RequestOptions::default(),
        }
    }

    fn query(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.options.query.insert(key, value);
        self
    }

    fn query_opt(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(v) = value {
            self.options.query.insert(key, v);
        }
        self
    }

    fn query_all(mut self, params: &Params) -> Self {
        self.options.query.extend_from(params);
        self
    }

    fn data(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.options.data.insert(key, value);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path relative to the client's base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// The request this call would send, without sending it.
    pub fn build(&self) -> Result<HttpRequest, TrelloError> {
        self.client
            .build_request(self.method, &self.path, Some(&self.options))
    }

    /// Send the call and return a future for its payload.
    pub fn send(self) -> Result<PendingRequest, TrelloError> {
        self.client
            .dispatch(self.method, &self.path, Some(&self.options))
    }

    /// Send the call and deliver its payload to `callback`.
    pub fn send_with<F>(self, callback: F) -> Result<(), TrelloError>
    where
        F: FnOnce(Result<Value, TrelloError>) + Send + 'static,
    {
        self.client
            .dispatch_with(self.method, &self.path, Some(&self.options), callback)
    }
}

/// Sticker placement for [`Trello::add_sticker_to_card`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sticker {
    pub image: String,
    pub left: f64,
    pub top: f64,
    pub z_index: i64,
    pub rotate: f64,
}

impl Trello {
    fn call(&self, method: HttpMethod, path: String) -> Call<'_> {
        Call::new(self, method, path)
    }

    // --- boards ---

    /// Create a board. `description` and `organization_id` are omitted from
    /// the query when `None`.
    pub fn add_board(&self, name: &str, description: Option<&str>, organization_id: Option<&str>) -> Call<'_> {
        self.call(HttpMethod::Post, "/1/boards/".to_string())
            .query("name", name)
            .query_opt("desc", description)
            .query_opt("idOrganization", organization_id)
    }

    pub fn copy_board(&self, name: &str, source_board_id: &str) -> Call<'_> {
        self.call(HttpMethod::Post, "/1/boards/".to_string())
            .query("name", name)
            .query("idBoardSource", source_board_id)
    }

    pub fn get_board(&self, board_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/boards/{board_id}"))
    }

    pub fn update_board_pref(&self, board_id: &str, field: &str, value: impl Into<QueryValue>) -> Call<'_> {
        self.call(HttpMethod::Put, format!("/1/boards/{board_id}/prefs/{field}"))
            .query("value", value)
    }

    pub fn get_board_members(&self, board_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/boards/{board_id}/members"))
    }

    /// `member_type` is one of Trello's membership types (`normal`,
    /// `admin`, `observer`).
    pub fn add_member_to_board(&self, board_id: &str, member_id: &str, member_type: &str) -> Call<'_> {
        self.call(HttpMethod::Put, format!("/1/boards/{board_id}/members/{member_id}"))
            .data("type", member_type)
    }

    pub fn get_actions_on_board(&self, board_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/boards/{board_id}/actions"))
    }

    pub fn get_custom_fields_on_board(&self, board_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/boards/{board_id}/customFields"))
    }

    pub fn get_labels_for_board(&self, board_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/boards/{board_id}/labels"))
    }

    pub fn get_cards_on_board(&self, board_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/boards/{board_id}/cards"))
    }

    /// `extra` is passed through as query parameters (`before`, `since`,
    /// `limit`, `fields`, ...).
    pub fn get_cards_on_board_with_extra_params(&self, board_id: &str, extra: &Params) -> Call<'_> {
        self.get_cards_on_board(board_id).query_all(extra)
    }

    // --- lists ---

    pub fn add_list_to_board(&self, board_id: &str, name: &str) -> Call<'_> {
        self.call(HttpMethod::Post, format!("/1/boards/{board_id}/lists"))
            .query("name", name)
    }

    pub fn get_lists_on_board(&self, board_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/boards/{board_id}/lists"))
    }

    /// `filter` is `open`, `closed`, `all` or `none`.
    pub fn get_lists_on_board_by_filter(&self, board_id: &str, filter: &str) -> Call<'_> {
        self.get_lists_on_board(board_id).query("filter", filter)
    }

    pub fn rename_list(&self, list_id: &str, name: &str) -> Call<'_> {
        self.call(HttpMethod::Put, format!("/1/lists/{list_id}/name"))
            .query("value", name)
    }

    pub fn get_cards_on_list(&self, list_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/lists/{list_id}/cards"))
    }

    pub fn get_cards_on_list_with_extra_params(&self, list_id: &str, extra: &Params) -> Call<'_> {
        self.get_cards_on_list(list_id).query_all(extra)
    }

    // --- cards ---

    pub fn add_card(&self, name: &str, description: Option<&str>, list_id: &str) -> Call<'_> {
        self.call(HttpMethod::Post, "/1/cards".to_string())
            .query("name", name)
            .query_opt("desc", description)
            .query("idList", list_id)
    }

    /// Create a card with any additional card fields (`desc`, `due`,
    /// `dueComplete`, `pos`, `idLabels`, ...) taken from `extra`.
    pub fn add_card_with_extra_params(&self, name: &str, extra: &Params, list_id: &str) -> Call<'_> {
        self.call(HttpMethod::Post, "/1/cards".to_string())
            .query("name", name)
            .query_all(extra)
            .query("idList", list_id)
    }

    /// Fetch a card, scoped to a board when `board_id` is given.
    pub fn get_card(&self, board_id: Option<&str>, card_id: &str) -> Call<'_> {
        let path = match board_id {
            Some(board_id) => format!("/1/boards/{board_id}/cards/{card_id}"),
            None => format!("/1/cards/{card_id}"),
        };
        self.call(HttpMethod::Get, path)
    }

    pub fn update_card(&self, card_id: &str, field: &str, value: impl Into<QueryValue>) -> Call<'_> {
        self.call(HttpMethod::Put, format!("/1/cards/{card_id}/{field}"))
            .query("value", value)
    }

    pub fn update_card_name(&self, card_id: &str, name: &str) -> Call<'_> {
        self.update_card(card_id, "name", name)
    }

    pub fn update_card_description(&self, card_id: &str, description: &str) -> Call<'_> {
        self.update_card(card_id, "desc", description)
    }

    /// Move a card to another list.
    pub fn update_card_list(&self, card_id: &str, list_id: &str) -> Call<'_> {
        self.update_card(card_id, "idList", list_id)
    }

    pub fn add_due_date_to_card(&self, card_id: &str, due: impl Into<QueryValue>) -> Call<'_> {
        self.update_card(card_id, "due", due)
    }

    pub fn delete_card(&self, card_id: &str) -> Call<'_> {
        self.call(HttpMethod::Delete, format!("/1/cards/{card_id}"))
    }

    pub fn add_comment_to_card(&self, card_id: &str, text: &str) -> Call<'_> {
        self.call(HttpMethod::Post, format!("/1/cards/{card_id}/actions/comments"))
            .query("text", text)
    }

    pub fn add_attachment_to_card(&self, card_id: &str, url: &str) -> Call<'_> {
        self.call(HttpMethod::Post, format!("/1/cards/{card_id}/attachments"))
            .query("url", url)
    }

    pub fn add_label_to_card(&self, card_id: &str, label_id: &str) -> Call<'_> {
        self.call(HttpMethod::Post, format!("/1/cards/{card_id}/idLabels"))
            .data("value", label_id)
    }

    pub fn delete_label_from_card(&self, card_id: &str, label_id: &str) -> Call<'_> {
        self.call(HttpMethod::Delete, format!("/1/cards/{card_id}/idLabels/{label_id}"))
    }

    pub fn get_card_stickers(&self, card_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/cards/{card_id}/stickers"))
    }

    pub fn add_sticker_to_card(&self, card_id: &str, sticker: &Sticker) -> Call<'_> {
        self.call(HttpMethod::Post, format!("/1/cards/{card_id}/stickers"))
            .data("image", sticker.image.as_str())
            .data("top", sticker.top)
            .data("left", sticker.left)
            .data("zIndex", sticker.z_index)
            .data("rotate", sticker.rotate)
    }

    // --- checklists ---

    pub fn add_checklist_to_card(&self, card_id: &str, name: &str) -> Call<'_> {
        self.call(HttpMethod::Post, format!("/1/cards/{card_id}/checklists"))
            .query("name", name)
    }

    /// Copy an existing checklist onto a card.
    pub fn add_existing_checklist_to_card(&self, card_id: &str, checklist_id: &str) -> Call<'_> {
        self.call(HttpMethod::Post, format!("/1/cards/{card_id}/checklists"))
            .query("idChecklistSource", checklist_id)
    }

    pub fn get_checklists_on_card(&self, card_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/cards/{card_id}/checklists"))
    }

    /// `pos` is `top`, `bottom` or a positive number.
    pub fn add_item_to_checklist(&self, checklist_id: &str, name: &str, pos: impl Into<QueryValue>) -> Call<'_> {
        self.call(HttpMethod::Post, format!("/1/checklists/{checklist_id}/checkitems"))
            .query("name", name)
            .query("pos", pos)
    }

    pub fn update_checklist(&self, checklist_id: &str, field: &str, value: impl Into<QueryValue>) -> Call<'_> {
        self.call(HttpMethod::Put, format!("/1/checklists/{checklist_id}/{field}"))
            .query("value", value)
    }

    // --- labels ---

    pub fn add_label_on_board(&self, board_id: &str, name: &str, color: &str) -> Call<'_> {
        self.call(HttpMethod::Post, "/1/labels".to_string())
            .data("name", name)
            .data("color", color)
            .data("idBoard", board_id)
    }

    pub fn update_label(&self, label_id: &str, field: &str, value: impl Into<QueryValue>) -> Call<'_> {
        self.call(HttpMethod::Put, format!("/1/labels/{label_id}/{field}"))
            .query("value", value)
    }

    pub fn update_label_name(&self, label_id: &str, name: &str) -> Call<'_> {
        self.update_label(label_id, "name", name)
    }

    pub fn update_label_color(&self, label_id: &str, color: &str) -> Call<'_> {
        self.update_label(label_id, "color", color)
    }

    pub fn delete_label(&self, label_id: &str) -> Call<'_> {
        self.call(HttpMethod::Delete, format!("/1/labels/{label_id}"))
    }

    // --- webhooks ---

    /// Register a webhook for the model `id_model` under the client's token.
    pub fn add_webhook(&self, description: &str, callback_url: &str, id_model: &str) -> Call<'_> {
        let token = self.credentials().token();
        self.call(HttpMethod::Post, format!("/1/tokens/{token}/webhooks/"))
            .data("description", description)
            .data("callbackURL", callback_url)
            .data("idModel", id_model)
    }

    pub fn delete_webhook(&self, webhook_id: &str) -> Call<'_> {
        self.call(HttpMethod::Delete, format!("/1/webhooks/{webhook_id}"))
    }

    // --- members and organizations ---

    /// `member_id` may be `me`.
    pub fn get_member(&self, member_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/members/{member_id}"))
    }

    pub fn get_member_cards(&self, member_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/members/{member_id}/cards"))
    }

    pub fn get_boards(&self, member_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/members/{member_id}/boards"))
    }

    pub fn get_organizations(&self, member_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/members/{member_id}/organizations"))
    }

    pub fn get_org_members(&self, organization_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/organizations/{organization_id}/members"))
    }

    pub fn get_org_boards(&self, organization_id: &str) -> Call<'_> {
        self.call(HttpMethod::Get, format!("/1/organizations/{organization_id}/boards"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Credentials;
    use crate::mock::MockTransport;
    use chrono::{TimeZone, Utc};

    fn client() -> Trello {
        Trello::builder(Credentials::new("key", "token"))
            .transport(MockTransport::new())
            .build()
    }

    #[test]
    fn add_board_skips_absent_fields() {
        let client = client();
        let call = client.add_board("name", None, None);
        assert_eq!(call.method(), HttpMethod::Post);
        assert_eq!(call.path(), "/1/boards/");
        assert_eq!(call.options().query.keys().collect::<Vec<_>>(), ["name"]);
    }

    #[test]
    fn get_card_path_depends_on_board_scope() {
        let client = client();
        assert_eq!(client.get_card(None, "cardId").path(), "/1/cards/cardId");
        assert_eq!(
            client.get_card(Some("boardId"), "cardId").path(),
            "/1/boards/boardId/cards/cardId"
        );
    }

    #[test]
    fn extra_params_carry_dates_into_the_query() {
        let client = client();
        let before = Utc.with_ymd_and_hms(2015, 3, 25, 0, 0, 0).unwrap();
        let extra: Params = [("before", QueryValue::from(before))].into_iter().collect();
        let req = client.get_cards_on_list_with_extra_params("listId", &extra).build().unwrap();
        assert_eq!(req.url, "https://api.trello.com/1/lists/listId/cards");
        assert_eq!(req.query_param("before"), Some("2015-03-25T00:00:00.000Z"));
        assert_eq!(req.query_param("key"), Some("key"));
    }

    #[test]
    fn sticker_fields_go_to_the_body() {
        let client = client();
        let sticker = Sticker {
            image: "taco-cool".to_string(),
            left: 10.0,
            top: -5.5,
            z_index: 2,
            rotate: 45.0,
        };
        let req = client.add_sticker_to_card("cardId", &sticker).build().unwrap();
        let body = req.body_json().unwrap();
        assert_eq!(body["image"], "taco-cool");
        assert_eq!(body["zIndex"], 2);
        assert_eq!(body["top"], -5.5);
        assert_eq!(req.query.len(), 2);
    }

    #[test]
    fn webhook_path_embeds_the_token() {
        let client = client();
        let call = client.add_webhook("webhook", "http://callback", "xxx");
        assert_eq!(call.path(), "/1/tokens/token/webhooks/");
    }

    #[test]
    fn card_field_helpers_target_their_field() {
        let client = client();
        assert_eq!(client.update_card_name("c", "n").path(), "/1/cards/c/name");
        assert_eq!(client.update_card_description("c", "d").path(), "/1/cards/c/desc");
        assert_eq!(client.update_label_color("l", "red").path(), "/1/labels/l/color");
    }

    #[test]
    fn member_and_organization_lookups_are_plain_gets() {
        let client = client();
        let calls = [
            (client.get_member("me"), "/1/members/me"),
            (client.get_member_cards("me"), "/1/members/me/cards"),
            (client.get_boards("me"), "/1/members/me/boards"),
            (client.get_organizations("me"), "/1/members/me/organizations"),
            (client.get_org_members("org"), "/1/organizations/org/members"),
            (client.get_org_boards("org"), "/1/organizations/org/boards"),
        ];
        for (call, path) in calls {
            assert_eq!(call.method(), HttpMethod::Get);
            assert_eq!(call.path(), path);
            assert!(call.options().query.is_empty());
        }
    }
}
