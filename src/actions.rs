//! Status-update button and ticket-creation form.
//!
//! Each handler turns a page event into a [`FormPost`]; a completion handler
//! turns the server's answer into [`Effect`]s for the page to apply.

use std::time::Duration;

pub const UPDATE_STATUS_ENDPOINT: &str = "/update_status";
pub const NEW_TICKET_ENDPOINT: &str = "/new";
pub const TICKET_MODAL_ID: &str = "ticketModal";
pub const TICKET_FORM_ID: &str = "ticketForm";
pub const RELOAD_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPost {
    pub endpoint: &'static str,
    pub fields: Vec<(String, String)>,
}

impl FormPost {
    /// `application/x-www-form-urlencoded` body.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Reload,
    ReloadAfter(Duration),
    HideModal(&'static str),
    ShowError(String),
}

/// A click on an `.update-status` button carrying `data-id`.
#[derive(Debug, Clone)]
pub struct StatusClick {
    pub ticket_id: String,
}

/// A `.status-select` control and its current value.
#[derive(Debug, Clone)]
pub struct StatusSelect {
    pub ticket_id: String,
    pub value: String,
}

pub fn status_update_request(click: &StatusClick, selects: &[StatusSelect]) -> Option<FormPost> {
    let select = selects
        .iter()
        .find(|select| select.ticket_id == click.ticket_id)?;
    Some(FormPost {
        endpoint: UPDATE_STATUS_ENDPOINT,
        fields: vec![
            ("id".to_string(), click.ticket_id.clone()),
            ("status".to_string(), select.value.clone()),
        ],
    })
}

pub fn status_update_completed(completion: &Completion) -> Vec<Effect> {
    match completion {
        Completion::Success => vec![Effect::Reload],
        Completion::Failure(reason) => vec![Effect::ShowError(format!(
            "Could not update ticket status: {reason}"
        ))],
    }
}

/// Serialized fields of the ticket form, in document order.
#[derive(Debug, Clone, Default)]
pub struct TicketFormSubmit {
    pub fields: Vec<(String, String)>,
}

/// Native submission is always cancelled; the form goes over the wire instead.
pub fn ticket_create_request(submit: &TicketFormSubmit) -> FormPost {
    FormPost {
        endpoint: NEW_TICKET_ENDPOINT,
        fields: submit.fields.clone(),
    }
}

pub fn ticket_create_completed(completion: &Completion) -> Vec<Effect> {
    match completion {
        Completion::Success => vec![
            Effect::HideModal(TICKET_MODAL_ID),
            Effect::ReloadAfter(RELOAD_DELAY),
        ],
        Completion::Failure(reason) => vec![Effect::ShowError(format!(
            "Could not create ticket: {reason}"
        ))],
    }
}
