use crate::auth::{hash_password, verify_password};
use crate::models::{AppData, Role, Ticket, TicketCounts, TicketRow, TicketStatus, User};
use chrono::Local;
use thiserror::Error;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("Ticket not found")]
    TicketNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Permission denied")]
    Forbidden,
    #[error("Username and password required.")]
    MissingCredentials,
    #[error("Username already exists.")]
    UsernameTaken,
    #[error("Title is required.")]
    MissingTitle,
    #[error("failed to gather randomness: {0}")]
    Random(String),
}

impl From<getrandom::Error> for TicketError {
    fn from(err: getrandom::Error) -> Self {
        Self::Random(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub assigned_to: Option<u64>,
}

pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

impl AppData {
    pub fn user(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    pub fn user_by_name(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|user| user.username == username)
    }

    pub fn ticket(&self, id: u64) -> Option<&Ticket> {
        self.tickets.iter().find(|ticket| ticket.id == id)
    }

    /// Seeds an `admin` account when no admin exists. Returns whether one was added.
    pub fn ensure_admin(&mut self, password: &str) -> Result<bool, TicketError> {
        if self.users.iter().any(|user| user.role == Role::Admin) {
            return Ok(false);
        }
        let username = if self.user_by_name("admin").is_some() {
            format!("admin{}", self.next_user_id)
        } else {
            "admin".to_string()
        };
        self.insert_user(username, hash_password(password)?, Role::Admin);
        Ok(true)
    }

    pub fn register_user(&mut self, username: &str, password: &str) -> Result<&User, TicketError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(TicketError::MissingCredentials);
        }
        if self.user_by_name(username).is_some() {
            return Err(TicketError::UsernameTaken);
        }
        let hash = hash_password(password)?;
        Ok(self.insert_user(username.to_string(), hash, Role::User))
    }

    fn insert_user(&mut self, username: String, password_hash: String, role: Role) -> &User {
        let id = self.next_user_id;
        self.next_user_id += 1;
        self.users.push(User {
            id,
            username,
            password_hash,
            role,
            created_at: now_timestamp(),
        });
        &self.users[self.users.len() - 1]
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Option<&User> {
        self.user_by_name(username.trim())
            .filter(|user| verify_password(password, &user.password_hash))
    }

    pub fn create_ticket(&mut self, author: u64, ticket: NewTicket) -> Result<&Ticket, TicketError> {
        if self.user(author).is_none() {
            return Err(TicketError::UserNotFound);
        }
        if ticket.title.trim().is_empty() {
            return Err(TicketError::MissingTitle);
        }
        if let Some(assignee) = ticket.assigned_to {
            if self.user(assignee).is_none() {
                return Err(TicketError::UserNotFound);
            }
        }
        let id = self.next_ticket_id;
        self.next_ticket_id += 1;
        self.tickets.push(Ticket {
            id,
            title: ticket.title.trim().to_string(),
            description: ticket.description,
            status: TicketStatus::Open,
            created_by: author,
            assigned_to: ticket.assigned_to,
            created_at: now_timestamp(),
        });
        Ok(&self.tickets[self.tickets.len() - 1])
    }

    /// Staff may move any ticket; everyone else only their own.
    pub fn update_status(
        &mut self,
        actor: u64,
        ticket_id: u64,
        status: TicketStatus,
    ) -> Result<(), TicketError> {
        let role = self.user(actor).map(|user| user.role);
        let ticket = self
            .tickets
            .iter_mut()
            .find(|ticket| ticket.id == ticket_id)
            .ok_or(TicketError::TicketNotFound)?;
        let allowed = role.is_some_and(Role::is_staff) || ticket.created_by == actor;
        if !allowed {
            return Err(TicketError::Forbidden);
        }
        ticket.status = status;
        Ok(())
    }

    pub fn assign_ticket(
        &mut self,
        actor: u64,
        ticket_id: u64,
        assignee: Option<u64>,
    ) -> Result<(), TicketError> {
        self.require_role(actor, Role::is_staff)?;
        if let Some(assignee) = assignee {
            if self.user(assignee).is_none() {
                return Err(TicketError::UserNotFound);
            }
        }
        let ticket = self
            .tickets
            .iter_mut()
            .find(|ticket| ticket.id == ticket_id)
            .ok_or(TicketError::TicketNotFound)?;
        ticket.assigned_to = assignee;
        Ok(())
    }

    pub fn change_role(&mut self, actor: u64, user_id: u64, role: Role) -> Result<(), TicketError> {
        self.require_role(actor, |role| role == Role::Admin)?;
        let user = self
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or(TicketError::UserNotFound)?;
        user.role = role;
        Ok(())
    }

    fn require_role(&self, actor: u64, allowed: impl Fn(Role) -> bool) -> Result<(), TicketError> {
        match self.user(actor) {
            Some(user) if allowed(user.role) => Ok(()),
            _ => Err(TicketError::Forbidden),
        }
    }

    /// Newest first. Staff see the whole queue.
    pub fn visible_tickets(&self, viewer: &User) -> Vec<TicketRow> {
        let mut rows: Vec<TicketRow> = self
            .tickets
            .iter()
            .filter(|ticket| viewer.role.is_staff() || ticket.created_by == viewer.id)
            .map(|ticket| self.to_row(ticket))
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        rows
    }

    pub fn all_ticket_rows(&self) -> Vec<TicketRow> {
        let mut rows: Vec<TicketRow> = self.tickets.iter().map(|ticket| self.to_row(ticket)).collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        rows
    }

    fn to_row(&self, ticket: &Ticket) -> TicketRow {
        TicketRow {
            id: ticket.id,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            status: ticket.status,
            created_at: ticket.created_at.clone(),
            created_by: self.user(ticket.created_by).map(|user| user.username.clone()),
            assigned_to: ticket
                .assigned_to
                .and_then(|id| self.user(id))
                .map(|user| user.username.clone()),
        }
    }

    pub fn counts(&self) -> TicketCounts {
        self.tickets
            .iter()
            .fold(TicketCounts::default(), |mut counts, ticket| {
                match ticket.status {
                    TicketStatus::Open => counts.open += 1,
                    TicketStatus::InProgress => counts.in_progress += 1,
                    TicketStatus::Closed => counts.closed += 1,
                }
                counts
            })
    }
}
