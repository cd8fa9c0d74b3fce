//! Role catalog, seed data, defaults and user-facing messages.

use chrono::{DateTime, TimeZone, Utc};

use crate::user::{UserId, UserRecord};

/// Storage slot holding the serialized user list.
pub const USERS_STORAGE_KEY: &str = "crud-users";

/// Default auto-dismiss delay for notifications, in milliseconds.
pub const NOTIFICATION_DURATION_MS: u64 = 5_000;

/// Minimum number of digits accepted by the generic phone rule.
pub const PHONE_MIN_DIGITS: usize = 10;

/// Masked password shown for seeded records.
pub const PASSWORD_PLACEHOLDER: &str = "••••••••";

/// A selectable role tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserType {
    /// Stored value.
    pub value: &'static str,
    /// Label shown next to the checkbox.
    pub label: &'static str,
}

/// Roles offered by the user form, in display order.
pub const USER_TYPES: &[UserType] = &[
    UserType {
        value: "Web Developer",
        label: "Web Developer",
    },
    UserType {
        value: "UI/UX Designer",
        label: "UI/UX Designer",
    },
    UserType {
        value: "Project Manager",
        label: "Project Manager",
    },
];

/// Notification texts used by the user flows.
pub mod messages {
    pub const USER_CREATED: &str = "Utilizador criado com sucesso!";
    pub const USER_UPDATED: &str = "Utilizador atualizado com sucesso!";
    pub const USER_DELETED: &str = "Utilizador eliminado com sucesso!";
    pub const VALIDATION_ERROR: &str = "Por favor, corrija os erros no formulário";
    pub const GENERIC_ERROR: &str = "Ocorreu um erro. Tente novamente.";
    pub const CONFIRM_DELETE: &str = "Tem a certeza que deseja eliminar este utilizador?";
}

fn seed_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 3, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Records used when storage holds nothing usable.
#[must_use]
pub fn seed_users() -> Vec<UserRecord> {
    vec![
        UserRecord {
            id: UserId::new("1"),
            name: "Augusto Chagas".to_string(),
            email: "augusto.chagas@premium-minds.com".to_string(),
            phone: "+351 916 534 613".to_string(),
            password: PASSWORD_PLACEHOLDER.to_string(),
            user_types: vec!["Web Developer".to_string(), "UI/UX Designer".to_string()],
            created_at: seed_date(),
            updated_at: None,
        },
        UserRecord {
            id: UserId::new("2"),
            name: "João Silva".to_string(),
            email: "joao.silva@premium-minds.com".to_string(),
            phone: "+351 934 123 456".to_string(),
            password: PASSWORD_PLACEHOLDER.to_string(),
            user_types: vec!["Project Manager".to_string()],
            created_at: seed_date(),
            updated_at: None,
        },
    ]
}
