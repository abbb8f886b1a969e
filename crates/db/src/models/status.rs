//! Rust mirrors of the PostgreSQL enum types.
//!
//! Variants serialize exactly as the database labels (`"PENDING"`,
//! `"ADMIN"`, ...), which is also how they appear in API responses.

use serde::{Deserialize, Serialize};

/// `client_role`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "client_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientRole {
    User,
    Admin,
}

impl ClientRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => kbase_core::roles::ROLE_USER,
            Self::Admin => kbase_core::roles::ROLE_ADMIN,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            kbase_core::roles::ROLE_USER => Some(Self::User),
            kbase_core::roles::ROLE_ADMIN => Some(Self::Admin),
            _ => None,
        }
    }
}

/// `operation_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "operation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Success,
    Failed,
}

/// `provisioner_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "provisioner_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisionerStatus {
    Provisioning,
    Available,
    Assigned,
    Destroyed,
    Cleanup,
    Failed,
}

/// `ingestion_operation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ingestion_operation", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestionOperation {
    Insert,
    Delete,
}

impl From<kbase_core::ingestion::IngestionKind> for IngestionOperation {
    fn from(kind: kbase_core::ingestion::IngestionKind) -> Self {
        match kind {
            kbase_core::ingestion::IngestionKind::Insert => Self::Insert,
            kbase_core::ingestion::IngestionKind::Delete => Self::Delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        for role in [ClientRole::User, ClientRole::Admin] {
            assert_eq!(ClientRole::from_name(role.as_str()), Some(role));
        }
        assert_eq!(ClientRole::from_name("ROOT"), None);
    }

    #[test]
    fn statuses_serialize_as_database_labels() {
        assert_eq!(
            serde_json::to_value(OperationStatus::Success).unwrap(),
            "SUCCESS"
        );
        assert_eq!(
            serde_json::to_value(ProvisionerStatus::Provisioning).unwrap(),
            "PROVISIONING"
        );
        assert_eq!(serde_json::to_value(ClientRole::Admin).unwrap(), "ADMIN");
    }
}
