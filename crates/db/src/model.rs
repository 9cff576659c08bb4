use mongodb::bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

/// A role bound to one logical database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

impl RoleGrant {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }
}

/// Credentials plus the grants they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub secret: String,
    pub roles: Vec<RoleGrant>,
}

/// An account as reported back by the server; secrets are never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub name: String,
    pub database: String,
    pub roles: Vec<RoleGrant>,
}

/// Direction or kind of a single index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Ascending,
    Descending,
    Text,
}

impl IndexKind {
    fn to_bson(self) -> Bson {
        match self {
            IndexKind::Ascending => Bson::Int32(1),
            IndexKind::Descending => Bson::Int32(-1),
            IndexKind::Text => Bson::String("text".to_string()),
        }
    }

    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::String(kind) if kind == "text" => Some(IndexKind::Text),
            other => match numeric(other)? {
                n if n > 0.0 => Some(IndexKind::Ascending),
                n if n < 0.0 => Some(IndexKind::Descending),
                _ => None,
            },
        }
    }
}

fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Key specification and options of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: Vec<(String, IndexKind)>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn ascending(field: &str) -> Self {
        Self {
            keys: vec![(field.to_string(), IndexKind::Ascending)],
            unique: false,
        }
    }

    pub fn descending(field: &str) -> Self {
        Self {
            keys: vec![(field.to_string(), IndexKind::Descending)],
            unique: false,
        }
    }

    pub fn text(fields: &[&str]) -> Self {
        Self {
            keys: fields
                .iter()
                .map(|field| (field.to_string(), IndexKind::Text))
                .collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn is_text(&self) -> bool {
        self.keys.iter().any(|(_, kind)| *kind == IndexKind::Text)
    }

    /// Server-style default name, e.g. `email_1` or `name_text_description_text`.
    pub fn default_name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, kind)| match kind {
                IndexKind::Ascending => format!("{field}_1"),
                IndexKind::Descending => format!("{field}_-1"),
                IndexKind::Text => format!("{field}_text"),
            })
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn keys_document(&self) -> Document {
        let mut keys = Document::new();
        for (field, kind) in &self.keys {
            keys.insert(field.clone(), kind.to_bson());
        }
        keys
    }

    /// Rebuild a spec from a server key document.
    ///
    /// Text indexes are reported by the server as `{_fts: "text", _ftsx: 1}`
    /// with the indexed fields held in `weights`, so those are passed in.
    pub fn from_keys(keys: &Document, weights: Option<&Document>, unique: bool) -> DbResult<Self> {
        if keys.get_str("_fts").ok() == Some("text") {
            let weights = weights.ok_or_else(|| {
                DbError::InvalidIndex("text index reported without weights".to_string())
            })?;
            let mut fields: Vec<&str> = weights.keys().map(String::as_str).collect();
            fields.sort_unstable();
            return Ok(Self {
                keys: fields
                    .into_iter()
                    .map(|field| (field.to_string(), IndexKind::Text))
                    .collect(),
                unique,
            });
        }

        let keys = keys
            .iter()
            .map(|(field, value)| {
                IndexKind::from_bson(value)
                    .map(|kind| (field.clone(), kind))
                    .ok_or_else(|| DbError::InvalidIndex(format!("unsupported key {field}: {value}")))
            })
            .collect::<DbResult<Vec<_>>>()?;
        Ok(Self { keys, unique })
    }

    /// Text fields in sorted order, matching how the server reports them.
    pub fn normalized(&self) -> Self {
        if !self.is_text() {
            return self.clone();
        }
        let mut keys = self.keys.clone();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            keys,
            unique: self.unique,
        }
    }
}

/// Index metadata as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub spec: IndexSpec,
}

impl IndexInfo {
    /// Every collection carries an implicit `_id_` index that is not secondary.
    pub fn is_secondary(&self) -> bool {
        self.name != "_id_"
    }
}

/// Build the `createUser` command for an account.
pub fn create_user_command(account: &Account) -> Document {
    let roles: Vec<Bson> = account
        .roles
        .iter()
        .map(|grant| Bson::Document(doc! { "role": grant.role.as_str(), "db": grant.db.as_str() }))
        .collect();
    doc! {
        "createUser": account.name.as_str(),
        "pwd": account.secret.as_str(),
        "roles": roles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_follow_server_convention() {
        assert_eq!(IndexSpec::ascending("email").unique().default_name(), "email_1");
        assert_eq!(IndexSpec::descending("createdAt").default_name(), "createdAt_-1");
        assert_eq!(
            IndexSpec::text(&["name", "description"]).default_name(),
            "name_text_description_text"
        );
    }

    #[test]
    fn text_index_is_rebuilt_from_weights() {
        let keys = doc! { "_fts": "text", "_ftsx": 1 };
        let weights = doc! { "name": 1, "description": 1 };
        let spec = IndexSpec::from_keys(&keys, Some(&weights), false).unwrap();
        assert_eq!(spec, IndexSpec::text(&["name", "description"]).normalized());
    }

    #[test]
    fn numeric_keys_map_to_direction() {
        let spec = IndexSpec::from_keys(&doc! { "createdAt": -1.0 }, None, false).unwrap();
        assert_eq!(spec, IndexSpec::descending("createdAt"));
    }

    #[test]
    fn create_user_command_lists_grants() {
        let account = Account {
            name: "readonly".to_string(),
            secret: "readonly123".to_string(),
            roles: vec![RoleGrant::new("read", "myapp")],
        };
        let command = create_user_command(&account);
        assert_eq!(command.get_str("createUser").unwrap(), "readonly");
        assert_eq!(command.get_str("pwd").unwrap(), "readonly123");
        let roles = command.get_array("roles").unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(
            roles[0].as_document().unwrap(),
            &doc! { "role": "read", "db": "myapp" }
        );
    }
}
