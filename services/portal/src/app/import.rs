//! services/portal/src/app/import.rs
//!
//! Validates tabular account rows (ID | Password | Department | Role) before they
//! are handed to `AccountRepository::bulk_upsert`.

use docuhub_core::domain::{NewAccount, Role};
use docuhub_core::ports::PortResult;
use tracing::info;

use crate::app::accounts::AccountRepository;

/// One spreadsheet row as raw cell text. Blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRow {
    pub login_id: Option<String>,
    pub secret: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
}

impl ImportRow {
    /// Builds a row from `(header, cell)` pairs. Headers are matched
    /// case-insensitively; unknown headers are ignored.
    pub fn from_columns<I, K, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut row = Self::default();
        for (header, cell) in columns {
            let cell = cell.as_ref().trim();
            if cell.is_empty() {
                continue;
            }
            let slot = match header.as_ref().trim().to_ascii_lowercase().as_str() {
                "id" | "login_id" | "loginid" => &mut row.login_id,
                "password" | "secret" => &mut row.secret,
                "department" => &mut row.department,
                "role" => &mut row.role,
                _ => continue,
            };
            *slot = Some(cell.to_string());
        }
        row
    }

    fn validate(self) -> Result<NewAccount, RowError> {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        if !present(&self.login_id) {
            missing.push("ID");
        }
        if !present(&self.secret) {
            missing.push("Password");
        }
        if !present(&self.department) {
            missing.push("Department");
        }

        if !missing.is_empty() {
            return Err(RowError::MissingFields(missing));
        }
        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => Role::Member,
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|_| RowError::InvalidRole(raw.to_string()))?,
        };

        Ok(NewAccount {
            login_id: self.login_id.unwrap_or_default(),
            secret: self.secret.unwrap_or_default(),
            department: self.department.unwrap_or_default(),
            role,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Invalid role \"{0}\" (must be \"member\" or \"admin\")")]
    InvalidRole(String),
}

/// The validation result of one row; `row` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowValidation {
    pub row: usize,
    pub result: Result<NewAccount, RowError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    pub rows: Vec<RowValidation>,
}

impl ImportPlan {
    pub fn accepted(&self) -> impl Iterator<Item = &NewAccount> {
        self.rows.iter().filter_map(|r| r.result.as_ref().ok())
    }

    pub fn rejected(&self) -> impl Iterator<Item = (usize, &RowError)> {
        self.rows
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.row, e)))
    }
}

/// Checks every row independently. Never touches storage.
pub fn validate_rows(rows: Vec<ImportRow>) -> ImportPlan {
    ImportPlan {
        rows: rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| RowValidation {
                row: i + 1,
                result: row.validate(),
            })
            .collect(),
    }
}

#[derive(Clone)]
pub struct AccountImport {
    accounts: AccountRepository,
}

impl AccountImport {
    pub fn new(accounts: AccountRepository) -> Self {
        Self { accounts }
    }

    pub fn validate(&self, rows: Vec<ImportRow>) -> ImportPlan {
        validate_rows(rows)
    }

    /// Upserts the accepted rows; rejected rows are left out. Returns how many
    /// accounts were written.
    pub async fn commit(&self, plan: &ImportPlan) -> PortResult<usize> {
        let accepted: Vec<NewAccount> = plan.accepted().cloned().collect();
        let written = self.accounts.bulk_upsert(accepted).await?;
        info!(
            "Account import committed: {} written, {} row(s) rejected",
            written,
            plan.rejected().count()
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::app::testing::{accounts, new_account};
    use std::sync::Arc;

    fn row(id: &str, secret: &str, department: &str, role: &str) -> ImportRow {
        ImportRow::from_columns([
            ("ID", id),
            ("Password", secret),
            ("Department", department),
            ("Role", role),
        ])
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let parsed = ImportRow::from_columns(vec![
            ("id".to_string(), " 1001 ".to_string()),
            ("PASSWORD".to_string(), "pass123".to_string()),
            ("Department".to_string(), "Finance".to_string()),
            ("Notes".to_string(), "ignored".to_string()),
        ]);
        assert_eq!(parsed.login_id.as_deref(), Some("1001"));
        assert_eq!(parsed.secret.as_deref(), Some("pass123"));
        assert_eq!(parsed.role, None);
    }

    #[test]
    fn test_validation_reports_each_row() {
        let plan = validate_rows(vec![
            row("1001", "pass123", "Finance", "user"),
            row("", "pass456", "", "member"),
            row("admin2", "adminpass", "IT", "owner"),
            row("1003", "pass789", "Sales", ""),
        ]);

        let accepted: Vec<_> = plan.accepted().collect();
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted[0].role, Role::Member);
        assert_eq!(accepted[1].login_id, "1003");
        assert_eq!(accepted[1].role, Role::Member);

        let rejected: Vec<_> = plan.rejected().collect();
        assert_eq!(
            rejected,
            vec![
                (2, &RowError::MissingFields(vec!["ID", "Department"])),
                (3, &RowError::InvalidRole("owner".to_string())),
            ]
        );
        assert_eq!(
            rejected[0].1.to_string(),
            "Missing required fields: ID, Department"
        );
    }

    #[test]
    fn test_missing_fields_are_reported_before_a_bad_role() {
        let plan = validate_rows(vec![row("", "pass", "Finance", "boss")]);
        assert_eq!(
            plan.rejected().collect::<Vec<_>>(),
            vec![(1, &RowError::MissingFields(vec!["ID"]))]
        );
    }

    #[tokio::test]
    async fn test_commit_is_idempotent_and_last_write_wins() {
        let repo = accounts(Arc::new(MemoryStore::new()));
        repo.create(new_account("1001", "old", Role::Member)).await.unwrap();
        let import = AccountImport::new(repo.clone());

        let plan = import.validate(vec![
            row("1001", "pass123", "Marketing", "admin"),
            row("1002", "pass456", "Finance", "member"),
            row("bad", "", "Finance", "member"),
        ]);
        assert_eq!(import.commit(&plan).await.unwrap(), 2);
        assert_eq!(import.commit(&plan).await.unwrap(), 2);

        let profiles = repo.list_profiles().await.unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].department, "Marketing");
        assert_eq!(profiles[0].role, Role::Admin);
    }
}
