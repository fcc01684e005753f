//! Accounts command implementation.

use anyhow::{Context, Result};
use clap::Args;
use msr_client::{Account, AccountFilter, CallContext};

use super::{ConnectionArgs, OutputFormat};

/// Arguments for the accounts command.
#[derive(Args)]
pub struct AccountsArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Which accounts to list: users, orgs, admins, non-admins,
    /// active-users or all. Anything else lists all accounts.
    #[arg(long, default_value = "all")]
    pub filter: String,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Runs the accounts command.
pub async fn run(ctx: &CallContext, args: &AccountsArgs) -> Result<String> {
    let client = args.connection.client()?;
    let filter = AccountFilter::parse(&args.filter);

    let accounts = client
        .read_accounts(ctx, filter)
        .await
        .with_context(|| format!("Failed to list accounts ({filter})"))?;

    match args.format {
        OutputFormat::Text => Ok(render_table(&accounts)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&accounts)?),
    }
}

fn render_table(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts found.".to_string();
    }

    let width = accounts
        .iter()
        .map(|a| a.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = format!("{:<width$}  {:<5}  {:<8}  ID", "NAME", "TYPE", "FLAGS");
    for account in accounts {
        let kind = if account.is_org { "org" } else { "user" };
        let flags = match (account.is_admin, account.is_active || account.is_org) {
            (true, _) => "admin",
            (false, true) => "-",
            (false, false) => "inactive",
        };
        out.push_str(&format!(
            "\n{:<width$}  {kind:<5}  {flags:<8}  {}",
            account.name, account.id
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use msr_mock::MockHandle;

    use super::*;
    use crate::commands::testing::connection;

    #[test]
    fn test_render_table() {
        let accounts = vec![
            Account {
                id: "1".to_string(),
                name: "acme".to_string(),
                is_org: true,
                ..Account::default()
            },
            Account {
                id: "2".to_string(),
                name: "root".to_string(),
                is_admin: true,
                is_active: true,
                ..Account::default()
            },
            Account {
                id: "3".to_string(),
                name: "bob".to_string(),
                ..Account::default()
            },
        ];

        let table = render_table(&accounts);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("NAME"));
        assert_eq!(lines[1], "acme  org    -         1");
        assert_eq!(lines[2], "root  user   admin     2");
        assert_eq!(lines[3], "bob   user   inactive  3");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_table(&[]), "No accounts found.");
    }

    #[tokio::test]
    async fn test_lists_filtered_accounts() {
        let mock = MockHandle::start().await.unwrap();
        mock.registry().add_organization("acme").unwrap();
        mock.registry().add_user("alice").unwrap();

        let args = AccountsArgs {
            connection: connection(&mock),
            filter: "orgs".to_string(),
            format: OutputFormat::Json,
        };
        let output = run(&CallContext::background(), &args).await.unwrap();
        let accounts: Vec<Account> = serde_json::from_str(&output).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "acme");

        let query = mock.requests().pop().unwrap().query;
        assert_eq!(query.as_deref(), Some("filter=orgs"));
    }
}
