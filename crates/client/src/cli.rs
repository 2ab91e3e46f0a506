//! Command-line front end.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use labtrack_auth::{Role, explain_authorization};
use labtrack_core::ClientConfig;
use labtrack_router::{Navigation, landing_screen};

use crate::api::{Credentials, SignupRequest};
use crate::context::AppContext;

/// labtrack - session and access tool for the project tracker.
#[derive(Debug, Parser)]
#[command(name = "labtrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides config).
    #[arg(long, env = "LABTRACK_API_URL")]
    pub api_url: Option<String>,

    /// Directory holding the persisted token (overrides config).
    #[arg(long, env = "LABTRACK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and persist the session.
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "LABTRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Register a new account.
    Signup {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "LABTRACK_PASSWORD", hide_env_values = true)]
        password: String,
        /// ADMIN, PI or MEMBER.
        #[arg(short, long, default_value = "MEMBER")]
        role: String,
    },

    /// End the session.
    Logout,

    /// Show the current identity.
    Whoami,

    /// Show what the guard does for a path.
    Navigate {
        path: String,
        /// Include the authorization explanation for the matched screen.
        #[arg(long)]
        explain: bool,
    },

    /// List every screen with its required roles.
    Routes,
}

impl Cli {
    pub fn config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::from_env().context("failed to load configuration")?;
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url.clone())?;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

/// Execute `cli.command` against `ctx`, writing user-facing output to `out`.
pub async fn run(cli: Cli, ctx: AppContext, out: &mut impl Write) -> anyhow::Result<()> {
    match cli.command {
        Command::Login { username, password } => {
            let logged_in = ctx
                .login_flow()
                .submit(&Credentials::new(username, password))
                .await?;
            if cli.json {
                writeln!(
                    out,
                    "{}",
                    serde_json::json!({ "identity": logged_in.identity, "landing": logged_in.landing.pattern() })
                )?;
            } else {
                writeln!(
                    out,
                    "logged in as {} ({}); landing on {}",
                    logged_in.identity.display_name(),
                    role_label(logged_in.identity.role()),
                    logged_in.landing
                )?;
            }
        }

        Command::Signup { username, password, role } => {
            let role = Role::from_claim(&role);
            if !role.is_recognized() {
                anyhow::bail!("unknown role '{role}'; expected ADMIN, PI or MEMBER");
            }
            let message = ctx
                .api
                .signup(&SignupRequest { username, password, role })
                .await?;
            writeln!(out, "{message}")?;
        }

        Command::Logout => {
            ctx.session.logout();
            writeln!(out, "logged out")?;
        }

        Command::Whoami => match ctx.identity() {
            Some(identity) => {
                let landing = landing_screen(identity.role());
                if cli.json {
                    writeln!(out, "{}", serde_json::json!({ "identity": identity, "landing": landing.pattern() }))?;
                } else {
                    writeln!(
                        out,
                        "{} ({}); home {}",
                        identity.display_name(),
                        role_label(identity.role()),
                        landing
                    )?;
                }
            }
            None => writeln!(out, "not logged in")?,
        },

        Command::Navigate { path, explain } => {
            let decision = ctx.evaluate(&path);
            let resolution = ctx.navigate(&path)?;

            if cli.json {
                writeln!(out, "{}", serde_json::json!({ "decision": decision, "resolution": resolution }))?;
            } else {
                match &decision.navigation {
                    Navigation::Render { screen, .. } => {
                        writeln!(out, "{path}: render {screen:?} ({:?})", decision.verdict)?
                    }
                    Navigation::Redirect { to } => writeln!(out, "{path}: redirect to {to} ({:?})", decision.verdict)?,
                }
                if !resolution.redirects.is_empty() {
                    writeln!(
                        out,
                        "settles on {} via {}",
                        resolution.screen.pattern(),
                        resolution.redirects.join(" -> ")
                    )?;
                }
            }

            if explain {
                match (ctx.guard.table().match_path(&path), ctx.identity()) {
                    (Some((rule, _)), Some(identity)) => {
                        let explanation = explain_authorization(&identity, rule.required);
                        writeln!(out, "{}", serde_json::to_string_pretty(&explanation)?)?;
                    }
                    (Some(_), None) => writeln!(out, "no session: restricted screens redirect to /login")?,
                    (None, _) => writeln!(out, "no screen matches {path}")?,
                }
            }
        }

        Command::Routes => {
            for rule in ctx.guard.table().rules() {
                writeln!(
                    out,
                    "{:<40} {:<18} {}",
                    rule.pattern.as_str(),
                    format!("{:?}", rule.screen),
                    rule.required
                )?;
            }
        }
    }

    Ok(())
}

fn role_label(role: Option<&Role>) -> &str {
    role.map(Role::as_str).unwrap_or("no role")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use labtrack_session::{InMemoryTokenStore, TokenStore};

    use super::*;

    fn token_for(sub: &str, role: &str) -> String {
        let body = URL_SAFE_NO_PAD.encode(serde_json::json!({"sub": sub, "role": role}).to_string());
        format!("h.{body}.s")
    }

    fn context(store: Arc<InMemoryTokenStore>) -> AppContext {
        let config = ClientConfig::default().with_api_url("http://127.0.0.1:9").unwrap();
        AppContext::with_store(config, store)
    }

    async fn run_args(ctx: AppContext, args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("labtrack").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        run(cli, ctx, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn whoami_reports_identity_and_home() {
        let store = Arc::new(InMemoryTokenStore::with_token(token_for("pat", "PI")));
        let out = run_args(context(store), &["whoami"]).await.unwrap();
        assert_eq!(out, "pat (PI); home /allprojects\n");

        let out = run_args(context(Arc::new(InMemoryTokenStore::new())), &["whoami"])
            .await
            .unwrap();
        assert_eq!(out, "not logged in\n");
    }

    #[tokio::test]
    async fn whoami_json_carries_landing_pattern() {
        let store = Arc::new(InMemoryTokenStore::with_token(token_for("alice", "ADMIN")));
        let out = run_args(context(store), &["whoami", "--json"]).await.unwrap();

        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["landing"], "/admin");
        assert_eq!(value["identity"]["username"], "alice");
    }

    #[tokio::test]
    async fn navigate_without_session_redirects_to_login() {
        let ctx = context(Arc::new(InMemoryTokenStore::new()));
        let out = run_args(ctx, &["navigate", "/admin"]).await.unwrap();

        assert!(out.starts_with("/admin: redirect to /login (NoSession)\n"), "{out}");
        assert!(out.contains("settles on /login via /admin"), "{out}");
    }

    #[tokio::test]
    async fn navigate_explains_a_denied_screen() {
        let store = Arc::new(InMemoryTokenStore::with_token(token_for("dora", "MEMBER")));
        let out = run_args(context(store), &["navigate", "/admin", "--explain"])
            .await
            .unwrap();

        assert!(out.starts_with("/admin: redirect to /user (UnauthorizedForRoute)\n"), "{out}");
        assert!(out.contains("\"granted\": false"), "{out}");
        assert!(out.contains("\"role_not_permitted\""), "{out}");
    }

    #[tokio::test]
    async fn logout_clears_the_persisted_token() {
        let store = Arc::new(InMemoryTokenStore::with_token(token_for("pat", "PI")));
        let ctx = context(store.clone());

        let out = run_args(ctx.clone(), &["logout"]).await.unwrap();

        assert_eq!(out, "logged out\n");
        assert_eq!(store.read().unwrap(), None);
        assert!(ctx.identity().is_none());
    }

    #[tokio::test]
    async fn signup_rejects_unknown_roles_before_calling_the_backend() {
        let ctx = context(Arc::new(InMemoryTokenStore::new()));
        let err = run_args(ctx, &["signup", "-u", "x", "-p", "y", "-r", "AUDITOR"])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown role 'AUDITOR'"));
    }
}
