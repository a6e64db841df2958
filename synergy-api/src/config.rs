/// Configuration management for the API server
///
/// Loaded once at startup from environment variables (a `.env` file is read
/// first when present).
///
/// # Environment Variables
///
/// | Variable | Default |
/// |----------|---------|
/// | `API_HOST` | `0.0.0.0` |
/// | `PORT` | `5000` |
/// | `APP_ENV` | `development` |
/// | `CORS_ORIGINS` | `http://localhost:5173` (comma separated, `*` = any) |
/// | `DATABASE_URL` | required |
/// | `DATABASE_MAX_CONNECTIONS` | `10` |
/// | `RUN_MIGRATIONS` | `false` |
/// | `SUPABASE_URL` | required |
/// | `SUPABASE_ANON_KEY` | required |
/// | `SUPABASE_JWT_SECRET` | required, at least 32 characters |
/// | `FRONTEND_URL` | `http://localhost:3000` |
/// | `INVITATION_TTL_HOURS` | `168` |
/// | `EMAIL_PROVIDER` | `console` |
/// | `EMAIL_API_KEY` | unset |
/// | `EMAIL_FROM` | `noreply@synergysphere.app` |
/// | `EMAIL_FROM_NAME` | `SynergySphere` |
///
/// # Example
///
/// ```no_run
/// use synergy_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::Serialize;
use std::env;
use std::str::FromStr;
use synergy_shared::email::{EmailConfig, EmailProvider};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub invitations: InvitationConfig,
    pub email: EmailSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// `development`, `production`, ...
    pub environment: String,

    /// Allowed browser origins. `*` allows any origin.
    pub cors_origins: Vec<String>,

    /// Base URL of the single-page app, used in invitation links
    pub frontend_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: String,

    pub max_connections: u32,

    /// Apply embedded migrations at startup
    pub run_migrations: bool,
}

/// Hosted auth service settings
#[derive(Debug, Clone, Serialize)]
pub struct AuthConfig {
    /// Project URL, without `/auth/v1`
    pub supabase_url: String,

    #[serde(skip_serializing)]
    pub anon_key: String,

    /// HS256 secret the auth service signs access tokens with
    #[serde(skip_serializing)]
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvitationConfig {
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailSettings {
    pub provider: String,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub from: String,
    pub from_name: String,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when a required variable is missing or a value does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let port = parse_value::<u16>("PORT", &get("PORT", "5000"))?;
        let max_connections =
            parse_value::<u32>("DATABASE_MAX_CONNECTIONS", &get("DATABASE_MAX_CONNECTIONS", "10"))?;
        let ttl_hours = parse_value::<i64>("INVITATION_TTL_HOURS", &get("INVITATION_TTL_HOURS", "168"))?;

        if ttl_hours <= 0 {
            anyhow::bail!("INVITATION_TTL_HOURS must be positive");
        }

        let jwt_secret = require("SUPABASE_JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!(
                "SUPABASE_JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let email_provider = get("EMAIL_PROVIDER", "console");
        EmailProvider::from_str(&email_provider).map_err(|e| anyhow::anyhow!(e))?;

        Ok(Self {
            api: ApiConfig {
                host: get("API_HOST", "0.0.0.0"),
                port,
                environment: get("APP_ENV", "development"),
                cors_origins: parse_origins(&get("CORS_ORIGINS", "http://localhost:5173")),
                frontend_url: get("FRONTEND_URL", "http://localhost:3000")
                    .trim_end_matches('/')
                    .to_string(),
            },
            database: DatabaseConfig {
                url: require("DATABASE_URL")?,
                max_connections,
                run_migrations: parse_bool(&get("RUN_MIGRATIONS", "false")),
            },
            auth: AuthConfig {
                supabase_url: require("SUPABASE_URL")?,
                anon_key: require("SUPABASE_ANON_KEY")?,
                jwt_secret,
            },
            invitations: InvitationConfig { ttl_hours },
            email: EmailSettings {
                provider: email_provider,
                api_key: lookup("EMAIL_API_KEY").filter(|k| !k.is_empty()),
                from: get("EMAIL_FROM", "noreply@synergysphere.app"),
                from_name: get("EMAIL_FROM_NAME", "SynergySphere"),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn is_development(&self) -> bool {
        self.api.environment.eq_ignore_ascii_case("development")
    }

    pub fn is_production(&self) -> bool {
        self.api.environment.eq_ignore_ascii_case("production")
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }

    /// Settings for the shared email service.
    pub fn email_config(&self) -> EmailConfig {
        EmailConfig {
            provider: self.email.provider.parse().unwrap_or(EmailProvider::Console),
            api_key: self.email.api_key.clone(),
            sender_email: self.email.from.clone(),
            sender_name: self.email.from_name.clone(),
        }
    }

    /// Link the invitee follows to accept or decline.
    pub fn invitation_link(&self, token: &str, action: &str) -> String {
        format!("{}/invitations/{}/{}", self.api.frontend_url, token, action)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e))
}

/// Splits a comma-separated origin list, dropping blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgresql://localhost/synergy"),
            ("SUPABASE_URL", "https://example.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon-key"),
            ("SUPABASE_JWT_SECRET", "test-secret-key-that-is-at-least-32-bytes"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> anyhow::Result<Config> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_vars()).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert!(config.is_development());
        assert_eq!(config.api.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.database.max_connections, 10);
        assert!(!config.database.run_migrations);
        assert_eq!(config.invitations.ttl_hours, 168);
        assert_eq!(config.email.provider, "console");
        assert_eq!(config.email_config().provider, EmailProvider::Console);
    }

    #[test]
    fn test_missing_required_variable() {
        let mut vars = base_vars();
        vars.remove("DATABASE_URL");

        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut vars = base_vars();
        vars.insert("SUPABASE_JWT_SECRET", "too-short");

        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_invalid_port_and_provider() {
        let mut vars = base_vars();
        vars.insert("PORT", "eighty");
        assert!(load(&vars).unwrap_err().to_string().contains("PORT"));

        let mut vars = base_vars();
        vars.insert("EMAIL_PROVIDER", "carrier-pigeon");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut vars = base_vars();
        vars.insert("PORT", "8080");
        vars.insert("APP_ENV", "production");
        vars.insert("CORS_ORIGINS", "https://app.example.com/, https://admin.example.com,");
        vars.insert("RUN_MIGRATIONS", "TRUE");
        vars.insert("FRONTEND_URL", "https://app.example.com/");

        let config = load(&vars).unwrap();
        assert_eq!(config.api.port, 8080);
        assert!(config.is_production());
        assert_eq!(
            config.api.cors_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert!(!config.allows_any_origin());
        assert!(config.database.run_migrations);
        assert_eq!(
            config.invitation_link("inv_abc", "accept"),
            "https://app.example.com/invitations/inv_abc/accept"
        );
    }

    #[test]
    fn test_wildcard_origin() {
        assert_eq!(parse_origins("*"), vec!["*"]);
        assert!(parse_origins(" , ").is_empty());
    }
}
