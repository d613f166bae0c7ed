use crate::sesame::auth::{
    session::{is_cookie_token, DEFAULT_SESSION_MAX_AGE_SECONDS, DEFAULT_SESSION_NAME},
    DEFAULT_ADMIN_USERNAME,
};
use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SESSION_KEY: &str = "session-key";
pub const ARG_SESSION_NAME: &str = "session-name";
pub const ARG_SESSION_MAX_AGE: &str = "session-max-age";
pub const ARG_SESSION_COOKIE_SECURE: &str = "session-cookie-secure";
pub const ARG_ADMIN_USERS: &str = "admin-users";

pub struct Options {
    pub key: SecretString,
    pub name: String,
    pub max_age_seconds: u64,
    pub secure: bool,
    pub admin_users: Vec<String>,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the session key is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let key = matches
            .get_one::<String>(ARG_SESSION_KEY)
            .filter(|v| !v.trim().is_empty())
            .map(|v| SecretString::from(v.clone()))
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_SESSION_KEY}"))?;

        let name = matches
            .get_one::<String>(ARG_SESSION_NAME)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());

        let max_age_seconds = matches
            .get_one::<u64>(ARG_SESSION_MAX_AGE)
            .copied()
            .unwrap_or(DEFAULT_SESSION_MAX_AGE_SECONDS);

        let admin_users = matches
            .get_many::<String>(ARG_ADMIN_USERS)
            .map(|values| values.cloned().collect())
            .unwrap_or_else(|| vec![DEFAULT_ADMIN_USERNAME.to_string()]);

        Ok(Self {
            key,
            name,
            max_age_seconds,
            secure: matches.get_flag(ARG_SESSION_COOKIE_SECURE),
            admin_users,
        })
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("key", &"[REDACTED]")
            .field("name", &self.name)
            .field("max_age_seconds", &self.max_age_seconds)
            .field("secure", &self.secure)
            .field("admin_users", &self.admin_users)
            .finish()
    }
}

/// Cookie names must be tokens, otherwise browsers split or drop the cookie.
#[must_use]
pub fn validator_cookie_name() -> ValueParser {
    ValueParser::from(move |name: &str| -> std::result::Result<String, String> {
        if is_cookie_token(name) {
            Ok(name.to_string())
        } else {
            Err("cookie name must be visible ASCII without spaces or ()<>@,;:\\\"/[]?={}".to_string())
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_KEY)
                .long(ARG_SESSION_KEY)
                .help("Secret used to sign session cookies (at least 32 bytes)")
                .env("SESAME_SESSION_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_NAME)
                .long(ARG_SESSION_NAME)
                .help("Session cookie name")
                .env("SESAME_SESSION_NAME")
                .default_value(DEFAULT_SESSION_NAME)
                .value_parser(validator_cookie_name()),
        )
        .arg(
            Arg::new(ARG_SESSION_MAX_AGE)
                .long(ARG_SESSION_MAX_AGE)
                .help("Session cookie lifetime in seconds")
                .env("SESAME_SESSION_MAX_AGE")
                .default_value("2592000")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE_SECURE)
                .long(ARG_SESSION_COOKIE_SECURE)
                .help("Mark the session cookie Secure (HTTPS only)")
                .env("SESAME_SESSION_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_ADMIN_USERS)
                .long(ARG_ADMIN_USERS)
                .help("Comma separated usernames that receive a session on login")
                .env("SESAME_ADMIN_USERS")
                .value_delimiter(',')
                .default_value(DEFAULT_ADMIN_USERNAME),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn clean_env() -> [(&'static str, Option<&'static str>); 5] {
        [
            ("SESAME_SESSION_KEY", None),
            ("SESAME_SESSION_NAME", None),
            ("SESAME_SESSION_MAX_AGE", None),
            ("SESAME_SESSION_COOKIE_SECURE", None),
            ("SESAME_ADMIN_USERS", None),
        ]
    }

    #[test]
    fn defaults() {
        temp_env::with_vars(clean_env(), || {
            let matches = with_args(Command::new("sesame"))
                .get_matches_from(vec!["sesame", "--session-key", KEY]);
            let options = Options::parse(&matches).unwrap();

            assert_eq!(options.key.expose_secret(), KEY);
            assert_eq!(options.name, "session-name");
            assert_eq!(options.max_age_seconds, 2_592_000);
            assert!(!options.secure);
            assert_eq!(options.admin_users, vec!["admin".to_string()]);
        });
    }

    #[test]
    fn from_env() {
        temp_env::with_vars(
            [
                ("SESAME_SESSION_KEY", Some(KEY)),
                ("SESAME_SESSION_NAME", Some("sid")),
                ("SESAME_SESSION_MAX_AGE", Some("3600")),
                ("SESAME_SESSION_COOKIE_SECURE", Some("true")),
                ("SESAME_ADMIN_USERS", Some("root,alice")),
            ],
            || {
                let matches = with_args(Command::new("sesame")).get_matches_from(vec!["sesame"]);
                let options = Options::parse(&matches).unwrap();

                assert_eq!(options.name, "sid");
                assert_eq!(options.max_age_seconds, 3600);
                assert!(options.secure);
                assert_eq!(
                    options.admin_users,
                    vec!["root".to_string(), "alice".to_string()]
                );
            },
        );
    }

    #[test]
    fn session_name_must_be_a_cookie_token() {
        temp_env::with_vars(clean_env(), || {
            for name in ["a;b", "a=b", "a b", "bad\u{1}"] {
                let result = with_args(Command::new("sesame")).try_get_matches_from(vec![
                    "sesame",
                    "--session-key",
                    KEY,
                    "--session-name",
                    name,
                ]);
                assert!(result.is_err(), "{name:?} accepted");
            }

            let matches = with_args(Command::new("sesame")).get_matches_from(vec![
                "sesame",
                "--session-key",
                KEY,
                "--session-name",
                "__Host-sid",
            ]);
            assert_eq!(Options::parse(&matches).unwrap().name, "__Host-sid");
        });
    }

    #[test]
    fn blank_key_is_rejected() {
        temp_env::with_vars(clean_env(), || {
            let matches = with_args(Command::new("sesame"))
                .get_matches_from(vec!["sesame", "--session-key", "   "]);
            let err = Options::parse(&matches).unwrap_err();

            assert!(err.to_string().contains("--session-key"));
        });
    }

    #[test]
    fn debug_redacts_key() {
        temp_env::with_vars(clean_env(), || {
            let matches = with_args(Command::new("sesame"))
                .get_matches_from(vec!["sesame", "--session-key", KEY]);
            let options = Options::parse(&matches).unwrap();

            assert!(!format!("{options:?}").contains(KEY));
        });
    }
}
