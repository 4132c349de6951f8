use crate::cli::actions::Action;
use crate::config::AuthConfig;
use anyhow::Result;
use secrecy::SecretString;
use std::time::Duration;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let signing_secret = matches
        .get_one::<String>("signing-secret")
        .map(|s| SecretString::from(s.as_str()))
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --signing-secret"))?;

    let mut config = AuthConfig::new(signing_secret);
    if let Some(issuer) = matches.get_one::<String>("issuer") {
        config = config.with_issuer(issuer.to_string());
    }
    if let Some(audience) = matches.get_one::<String>("audience") {
        config = config.with_audience(audience.to_string());
    }
    if let Some(&seconds) = matches.get_one::<u64>("access-ttl") {
        config = config.with_access_ttl(Duration::from_secs(seconds));
    }
    if let Some(&seconds) = matches.get_one::<u64>("refresh-ttl") {
        config = config.with_refresh_ttl(Duration::from_secs(seconds));
    }
    if let Some(&threshold) = matches.get_one::<i64>("lockout-threshold") {
        config = config.with_lockout_threshold(threshold);
    }
    if let Some(&seconds) = matches.get_one::<u64>("lockout-duration") {
        config = config.with_lockout_duration(Duration::from_secs(seconds));
    }

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?,
        config,
    })
}
