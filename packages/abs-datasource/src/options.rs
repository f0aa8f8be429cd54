use crate::error::{DatasourceError, Result};
use regex::Regex;
use std::collections::BTreeMap;

pub const CONN_STR: &str = "conn_str";
pub const ACCOUNT_URL: &str = "account_url";

lazy_static::lazy_static! {
    static ref CONFIG_VAR: Regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    static ref CONN_STR_ACCOUNT: Regex = Regex::new(r".*?AccountName=(.+?);.*?").unwrap();
    static ref ACCOUNT_URL_ACCOUNT: Regex =
        Regex::new(r"(?:https?://)?(.+?)\.blob\.core\.windows\.net").unwrap();
}

/// How the blob service client authenticates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    ConnectionString(String),
    AccountUrl(String),
}

/// Replaces every `${VAR}` with the value `lookup` returns for it.
pub fn substitute_config_str(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut missing = None;
    let substituted = CONFIG_VAR.replace_all(raw, |caps: &regex::Captures| {
        let name = &caps[1];
        lookup(name).unwrap_or_else(|| {
            missing.get_or_insert_with(|| name.to_string());
            String::new()
        })
    });

    match missing {
        Some(name) => Err(DatasourceError::InvalidOptions(format!(
            "environment variable '{}' is not set",
            name
        ))),
        None => Ok(substituted.into_owned()),
    }
}

/// Resolves config strings in every option value.
pub fn resolve_options(
    options: &BTreeMap<String, String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BTreeMap<String, String>> {
    let mut resolved = BTreeMap::new();
    for (key, value) in options {
        resolved.insert(key.clone(), substitute_config_str(value, &lookup)?);
    }
    Ok(resolved)
}

/// Picks the endpoint; exactly one of `conn_str` and `account_url` must be set.
pub fn endpoint(options: &BTreeMap<String, String>) -> Result<Endpoint> {
    let conn_str = options.get(CONN_STR).filter(|v| !v.is_empty());
    let account_url = options.get(ACCOUNT_URL).filter(|v| !v.is_empty());

    match (conn_str, account_url) {
        (Some(conn_str), None) => Ok(Endpoint::ConnectionString(conn_str.clone())),
        (None, Some(account_url)) => Ok(Endpoint::AccountUrl(account_url.clone())),
        _ => Err(DatasourceError::InvalidOptions(
            "You must provide one of `conn_str` or `account_url` to the `azure_options` key in your config (but not both)".to_string(),
        )),
    }
}

pub fn account_name(endpoint: &Endpoint) -> Result<String> {
    let (pattern, raw) = match endpoint {
        Endpoint::ConnectionString(conn_str) => (&*CONN_STR_ACCOUNT, conn_str),
        Endpoint::AccountUrl(account_url) => (&*ACCOUNT_URL_ACCOUNT, account_url),
    };
    pattern
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DatasourceError::ClientCreation("could not determine the storage account name".to_string()))
}

/// `wasbs://{container}@{account}.blob.core.windows.net/{path}`
pub fn wasbs_url(account_name: &str, container: &str, path: &str) -> String {
    format!(
        "wasbs://{}@{}.blob.core.windows.net/{}",
        container, account_name, path
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn account_name_from_connection_string() {
        let endpoint = Endpoint::ConnectionString(
            "DefaultEndpointsProtocol=https;AccountName=myaccount;AccountKey=abc==;EndpointSuffix=core.windows.net".into(),
        );
        assert_eq!(account_name(&endpoint).unwrap(), "myaccount");
    }

    #[test]
    fn account_name_from_url() {
        for url in [
            "https://myaccount.blob.core.windows.net",
            "http://myaccount.blob.core.windows.net/",
            "myaccount.blob.core.windows.net",
        ] {
            let endpoint = Endpoint::AccountUrl(url.into());
            assert_eq!(account_name(&endpoint).unwrap(), "myaccount", "{}", url);
        }
    }

    #[test]
    fn account_name_missing() {
        let endpoint = Endpoint::ConnectionString("AccountKey=abc".into());
        assert!(matches!(
            account_name(&endpoint),
            Err(DatasourceError::ClientCreation(_))
        ));
        let endpoint = Endpoint::AccountUrl("https://example.com".into());
        assert!(account_name(&endpoint).is_err());
    }

    #[test]
    fn exactly_one_endpoint() {
        assert!(endpoint(&opts(&[])).is_err());
        assert!(endpoint(&opts(&[(CONN_STR, "a"), (ACCOUNT_URL, "b")])).is_err());
        assert_eq!(
            endpoint(&opts(&[(ACCOUNT_URL, "b"), ("credential", "x")])).unwrap(),
            Endpoint::AccountUrl("b".into())
        );
        assert_eq!(
            endpoint(&opts(&[(CONN_STR, "a"), (ACCOUNT_URL, "")])).unwrap(),
            Endpoint::ConnectionString("a".into())
        );
    }

    #[test]
    fn substitutes_variables() {
        let lookup = |name: &str| (name == "ABS_KEY").then(|| "s3cr3t".to_string());
        assert_eq!(
            substitute_config_str("AccountName=a;AccountKey=${ABS_KEY};", lookup).unwrap(),
            "AccountName=a;AccountKey=s3cr3t;"
        );
        assert_eq!(substitute_config_str("plain", lookup).unwrap(), "plain");

        let err = substitute_config_str("${NOPE}", lookup).unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn wasbs_template() {
        assert_eq!(
            wasbs_url("acct", "data", "2024/01/file.csv"),
            "wasbs://data@acct.blob.core.windows.net/2024/01/file.csv"
        );
    }
}
