use scout_core::{parse_page, BalanceChecker, Chain, ConfigError, ResumePoint, ScanConfig};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn toml_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_applies_defaults() {
    let file = toml_file("chain = \"btc\"\n");
    let config = ScanConfig::load(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.chain, Chain::Btc);
    assert_eq!(config.workers, 1);
    assert_eq!(config.rate_per_minute(), 50);
    assert_eq!(config.proxy_file, PathBuf::from("proxy.txt"));
    assert_eq!(config.output_file(), PathBuf::from("btc_output.txt"));
    assert_eq!(config.request_timeout().as_secs(), 30);
    assert!(config.resume.is_none());
}

#[test]
fn test_load_full_file() {
    let file = toml_file(
        r#"
chain = "eth"
workers = 6
rate_per_minute = 120
api_keys = ["K1", "K2"]
output_file = "found.txt"
status_line = false

[resume]
page = "123456789012345678901234567890"

[endpoints]
etherscan = "http://127.0.0.1:8080/api"
"#,
    );
    let config = ScanConfig::load(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.chain, Chain::Eth);
    assert_eq!(config.workers, 6);
    assert_eq!(config.rate_per_minute(), 120);
    assert_eq!(config.api_keys, vec!["K1", "K2"]);
    assert_eq!(config.output_file(), PathBuf::from("found.txt"));
    assert!(!config.status_line);
    assert_eq!(
        config.resume,
        Some(ResumePoint::Page("123456789012345678901234567890".into()))
    );
    assert_eq!(config.endpoints.base(Chain::Eth), "http://127.0.0.1:8080/api");
    assert_eq!(
        config.endpoints.base(Chain::Btc),
        "https://blockchain.info/balance"
    );
}

#[test]
fn test_credential_chain_without_keys_is_rejected() {
    for chain in ["eth", "bsc"] {
        let file = toml_file(&format!("chain = \"{chain}\"\n"));
        let err = ScanConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingField {
                field: "api_keys".into()
            }
        );
    }
}

#[test]
fn test_blank_api_key_is_rejected() {
    let file = toml_file("chain = \"eth\"\napi_keys = [\"K1\", \"  \"]\n");
    let err = ScanConfig::load(file.path().to_str().unwrap()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidValue {
            field: "api_keys".into(),
            reason: "entry 2 is blank".into(),
        }
    );

    let mut config = ScanConfig::for_chain(Chain::Bsc);
    config.api_keys = vec!["K1".into(), "".into()];
    assert!(matches!(
        BalanceChecker::from_config(&config),
        Err(ConfigError::InvalidValue { .. })
    ));

    config.api_keys = vec![" K1 ".into(), "K2".into()];
    config.proxy_file = PathBuf::from("/nonexistent/proxy.txt");
    let checker = BalanceChecker::from_config(&config).unwrap();
    assert_eq!(checker.available_credentials(), 2);
}

#[test]
fn test_validate_rejects_zero_values() {
    let mut config = ScanConfig::for_chain(Chain::Btc);
    assert!(config.validate().is_ok());

    config.workers = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { ref field, .. }) if field == "workers"
    ));

    config.workers = 2;
    config.rate_per_minute = Some(0);
    assert!(config.validate().is_err());

    config.rate_per_minute = None;
    config.request_timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_bad_resume_page_is_rejected() {
    let mut config = ScanConfig::for_chain(Chain::Btc);
    config.resume = Some(ResumePoint::Page("12x".into()));
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { ref field, .. }) if field == "resume.page"
    ));

    config.resume = Some(ResumePoint::Key("anything".into()));
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_page_handles_large_indices() {
    let page = parse_page(" 904625697166532776746648320380374280100293470930272690489102837043110636674 ")
        .unwrap();
    assert!(page < *scout_core::KEYSPACE_PAGES);
    assert!(parse_page("").is_err());
    assert!(parse_page("-1").is_err());
}

#[test]
fn test_missing_file_is_load_error() {
    let err = ScanConfig::load("/nonexistent/scout-config").unwrap_err();
    assert!(matches!(err, ConfigError::Load { .. }));
}
