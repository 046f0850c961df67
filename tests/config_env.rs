// tests/config_env.rs
// Env-driven config loading; serialized because the env is process-global.

use std::io::Write;

use news_bias_analyzer::config::{
    AppConfig, StanceBackend, ENV_CONFIG_PATH, ENV_ENCODER_URL, ENV_MATCH_CUTOFF,
    ENV_SOURCE_PRIORS_PATH,
};
use news_bias_analyzer::error::ErrorKind;
use serial_test::serial;

fn clear_env() {
    for k in [
        ENV_CONFIG_PATH,
        ENV_ENCODER_URL,
        ENV_MATCH_CUTOFF,
        ENV_SOURCE_PRIORS_PATH,
    ] {
        std::env::remove_var(k);
    }
}

fn write_toml(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f
}

#[test]
#[serial]
fn file_then_env_overrides() {
    clear_env();
    let f = write_toml(
        r#"
        [encoder]
        url = "http://encoder.internal/embed"

        [analysis]
        match_cutoff = 80

        [fusion.weights]
        sentence = 0.2
        "#,
    );
    std::env::set_var(ENV_CONFIG_PATH, f.path());
    std::env::set_var(ENV_MATCH_CUTOFF, "65");
    std::env::set_var(ENV_SOURCE_PRIORS_PATH, "/srv/priors.csv");

    let cfg = AppConfig::load().unwrap();
    assert_eq!(cfg.encoder.url, "http://encoder.internal/embed");
    assert_eq!(cfg.analysis.match_cutoff, 65);
    assert_eq!(cfg.resources.source_priors_path.to_str(), Some("/srv/priors.csv"));
    assert!((cfg.fusion.weights.sentence - 0.2).abs() < 1e-12);
    assert_eq!(cfg.stance.backend, StanceBackend::Remote);
    clear_env();
}

#[test]
#[serial]
fn explicit_missing_file_is_a_startup_error() {
    clear_env();
    std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/bias.toml");
    let err = AppConfig::load().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StartupResource);
    clear_env();
}

#[test]
#[serial]
fn malformed_cutoff_is_rejected() {
    clear_env();
    let f = write_toml("");
    std::env::set_var(ENV_CONFIG_PATH, f.path());
    std::env::set_var(ENV_MATCH_CUTOFF, "seventy");
    let err = AppConfig::load().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    clear_env();
}

#[test]
#[serial]
fn out_of_range_threshold_in_file_is_rejected() {
    clear_env();
    let f = write_toml("[fusion.thresholds]\nleft = 1.5\n");
    std::env::set_var(ENV_CONFIG_PATH, f.path());
    let err = AppConfig::load().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    clear_env();
}
