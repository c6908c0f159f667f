// End-to-end loading: declaration file -> validation -> compiled engine
use std::io::Write;

use tempfile::NamedTempFile;
use warden::{BuildOptions, Decision, FileConfigProvider, config::DEFAULT_POLICY_TOML};

fn write_policy(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).unwrap();
    write!(file, "{content}").unwrap();
    file
}

#[tokio::test]
async fn starter_policy_round_trips_through_a_file() {
    let file = write_policy(".toml", DEFAULT_POLICY_TOML);
    let provider = FileConfigProvider::new(file.path()).unwrap();

    let engine = warden::build_engine(&provider, BuildOptions::default())
        .await
        .unwrap();
    assert_eq!(engine.header_resolver().len(), 4);
    assert_eq!(engine.redirect_resolver().len(), 1);
    assert!(matches!(engine.evaluate("/game"), Decision::Redirect(_)));
}

#[tokio::test]
async fn yaml_policy_with_overrides_and_captures() {
    let file = write_policy(
        ".yaml",
        r#"
headers:
  - source: "/(.*)"
    headers:
      - key: "X-Frame-Options"
        value: "DENY"
  - source: "/embed/(.*)"
    headers:
      - key: "X-Frame-Options"
        value: "SAMEORIGIN"
redirects:
  - source: "/docs/(.*)"
    destination: "https://docs.example.com/$1"
    permanent: false
images:
  remote_patterns:
    - protocol: "https"
      hostname: "**.images.example.com"
"#,
    );
    let provider = FileConfigProvider::new(file.path()).unwrap();
    let engine = warden::build_engine(&provider, BuildOptions::default())
        .await
        .unwrap();

    match engine.evaluate("/embed/player") {
        Decision::Respond(headers) => assert_eq!(headers["x-frame-options"], "SAMEORIGIN"),
        Decision::Redirect(r) => panic!("unexpected redirect to {}", r.destination),
    }

    let redirect = engine.redirect("/docs/install/linux").unwrap();
    assert_eq!(redirect.destination, "https://docs.example.com/install/linux");
    assert_eq!(redirect.status_code(), 307);

    assert!(engine.images().is_allowed("https", "eu.images.example.com"));
    assert!(!engine.images().is_allowed("https", "images.example.com"));
}

#[tokio::test]
async fn invalid_declaration_fails_fast() {
    let file = write_policy(
        ".toml",
        r#"
[[headers]]
source = "/(.*)"
headers = [{ key = "X-Frame-Options", value = "DENY" }]

[[images.remote_patterns]]
protocol = "ftp"
hostname = "files.example.com"
"#,
    );
    let provider = FileConfigProvider::new(file.path()).unwrap();
    let err = warden::build_engine(&provider, BuildOptions::default())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("ftp"), "{err:#}");
}

#[tokio::test]
async fn missing_file_fails_fast() {
    let provider = FileConfigProvider::new("/nonexistent/warden/policy.toml").unwrap();
    assert!(
        warden::build_engine(&provider, BuildOptions::default())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn overlapping_redirects_load_and_first_rule_wins() {
    let file = write_policy(
        ".toml",
        r#"
[[redirects]]
source = "/old/special"
destination = "/special"
permanent = false

[[redirects]]
source = "/old/special"
destination = "/never"
permanent = true
"#,
    );
    let provider = FileConfigProvider::new(file.path()).unwrap();
    let engine = warden::build_engine(&provider, BuildOptions::default())
        .await
        .unwrap();

    let redirect = engine.redirect("/old/special").unwrap();
    assert_eq!(redirect.destination, "/special");
    assert_eq!(redirect.status_code(), 307);
}
