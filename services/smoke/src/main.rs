//! DDNS.LAND Smoke Test
//!
//! Walks a running engine through the user-facing flow: health, register,
//! profile, record create/list/update/delete, the free-plan ceiling and a
//! bad token. Records it creates are deleted again at the end.
//!
//! ## Usage
//! ```bash
//! ddns-smoke --base-url http://127.0.0.1:8080
//!
//! # Machine-readable summary
//! DDNS_API_URL=https://api.ddns.land ddns-smoke --format json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

/// DDNS.LAND end-to-end check
#[derive(Parser, Debug)]
#[command(name = "ddns-smoke")]
#[command(about = "Exercise a running DDNS.LAND engine end to end")]
#[command(version)]
struct Args {
    /// Engine base URL
    #[arg(long, env = "DDNS_API_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Domain for the throwaway account (must pass the engine's allow-list)
    #[arg(long, default_value = "gmail.com")]
    email_domain: String,

    /// Password for the throwaway account
    #[arg(long, default_value = "SmokePass123!")]
    password: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Output format: text (default), json
    #[arg(long, default_value = "text")]
    format: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    success: bool,
    status: Option<u16>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SmokeSummary {
    base_url: String,
    total: usize,
    passed: usize,
    failed: usize,
    results: Vec<CheckResult>,
}

struct Runner {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    created: Vec<String>,
    results: Vec<CheckResult>,
}

impl Runner {
    fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            created: Vec::new(),
            results: Vec::new(),
        })
    }

    /// Send one request and record whether it came back with `expected`
    async fn check(
        &mut self,
        name: &str,
        method: Method,
        path: &str,
        expected: StatusCode,
        body: Option<Value>,
    ) -> Option<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let (result, payload) = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let payload: Value = response.json().await.unwrap_or(Value::Null);
                if status == expected {
                    eprintln!("  ✅ {} ({})", name, status.as_u16());
                    (
                        CheckResult {
                            name: name.to_string(),
                            success: true,
                            status: Some(status.as_u16()),
                            error: None,
                        },
                        Some(payload),
                    )
                } else {
                    let detail = payload["detail"].as_str().unwrap_or_default();
                    let error = format!("expected {}, got {} {}", expected.as_u16(), status.as_u16(), detail);
                    eprintln!("  ❌ {}: {}", name, error);
                    (
                        CheckResult {
                            name: name.to_string(),
                            success: false,
                            status: Some(status.as_u16()),
                            error: Some(error),
                        },
                        None,
                    )
                }
            }
            Err(e) => {
                eprintln!("  ❌ {}: Request failed: {}", name, e);
                (
                    CheckResult {
                        name: name.to_string(),
                        success: false,
                        status: None,
                        error: Some(format!("Request failed: {}", e)),
                    },
                    None,
                )
            }
        };

        self.results.push(result);
        payload
    }

    async fn create(&mut self, record_type: &str, label: &str, content: &str) -> Option<String> {
        let body = json!({
            "record_type": record_type,
            "label": label,
            "content": content,
            "ttl": 1,
            "proxied": false
        });
        let created = self
            .check(
                &format!("Create {} record", record_type),
                Method::POST,
                "api/dns/records",
                StatusCode::OK,
                Some(body),
            )
            .await?;

        let id = created["id"].as_str()?.to_string();
        self.created.push(id.clone());
        Some(id)
    }

    async fn cleanup(&mut self) {
        for id in std::mem::take(&mut self.created) {
            self.check(
                "Delete record",
                Method::DELETE,
                &format!("api/dns/records/{}", id),
                StatusCode::OK,
                None,
            )
            .await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let stamp = chrono::Utc::now().timestamp();
    let email = format!("smoke_{}@{}", stamp, args.email_domain);

    let mut runner = Runner::new(&args.base_url, Duration::from_secs(args.timeout_secs))?;
    eprintln!("🚀 Smoke testing {}", runner.base_url);

    runner
        .check("Health", Method::GET, "api/health", StatusCode::OK, None)
        .await;

    let credentials = json!({ "email": email, "password": args.password });
    let session = runner
        .check(
            "Register",
            Method::POST,
            "api/auth/register",
            StatusCode::OK,
            Some(credentials.clone()),
        )
        .await;

    match session.as_ref().and_then(|s| s["token"].as_str()) {
        Some(token) => runner.token = Some(token.to_string()),
        None => anyhow::bail!("Registration failed for {}, stopping", email),
    }

    runner
        .check("Profile", Method::GET, "api/auth/me", StatusCode::OK, None)
        .await;
    runner
        .check("List records", Method::GET, "api/dns/records", StatusCode::OK, None)
        .await;

    let first = runner
        .create("A", &format!("smoke-a-{}", stamp), "192.168.1.1")
        .await;
    runner
        .create("CNAME", &format!("smoke-cname-{}", stamp), "example.com")
        .await;

    runner
        .check(
            "Free plan ceiling",
            Method::POST,
            "api/dns/records",
            StatusCode::FORBIDDEN,
            Some(json!({
                "record_type": "A",
                "label": format!("smoke-limit-{}", stamp),
                "content": "192.168.1.3"
            })),
        )
        .await;

    if let Some(id) = &first {
        runner
            .check(
                "Update record",
                Method::PUT,
                &format!("api/dns/records/{}", id),
                StatusCode::OK,
                Some(json!({ "content": "192.168.1.100", "ttl": 1, "proxied": false })),
            )
            .await;
    }

    let token = runner.token.replace("invalid-token".to_string());
    runner
        .check("Invalid token", Method::GET, "api/auth/me", StatusCode::UNAUTHORIZED, None)
        .await;
    runner.token = token;

    runner
        .check("Login", Method::POST, "api/auth/login", StatusCode::OK, Some(credentials))
        .await;

    runner.cleanup().await;

    let passed = runner.results.iter().filter(|r| r.success).count();
    let summary = SmokeSummary {
        base_url: runner.base_url.clone(),
        total: runner.results.len(),
        passed,
        failed: runner.results.len() - passed,
        results: runner.results,
    };

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => {
            eprintln!(
                "\n{} {}/{} checks passed",
                if summary.failed == 0 { "✅" } else { "⚠️" },
                summary.passed,
                summary.total
            );
        }
    }

    if summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
