use bootcamp_core::config::{AppConfig, LoadOptions};
use bootcamp_slack::api::WebApiClient;
use serde::Serialize;

use crate::commands::check_listener;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_auth(&config));
            checks.push(check_listener_available(&config));
            checks.push(check_github_webhook_signing(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["slack_auth", "listener_available", "github_webhook_signing"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    // Skipped checks are advisory; only failures fail the report.
    let any_fail = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_fail { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_fail {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_auth(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "slack_auth",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let client =
            WebApiClient::new(config.slack.api_base_url.clone(), config.slack.bot_token.clone())?;
        client.auth_test().await
    });

    match result {
        Ok(identity) => DoctorCheck {
            name: "slack_auth",
            status: CheckStatus::Pass,
            details: format!(
                "bot token accepted for `{}` in team `{}`",
                identity.user, identity.team
            ),
        },
        Err(error) => DoctorCheck {
            name: "slack_auth",
            status: CheckStatus::Fail,
            details: format!("auth.test failed: {error}"),
        },
    }
}

fn check_listener_available(config: &AppConfig) -> DoctorCheck {
    match check_listener(&config.server) {
        Ok(address) => DoctorCheck {
            name: "listener_available",
            status: CheckStatus::Pass,
            details: format!("`{address}` is free for the server to bind"),
        },
        Err(details) => {
            DoctorCheck { name: "listener_available", status: CheckStatus::Fail, details }
        }
    }
}

fn check_github_webhook_signing(config: &AppConfig) -> DoctorCheck {
    if config.github.webhook_secret.is_some() {
        DoctorCheck {
            name: "github_webhook_signing",
            status: CheckStatus::Pass,
            details: "x-hub-signature-256 is verified on /github-starring".to_string(),
        }
    } else {
        DoctorCheck {
            name: "github_webhook_signing",
            status: CheckStatus::Skipped,
            details: "github.webhook_secret is unset; /github-starring accepts unsigned requests"
                .to_string(),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{render_human, CheckStatus, DoctorCheck, DoctorReport};

    #[test]
    fn human_output_marks_each_check() {
        let report = DoctorReport {
            overall_status: CheckStatus::Fail,
            summary: "doctor: one or more readiness checks failed".to_string(),
            checks: vec![
                DoctorCheck {
                    name: "config_validation",
                    status: CheckStatus::Pass,
                    details: "ok".to_string(),
                },
                DoctorCheck {
                    name: "slack_auth",
                    status: CheckStatus::Fail,
                    details: "invalid_auth".to_string(),
                },
                DoctorCheck {
                    name: "github_webhook_signing",
                    status: CheckStatus::Skipped,
                    details: "unset".to_string(),
                },
            ],
        };

        assert_eq!(
            render_human(&report),
            "doctor: one or more readiness checks failed\n\
             - [ok] config_validation: ok\n\
             - [fail] slack_auth: invalid_auth\n\
             - [skip] github_webhook_signing: unset"
        );
    }
}
