pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# RESTART-WORKFLOW CONFIGURATION
# =============================================================================
# Settings for repairing batch event logs so the pipeline scheduler picks a
# batch up again.
#
# Every command takes the path of this file as its first argument, e.g.
#   restart-workflow restart ~/.config/restart-workflow/config.yml 400022028241 1
# `restart-workflow config init` writes this template to that location.
#
# Values of the form $env{NAME} are replaced with the environment variable
# NAME before the file is parsed.

# Identity recorded as the author of events written by this tool.
# Defaults to restart-workflow@<hostname>.
# agent: restart-workflow@ops

# =============================================================================
# STORE
# =============================================================================
# Where batch event logs live.
#
#   kind: http     the repository's JSON API (production)
#   kind: duckdb   a local DuckDB file (staging and experiments)

store:
  kind: http
  url: http://localhost:7880/repository/api
  username: fedoraAdmin
  password: $env{REPOSITORY_PASSWORD}
  # Service handing out identifiers for newly created batches (optional)
  pid_generator_url: http://localhost:7880/pidgenerator-service
  # Per-request timeout
  timeout: 30s

# store:
#   kind: duckdb
#   path: ~/.local/share/restart-workflow/events.duckdb

# =============================================================================
# RETRY
# =============================================================================
# Transient store failures (timeouts, refused connections, 5xx responses) are
# retried. Missing batches and rejected requests are never retried.

retry:
  # Total attempts per store call, including the first
  max_attempts: 10
  # Fixed pause between attempts
  delay: 100ms
"#
    .to_string()
}
