use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, EssaySettings, GradingSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings, MAX_ESSAY_RETRIES,
};

const DEVELOPMENT_JWT_SECRET: &str = "development-secret";

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("CLASSGRADE_HOST", "0.0.0.0");
        let port = env_or_default("CLASSGRADE_PORT", "8080");

        let environment = parse_environment(
            env_optional("CLASSGRADE_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("CLASSGRADE_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Classgrade API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let jwt_secret = env_optional("JWT_SECRET");
        if jwt_secret.is_none() && !strict_config {
            tracing::warn!("JWT_SECRET is not set; falling back to the development secret");
        }
        let jwt_secret = jwt_secret.unwrap_or_default();
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "classgrade");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "classgrade_db");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let essay_api_url = env_or_default("GEMINI_API_URL", "");
        let essay_api_key = env_or_default("GEMINI_API_KEY", "");
        let essay_request_timeout_seconds = parse_u64(
            "ESSAY_REQUEST_TIMEOUT_SECONDS",
            env_or_default("ESSAY_REQUEST_TIMEOUT_SECONDS", "30"),
        )?;
        let essay_max_retries =
            parse_u32("ESSAY_MAX_RETRIES", env_or_default("ESSAY_MAX_RETRIES", "1"))?;

        let lease_seconds =
            parse_u64("GRADING_LEASE_SECONDS", env_or_default("GRADING_LEASE_SECONDS", "120"))?;
        let status_sweep_interval_seconds = parse_u64(
            "STATUS_SWEEP_INTERVAL_SECONDS",
            env_or_default("STATUS_SWEEP_INTERVAL_SECONDS", "60"),
        )?;

        let log_level = env_or_default("CLASSGRADE_LOG_LEVEL", "info");
        let json =
            env_optional("CLASSGRADE_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { jwt_secret, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            essay: EssaySettings {
                api_url: essay_api_url,
                api_key: essay_api_key,
                request_timeout_seconds: essay_request_timeout_seconds,
                max_retries: essay_max_retries,
            },
            grading: GradingSettings { lease_seconds, status_sweep_interval_seconds },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn essay(&self) -> &EssaySettings {
        &self.essay
    }

    pub(crate) fn grading(&self) -> &GradingSettings {
        &self.grading
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        if self.essay.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ESSAY_REQUEST_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.essay.max_retries > MAX_ESSAY_RETRIES {
            return Err(ConfigError::InvalidValue {
                field: "ESSAY_MAX_RETRIES",
                value: self.essay.max_retries.to_string(),
            });
        }

        // The lease is renewed between essays, so it must outlive one essay call.
        if self.grading.lease_seconds <= self.essay.worst_case_call_seconds() {
            return Err(ConfigError::InvalidValue {
                field: "GRADING_LEASE_SECONDS",
                value: self.grading.lease_seconds.to_string(),
            });
        }

        if self.grading.status_sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "STATUS_SWEEP_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            if self.security.jwt_secret.is_empty() {
                self.security.jwt_secret = DEVELOPMENT_JWT_SECRET.to_string();
            }
            return Ok(self);
        }

        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret("JWT_SECRET"));
        }
        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.essay.api_url.is_empty() {
            return Err(ConfigError::MissingSecret("GEMINI_API_URL"));
        }
        if self.essay.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("GEMINI_API_KEY"));
        }

        Ok(self)
    }
}
