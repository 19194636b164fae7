use super::parsing::{
    env_optional, env_or_default, is_supported_upload_extension, parse_bool, parse_cors_origins,
    parse_environment, parse_f64, parse_f64_list, parse_number, parse_string_list,
};
use super::scoring::{ScoringPolicy, DEFAULT_BUCKET_BOUNDS};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, AiSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings,
    OcrSettings, RedisSettings, RuntimeSettings, S3Settings, ScoringSettings, SecuritySettings,
    ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings, UploadSettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("AEMS_HOST", "0.0.0.0");
        let port = env_or_default("AEMS_PORT", "8000");

        let environment =
            parse_environment(env_optional("AEMS_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("AEMS_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "AEMS API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_prefix = env_or_default("API_PREFIX", "/api");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_number::<u64>(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "1440"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");
        let cookie_name = env_or_default("AUTH_COOKIE_NAME", "auth-token");
        let cookie_secure = env_optional("AUTH_COOKIE_SECURE")
            .map(|value| parse_bool(&value))
            .unwrap_or(environment.is_production());

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_number::<u16>(
            "POSTGRES_PORT",
            env_or_default("POSTGRES_PORT", "5432"),
        )?;
        let postgres_user = env_or_default("POSTGRES_USER", "aems");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "aems_db");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_number::<u16>("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_number::<u16>("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let ai_api_key = env_or_default("AI_API_KEY", "");
        let ai_base_url = env_or_default("AI_BASE_URL", "https://api.mistral.ai/v1");
        let ai_model = env_or_default("AI_MODEL", "mistral-medium");
        let ai_max_tokens = parse_number::<u32>(
            "AI_MAX_TOKENS",
            env_or_default("AI_MAX_TOKENS", "1000"),
        )?;
        let ai_temperature =
            parse_f64("AI_TEMPERATURE", env_or_default("AI_TEMPERATURE", "0.1"))?;
        let grading_timeout_seconds = parse_number::<u64>(
            "GRADING_TIMEOUT_SECONDS",
            env_or_default("GRADING_TIMEOUT_SECONDS", "60"),
        )?;

        let ocr_api_key = env_or_default("OCR_API_KEY", "");
        let ocr_base_url = env_or_default("OCR_BASE_URL", "https://www.datalab.to/api/v1");
        let ocr_backup_base_url = env_optional("OCR_BACKUP_BASE_URL");
        let ocr_mode = env_or_default("OCR_MODE", "accurate").to_ascii_lowercase();
        let ocr_timeout_seconds =
            parse_number::<u64>("OCR_TIMEOUT_SECONDS", env_or_default("OCR_TIMEOUT_SECONDS", "120"))?;
        let ocr_poll_interval_seconds = parse_number::<u64>(
            "OCR_POLL_INTERVAL_SECONDS",
            env_or_default("OCR_POLL_INTERVAL_SECONDS", "2"),
        )?;
        let ocr_max_poll_attempts = parse_number::<u32>(
            "OCR_MAX_POLL_ATTEMPTS",
            env_or_default("OCR_MAX_POLL_ATTEMPTS", "60"),
        )?;
        let ocr_max_submit_retries = parse_number::<u32>(
            "OCR_MAX_SUBMIT_RETRIES",
            env_or_default("OCR_MAX_SUBMIT_RETRIES", "2"),
        )?;

        let max_upload_size_mb =
            parse_number::<u64>("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "16"))?;
        let allowed_extensions = parse_string_list(
            env_optional("ALLOWED_UPLOAD_EXTENSIONS"),
            &["png", "jpg", "jpeg", "pdf"],
        );
        let max_scripts_per_batch = parse_number::<u64>(
            "MAX_SCRIPTS_PER_BATCH",
            env_or_default("MAX_SCRIPTS_PER_BATCH", "20"),
        )? as usize;

        let s3_endpoint = env_or_default("S3_ENDPOINT", "http://localhost:9000");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "aems-scripts");
        let s3_region = env_or_default("S3_REGION", "us-east-1");

        let passing_percentage =
            parse_f64("PASSING_PERCENTAGE", env_or_default("PASSING_PERCENTAGE", "60"))?;
        let bucket_bounds = parse_f64_list(
            "SCORE_BUCKET_BOUNDS",
            env_optional("SCORE_BUCKET_BOUNDS"),
            &DEFAULT_BUCKET_BOUNDS,
        )?;
        let policy = ScoringPolicy::new(passing_percentage, bucket_bounds)?;
        let default_strictness = parse_number::<u16>(
            "DEFAULT_STRICTNESS_LEVEL",
            env_or_default("DEFAULT_STRICTNESS_LEVEL", "2"),
        )? as i16;
        let default_total_points =
            parse_f64("DEFAULT_TOTAL_POINTS", env_or_default("DEFAULT_TOTAL_POINTS", "10"))?;
        let analytics_cache_ttl_seconds = parse_number::<u64>(
            "ANALYTICS_CACHE_TTL_SECONDS",
            env_or_default("ANALYTICS_CACHE_TTL_SECONDS", "300"),
        )?;
        let grading_lock_seconds = parse_number::<u64>(
            "GRADING_LOCK_SECONDS",
            env_or_default("GRADING_LOCK_SECONDS", "90"),
        )?;

        let first_teacher_username = env_or_default("FIRST_TEACHER_USERNAME", "admin");
        let first_teacher_password = env_or_default("FIRST_TEACHER_PASSWORD", "");
        let first_teacher_name = env_or_default("FIRST_TEACHER_NAME", "Administrator");

        let log_level = env_or_default("AEMS_LOG_LEVEL", "info");
        let json = env_optional("AEMS_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_prefix },
            security: SecuritySettings {
                secret_key,
                access_token_expire_minutes,
                algorithm,
                cookie_name,
                cookie_secure,
            },
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
            ai: AiSettings {
                api_key: ai_api_key,
                base_url: ai_base_url,
                model: ai_model,
                max_tokens: ai_max_tokens,
                temperature: ai_temperature,
                request_timeout_seconds: grading_timeout_seconds,
            },
            ocr: OcrSettings {
                api_key: ocr_api_key,
                base_url: ocr_base_url,
                backup_base_url: ocr_backup_base_url,
                mode: ocr_mode,
                timeout_seconds: ocr_timeout_seconds,
                poll_interval_seconds: ocr_poll_interval_seconds,
                max_poll_attempts: ocr_max_poll_attempts,
                max_submit_retries: ocr_max_submit_retries,
            },
            uploads: UploadSettings { max_upload_size_mb, allowed_extensions, max_scripts_per_batch },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
            },
            scoring: ScoringSettings {
                policy,
                default_strictness,
                default_total_points,
                analytics_cache_ttl_seconds,
                grading_lock_seconds,
            },
            admin: AdminSettings {
                first_teacher_username,
                first_teacher_password,
                first_teacher_name,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
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

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn ocr(&self) -> &OcrSettings {
        &self.ocr
    }

    pub(crate) fn uploads(&self) -> &UploadSettings {
        &self.uploads
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn scoring(&self) -> &ScoringSettings {
        &self.scoring
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.uploads.allowed_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_UPLOAD_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.uploads.allowed_extensions {
            if !is_supported_upload_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_UPLOAD_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.uploads.max_upload_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_UPLOAD_SIZE_MB",
                value: "0".to_string(),
            });
        }

        if !(1..=4).contains(&self.scoring.default_strictness) {
            return Err(ConfigError::InvalidValue {
                field: "DEFAULT_STRICTNESS_LEVEL",
                value: self.scoring.default_strictness.to_string(),
            });
        }

        if self.scoring.default_total_points <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "DEFAULT_TOTAL_POINTS",
                value: self.scoring.default_total_points.to_string(),
            });
        }

        if self.ocr.poll_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "OCR_POLL_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.ocr.max_poll_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "OCR_MAX_POLL_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.ai.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("AI_API_KEY"));
        }
        if self.ocr.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OCR_API_KEY"));
        }
        if self.admin.first_teacher_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_TEACHER_PASSWORD"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::{ConfigError, Settings};
    use crate::test_support;

    #[tokio::test]
    async fn load_uses_scoring_defaults() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("PASSING_PERCENTAGE");
        std::env::remove_var("SCORE_BUCKET_BOUNDS");

        let settings = Settings::load().expect("settings");
        let scoring = settings.scoring();

        assert_eq!(scoring.policy.passing_percentage(), 60.0);
        assert_eq!(scoring.policy.bucket_count(), 4);
        assert_eq!(scoring.default_strictness, 2);
        assert_eq!(settings.uploads().max_upload_size_mb, 16);
        assert_eq!(settings.security().cookie_name, "auth-token");
    }

    #[tokio::test]
    async fn load_rejects_open_ended_buckets() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("SCORE_BUCKET_BOUNDS", "20,50,80");

        let result = Settings::load();
        std::env::remove_var("SCORE_BUCKET_BOUNDS");

        assert!(matches!(result, Err(ConfigError::InvalidPolicy(_))));
    }

    #[tokio::test]
    async fn strict_config_requires_secrets() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("AEMS_STRICT_CONFIG", "1");
        std::env::remove_var("AI_API_KEY");

        let result = Settings::load();
        std::env::set_var("AEMS_STRICT_CONFIG", "0");

        assert!(matches!(result, Err(ConfigError::MissingSecret("AI_API_KEY"))));
    }

    #[tokio::test]
    async fn load_rejects_unsupported_extension() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("ALLOWED_UPLOAD_EXTENSIONS", "png,txt");

        let result = Settings::load();
        std::env::remove_var("ALLOWED_UPLOAD_EXTENSIONS");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "ALLOWED_UPLOAD_EXTENSIONS", .. })
        ));
    }
}
