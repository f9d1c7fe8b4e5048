use crate::app::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_keep_alive_secs: u64,
    pub mqtt_client_id: Option<String>,
    pub log_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        if let Err(error) = dotenvy::dotenv()
            && !error.not_found()
        {
            return Err(AppError::config(format!("failed to load .env: {error}")));
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let keep_alive = parse_or_default(&lookup, "MQTT_KEEPALIVE_SECS", 60_u64)?;
        if keep_alive == 0 {
            return Err(AppError::config("MQTT_KEEPALIVE_SECS must be greater than zero"));
        }

        Ok(Self {
            mqtt_host: non_empty(&lookup, "MQTT_HOST").unwrap_or_else(|| "localhost".to_string()),
            mqtt_port: parse_or_default(&lookup, "MQTT_PORT", 1883_u16)?,
            mqtt_keep_alive_secs: keep_alive,
            mqtt_client_id: non_empty(&lookup, "MQTT_CLIENT_ID"),
            log_dir: non_empty(&lookup, "MONITOR_LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}
