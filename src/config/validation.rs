use crate::config::types::{
    Config, GatewayConfig, OutputConfig, PipelineConfig, SearchEntry, StagingConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_gateway_config(&config.gateway)?;
    validate_pipeline_config(&config.pipeline)?;
    validate_staging_config(&config.staging)?;
    validate_output_config(&config.output)?;
    validate_search_entries(&config.search)?;
    Ok(())
}

/// Validates gateway provider configuration
fn validate_gateway_config(config: &GatewayConfig) -> Result<(), ConfigError> {
    if config.api_key.is_empty() {
        return Err(ConfigError::Validation(
            "api-key cannot be empty".to_string(),
        ));
    }

    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;
    if base.scheme() != "https" && base.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "base-url must be an http(s) URL, got '{}'",
            config.base_url
        )));
    }

    let catalog = Url::parse(&config.catalog_base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid catalog-base-url: {}", e)))?;
    if catalog.scheme() != "https" && catalog.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "catalog-base-url must be an http(s) URL, got '{}'",
            config.catalog_base_url
        )));
    }
    if config.catalog_base_url.ends_with('/') {
        return Err(ConfigError::Validation(
            "catalog-base-url must not end with '/' (paths are appended)".to_string(),
        ));
    }

    if config.country_code.len() != 2 || !config.country_code.chars().all(|c| c.is_ascii_lowercase())
    {
        return Err(ConfigError::Validation(format!(
            "country-code must be a two-letter lowercase code, got '{}'",
            config.country_code
        )));
    }

    Ok(())
}

/// Validates pipeline pacing configuration
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.base_backoff_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "base-backoff-ms must be >= 1, got {}",
            config.base_backoff_ms
        )));
    }

    if config.max_backoff_ms < config.base_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms must be >= base-backoff-ms, got {} < {}",
            config.max_backoff_ms, config.base_backoff_ms
        )));
    }

    Ok(())
}

/// Validates staging queue configuration
fn validate_staging_config(config: &StagingConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates configured discovery searches
fn validate_search_entries(entries: &[SearchEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        if entry.keyword.trim().is_empty() {
            return Err(ConfigError::Validation(
                "search keyword cannot be empty".to_string(),
            ));
        }

        if entry.pages < 1 || entry.pages > 20 {
            return Err(ConfigError::Validation(format!(
                "search '{}' pages must be between 1 and 20, got {}",
                entry.keyword, entry.pages
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PriceTieBreak;

    fn valid_gateway() -> GatewayConfig {
        GatewayConfig {
            api_key: "test-key".to_string(),
            base_url: "https://gateway.example.com/api".to_string(),
            catalog_base_url: "https://catalog.example.com".to_string(),
            country_code: "us".to_string(),
        }
    }

    #[test]
    fn test_valid_gateway_config() {
        assert!(validate_gateway_config(&valid_gateway()).is_ok());
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let mut config = valid_gateway();
        config.api_key = String::new();
        assert!(matches!(
            validate_gateway_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_malformed_base_url_rejected() {
        let mut config = valid_gateway();
        config.base_url = "not a url".to_string();
        assert!(matches!(
            validate_gateway_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_trailing_slash_on_catalog_base_rejected() {
        let mut config = valid_gateway();
        config.catalog_base_url = "https://catalog.example.com/".to_string();
        assert!(matches!(
            validate_gateway_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_country_code_must_be_two_lowercase_letters() {
        let mut config = valid_gateway();
        config.country_code = "USA".to_string();
        assert!(validate_gateway_config(&config).is_err());

        config.country_code = "US".to_string();
        assert!(validate_gateway_config(&config).is_err());

        config.country_code = "de".to_string();
        assert!(validate_gateway_config(&config).is_ok());
    }

    #[test]
    fn test_pipeline_batch_size_bounds() {
        let mut config = PipelineConfig::default();
        assert!(validate_pipeline_config(&config).is_ok());

        config.batch_size = 0;
        assert!(validate_pipeline_config(&config).is_err());

        config.batch_size = 101;
        assert!(validate_pipeline_config(&config).is_err());
    }

    #[test]
    fn test_backoff_ceiling_must_cover_base() {
        let config = PipelineConfig {
            base_backoff_ms: 5000,
            max_backoff_ms: 1000,
            ..Default::default()
        };
        assert!(matches!(
            validate_pipeline_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_search_entry_validation() {
        let entries = vec![SearchEntry {
            keyword: "solar panel".to_string(),
            pages: 3,
            priority: 0,
        }];
        assert!(validate_search_entries(&entries).is_ok());

        let empty_keyword = vec![SearchEntry {
            keyword: "  ".to_string(),
            pages: 1,
            priority: 0,
        }];
        assert!(validate_search_entries(&empty_keyword).is_err());

        let too_many_pages = vec![SearchEntry {
            keyword: "solar panel".to_string(),
            pages: 50,
            priority: 0,
        }];
        assert!(validate_search_entries(&too_many_pages).is_err());
    }

    #[test]
    fn test_full_config_validates() {
        let config = Config {
            gateway: valid_gateway(),
            pipeline: PipelineConfig {
                price_tie_break: PriceTieBreak::FirstWins,
                ..Default::default()
            },
            staging: StagingConfig::default(),
            output: OutputConfig {
                database_path: "./catalog.db".to_string(),
            },
            search: vec![],
        };
        assert!(validate(&config).is_ok());
    }
}
