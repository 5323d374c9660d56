use std::time::Duration;

use crate::error::CamposantoError;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Tunables of the search pipeline and its coordinator.
///
/// Use [`PipelineConfigBuilder`] to create one; the defaults match an
/// interactive search screen.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Quiet period before a changed search term is executed
    pub debounce: Duration,
    /// Page size used when a caller asks for a page of size zero
    pub default_page_size: usize,
    /// Upper bound on the page size a caller may request
    pub max_page_size: usize,
    /// Width of the "recent" death-date window, in days, ending today
    pub recent_window_days: u64,
    /// Rows fetched per request while scanning for fuzzy cemetery matches
    pub scan_batch_size: usize,
    /// Stop scanning after this many rows
    pub max_scan_rows: usize,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: 200,
            recent_window_days: 30,
            scan_batch_size: 200,
            max_scan_rows: 5_000,
        }
    }
}

/// Builder for creating pipeline configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Defaults for a search box driven by keystrokes
    pub fn interactive() -> Self {
        Self::new()
    }

    /// No debounce; every run executes right away (batch jobs, scripts)
    pub fn immediate() -> Self {
        let mut builder = Self::new();
        builder.config.debounce = Duration::ZERO;
        builder
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.config.debounce = debounce;
        self
    }

    /// Set the default page size (at least 1, raising the maximum if needed)
    pub fn page_size(mut self, size: usize) -> Self {
        let size = size.max(1);
        self.config.default_page_size = size;
        self.config.max_page_size = self.config.max_page_size.max(size);
        self
    }

    /// Set the largest page size a caller may request (at least the default)
    pub fn max_page_size(mut self, size: usize) -> Self {
        self.config.max_page_size = size.max(self.config.default_page_size);
        self
    }

    pub fn recent_window_days(mut self, days: u64) -> Self {
        self.config.recent_window_days = days;
        self
    }

    /// Configure how the fuzzy cemetery-name filter scans the records table
    pub fn scan_limits(
        mut self,
        batch_size: usize,
        max_rows: usize,
    ) -> Result<Self, CamposantoError> {
        if batch_size == 0 {
            return Err(CamposantoError::ConfigError(
                "Scan batch size must be positive".to_string(),
            ));
        }
        if max_rows < batch_size {
            return Err(CamposantoError::ConfigError(format!(
                "Scan limit ({max_rows}) must be at least one batch ({batch_size})"
            )));
        }
        self.config.scan_batch_size = batch_size;
        self.config.max_scan_rows = max_rows;
        Ok(self)
    }

    /// Build the final configuration
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_builder() {
        let config = PipelineConfigBuilder::new().build();
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.recent_window_days, 30);
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_presets() {
        assert_eq!(PipelineConfigBuilder::interactive().build().debounce, DEFAULT_DEBOUNCE);
        assert_eq!(PipelineConfigBuilder::immediate().build().debounce, Duration::ZERO);
    }

    #[test]
    fn test_page_size_bounds() {
        let config = PipelineConfigBuilder::new().page_size(0).build();
        assert_eq!(config.default_page_size, 1);

        let config = PipelineConfigBuilder::new().page_size(500).build();
        assert_eq!(config.default_page_size, 500);
        assert_eq!(config.max_page_size, 500);

        let config = PipelineConfigBuilder::new()
            .page_size(50)
            .max_page_size(10)
            .build();
        assert_eq!(config.max_page_size, 50);
    }

    #[test]
    fn test_method_chaining() {
        let config = PipelineConfig::builder()
            .debounce(Duration::from_millis(250))
            .recent_window_days(7)
            .scan_limits(100, 1_000)
            .unwrap()
            .build();

        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.recent_window_days, 7);
        assert_eq!((config.scan_batch_size, config.max_scan_rows), (100, 1_000));
    }

    #[test]
    fn test_scan_limits_validation() {
        assert!(PipelineConfigBuilder::new().scan_limits(0, 10).is_err());
        assert!(PipelineConfigBuilder::new().scan_limits(100, 50).is_err());
        assert!(PipelineConfigBuilder::new().scan_limits(50, 50).is_ok());
    }
}
