use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

/// Prometheus metrics for the foodgram service
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // HTTP metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_flight: GaugeVec,

    // Database metrics
    pub database_operations_total: CounterVec,
    pub database_operation_duration_seconds: HistogramVec,

    // Business metrics
    pub recipe_operations_total: CounterVec,
    pub recipe_list_operations_total: CounterVec,
    pub subscription_operations_total: CounterVec,
    pub shopping_list_downloads_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        info!("Initializing Prometheus metrics");

        let http_requests_total = CounterVec::new(
            Opts::new(
                "http_requests_total",
                "Total number of HTTP requests processed",
            ),
            &["method", "endpoint", "status_code"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "endpoint"],
        )?;

        let http_requests_in_flight = GaugeVec::new(
            Opts::new(
                "http_requests_in_flight",
                "Number of HTTP requests currently being processed",
            ),
            &["method", "endpoint"],
        )?;

        let database_operations_total = CounterVec::new(
            Opts::new(
                "database_operations_total",
                "Total number of database operations",
            ),
            &["operation", "table", "status"],
        )?;

        let database_operation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "database_operation_duration_seconds",
                "Database operation duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 30.0, 300.0,
            ]),
            &["operation", "table"],
        )?;

        let recipe_operations_total = CounterVec::new(
            Opts::new(
                "recipe_operations_total",
                "Total number of recipe create/read/update/delete operations",
            ),
            &["operation", "status"],
        )?;

        let recipe_list_operations_total = CounterVec::new(
            Opts::new(
                "recipe_list_operations_total",
                "Total number of favorite and shopping cart changes",
            ),
            &["list", "operation", "status"],
        )?;

        let subscription_operations_total = CounterVec::new(
            Opts::new(
                "subscription_operations_total",
                "Total number of follow/unfollow/list operations",
            ),
            &["operation", "status"],
        )?;

        let shopping_list_downloads_total = CounterVec::new(
            Opts::new(
                "shopping_list_downloads_total",
                "Total number of shopping list downloads",
            ),
            &["format"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(database_operations_total.clone()))?;
        registry.register(Box::new(database_operation_duration_seconds.clone()))?;
        registry.register(Box::new(recipe_operations_total.clone()))?;
        registry.register(Box::new(recipe_list_operations_total.clone()))?;
        registry.register(Box::new(subscription_operations_total.clone()))?;
        registry.register(Box::new(shopping_list_downloads_total.clone()))?;

        info!("Prometheus metrics initialized successfully");

        Ok(Metrics {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            database_operations_total,
            database_operation_duration_seconds,
            recipe_operations_total,
            recipe_list_operations_total,
            subscription_operations_total,
            shopping_list_downloads_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status_str = status_code.to_string();

        self.http_requests_total
            .with_label_values(&[method, endpoint, &status_str])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_seconds);
    }

    pub fn record_database_operation(
        &self,
        operation: &str,
        table: &str,
        success: bool,
        duration_seconds: f64,
    ) {
        self.database_operations_total
            .with_label_values(&[operation, table, status_label(success)])
            .inc();

        self.database_operation_duration_seconds
            .with_label_values(&[operation, table])
            .observe(duration_seconds);
    }

    pub fn record_recipe_operation(&self, operation: &str, success: bool) {
        self.recipe_operations_total
            .with_label_values(&[operation, status_label(success)])
            .inc();
    }

    /// `list` is `favorite` or `shopping_cart`
    pub fn record_recipe_list_operation(&self, list: &str, operation: &str, success: bool) {
        self.recipe_list_operations_total
            .with_label_values(&[list, operation, status_label(success)])
            .inc();
    }

    pub fn record_subscription_operation(&self, operation: &str, success: bool) {
        self.subscription_operations_total
            .with_label_values(&[operation, status_label(success)])
            .inc();
    }

    pub fn record_shopping_list_download(&self, format: &str) {
        self.shopping_list_downloads_total
            .with_label_values(&[format])
            .inc();
    }

    pub fn increment_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .inc();
    }

    pub fn decrement_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_http_request_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_http_request("GET", "/api/recipes", 200, 0.123);
        metrics.record_http_request("POST", "/api/recipes", 201, 0.456);

        let metrics_text = metrics.encode().unwrap();
        assert!(metrics_text.contains("http_requests_total"));
        assert!(metrics_text.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_database_operation_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_database_operation("get_item", "FoodgramRecipes", true, 0.050);
        metrics.record_database_operation("put_item", "FoodgramRelations", false, 0.100);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("database_operations_total"));
        assert!(encoded.contains("database_operation_duration_seconds"));
    }

    #[test]
    fn test_business_metrics_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_recipe_operation("create", true);
        metrics.record_recipe_list_operation("favorite", "add", false);
        metrics.record_subscription_operation("follow", true);
        metrics.record_shopping_list_download("pdf");

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("recipe_operations_total"));
        assert!(encoded
            .contains(r#"recipe_list_operations_total{list="favorite",operation="add",status="error"} 1"#));
        assert!(encoded.contains("subscription_operations_total"));
        assert!(encoded.contains(r#"shopping_list_downloads_total{format="pdf"} 1"#));
    }

    #[test]
    fn test_in_flight_requests() {
        let metrics = Metrics::new().unwrap();

        metrics.increment_in_flight("GET", "/api/recipes");
        metrics.increment_in_flight("GET", "/api/recipes");
        metrics.decrement_in_flight("GET", "/api/recipes");

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("http_requests_in_flight"));
    }
}
