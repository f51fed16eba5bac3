//! Shared AWS client setup (Imperative Shell).

/// AWS client configuration.
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// Custom endpoint URL (for a local cloud emulator).
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        }
    }
}

impl AwsConfig {
    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local endpoint ({})", url),
            None => format!("AWS (region: {})", self.region),
        }
    }

    async fn load(&self) -> aws_config::SdkConfig {
        let mut sdk_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(self.region.clone()));

        if let Some(endpoint) = &self.endpoint_url {
            sdk_config_loader = sdk_config_loader.endpoint_url(endpoint);
        }

        sdk_config_loader.load().await
    }
}

/// Creates a CloudFormation client with the given configuration.
pub async fn create_cloudformation_client(config: &AwsConfig) -> aws_sdk_cloudformation::Client {
    aws_sdk_cloudformation::Client::new(&config.load().await)
}

/// Creates a DynamoDB client with the given configuration.
pub async fn create_dynamodb_client(config: &AwsConfig) -> aws_sdk_dynamodb::Client {
    aws_sdk_dynamodb::Client::new(&config.load().await)
}
