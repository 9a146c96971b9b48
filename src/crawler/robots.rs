//! robots.txt policy for a crawl
//!
//! Fetched once per job from the seed host. Anything short of a successful response
//! that parses means every URL is allowed.

use std::sync::Arc;
use std::time::Duration;

use texting_robots::{Robot, get_robots_url};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Allow/deny rules and crawl delay from one robots.txt
#[derive(Clone, Default)]
pub struct RobotsPolicy {
    robot: Option<Arc<Robot>>,
}

impl RobotsPolicy {
    /// Policy that allows every URL
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse robots.txt content for a user agent
    pub fn from_content(user_agent: &str, content: &[u8]) -> Self {
        match Robot::new(user_agent, content) {
            Ok(robot) => Self {
                robot: Some(Arc::new(robot)),
            },
            Err(e) => {
                warn!("Unparseable robots.txt, allowing all URLs: {}", e);
                Self::allow_all()
            }
        }
    }

    /// Fetch and parse robots.txt for the seed's host
    #[instrument(skip(client), fields(seed = %seed))]
    pub async fn fetch(
        client: &reqwest::Client,
        seed: &Url,
        user_agent: &str,
        timeout: Duration,
    ) -> Self {
        let robots_url = match get_robots_url(seed.as_str()) {
            Ok(robots_url) => robots_url,
            Err(e) => {
                warn!("Cannot derive robots.txt URL for {}: {}", seed, e);
                return Self::allow_all();
            }
        };

        let response = match client.get(&robots_url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("No valid robots.txt fetched from {}: {}", robots_url, e);
                return Self::allow_all();
            }
        };

        if !response.status().is_success() {
            debug!(
                "robots.txt at {} returned status {}, allowing all URLs",
                robots_url,
                response.status()
            );
            return Self::allow_all();
        }

        match response.bytes().await {
            Ok(body) => {
                info!("Loaded robots.txt from {}", robots_url);
                Self::from_content(user_agent, &body)
            }
            Err(e) => {
                warn!("Could not read robots.txt from {}: {}", robots_url, e);
                Self::allow_all()
            }
        }
    }

    /// Whether the URL may be fetched
    pub fn allowed(&self, url: &str) -> bool {
        self.robot.as_ref().is_none_or(|robot| robot.allowed(url))
    }

    /// Crawl-delay requested by the site
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.robot
            .as_ref()
            .and_then(|robot| robot.delay)
            .filter(|delay| delay.is_finite() && *delay > 0.0)
            .map(Duration::from_secs_f32)
    }
}
