//! Weather/news fetchers.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use url::Url;

use crate::cache::{NewsDigest, RecordName, WeatherReport};
use crate::error::FetchError;

const USER_AGENT: &str = concat!("dawnlock/", env!("CARGO_PKG_VERSION"));

/// Headlines kept per digest.
const MAX_HEADLINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Weather,
    News,
}

impl FeedKind {
    pub const ALL: [FeedKind; 2] = [FeedKind::Weather, FeedKind::News];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::Weather => "weather",
            FeedKind::News => "news",
        }
    }

    pub fn record_name(self) -> RecordName {
        match self {
            FeedKind::Weather => RecordName::Weather,
            FeedKind::News => RecordName::News,
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weather" => Ok(FeedKind::Weather),
            "news" => Ok(FeedKind::News),
            other => Err(format!("unknown feed '{other}' (weather, news)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedPayload {
    Weather(WeatherReport),
    News(NewsDigest),
}

impl FeedPayload {
    pub fn kind(&self) -> FeedKind {
        match self {
            FeedPayload::Weather(_) => FeedKind::Weather,
            FeedPayload::News(_) => FeedKind::News,
        }
    }
}

/// Source of dashboard feeds. Only the updater calls it.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, kind: FeedKind) -> Result<FeedPayload, FetchError>;
}

/// weatherapi.com / newsapi.org style JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    weather_url: Option<Url>,
    news_url: Option<Url>,
}

impl HttpFetcher {
    /// Endpoints are full URLs, API keys included.
    ///
    /// # Errors
    ///
    /// [`FetchError::Url`] for a URL that does not parse.
    pub fn new(weather_url: Option<&str>, news_url: Option<&str>) -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            weather_url: weather_url.map(Url::parse).transpose()?,
            news_url: news_url.map(Url::parse).transpose()?,
        })
    }

    /// Build a weatherapi.com `current.json` URL.
    pub fn weatherapi_url(base: &str, api_key: &str, location: &str) -> Result<Url, FetchError> {
        Ok(Url::parse_with_params(base, &[("key", api_key), ("q", location)])?)
    }

    /// Build a newsapi.org `top-headlines` URL.
    pub fn newsapi_url(base: &str, api_key: &str, country: &str) -> Result<Url, FetchError> {
        Ok(Url::parse_with_params(base, &[("country", country), ("apiKey", api_key)])?)
    }

    fn url_for(&self, kind: FeedKind) -> Result<&Url, FetchError> {
        let url = match kind {
            FeedKind::Weather => self.weather_url.as_ref(),
            FeedKind::News => self.news_url.as_ref(),
        };
        url.ok_or_else(|| FetchError::NotConfigured(kind.to_string()))
    }

    async fn get_json(&self, url: &Url) -> Result<Value, FetchError> {
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, kind: FeedKind) -> Result<FeedPayload, FetchError> {
        let url = self.url_for(kind)?;
        debug!(%kind, host = url.host_str().unwrap_or(""), "fetching feed");
        let body = self.get_json(url).await?;
        match kind {
            FeedKind::Weather => parse_weather(&body).map(FeedPayload::Weather),
            FeedKind::News => parse_news(&body).map(FeedPayload::News),
        }
    }
}

/// Accepts weatherapi.com `current.json` or the flat `{temp, conditions}`
/// shape.
pub fn parse_weather(body: &Value) -> Result<WeatherReport, FetchError> {
    if let Some(current) = body.get("current") {
        let temperature_c = current["temp_c"]
            .as_f64()
            .ok_or_else(|| FetchError::Decode("current.temp_c missing".into()))?;
        let conditions = current["condition"]["text"]
            .as_str()
            .unwrap_or("Unknown")
            .to_string();
        return Ok(WeatherReport {
            temperature_c,
            conditions,
        });
    }

    let temperature_c = body["temp"]
        .as_f64()
        .ok_or_else(|| FetchError::Decode("no temperature in weather response".into()))?;
    Ok(WeatherReport {
        temperature_c,
        conditions: body["conditions"].as_str().unwrap_or("Unknown").to_string(),
    })
}

/// Accepts newsapi.org `articles[].title` or a plain `headlines` list.
pub fn parse_news(body: &Value) -> Result<NewsDigest, FetchError> {
    let headlines: Vec<String> = if let Some(articles) = body["articles"].as_array() {
        articles
            .iter()
            .filter_map(|a| a["title"].as_str())
            .map(str::to_string)
            .collect()
    } else if let Some(headlines) = body["headlines"].as_array() {
        headlines
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    } else {
        return Err(FetchError::Decode("no articles in news response".into()));
    };

    Ok(NewsDigest {
        headlines: headlines.into_iter().take(MAX_HEADLINES).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_weatherapi_response() {
        let body = json!({
            "location": {"name": "Oslo"},
            "current": {"temp_c": -3.5, "condition": {"text": "Light snow"}}
        });
        let report = parse_weather(&body).unwrap();
        assert_eq!(report.temperature_c, -3.5);
        assert_eq!(report.conditions, "Light snow");
    }

    #[test]
    fn parses_flat_weather_shape() {
        let report = parse_weather(&json!({"temp": 21, "conditions": "Sunny"})).unwrap();
        assert_eq!(report.temperature_c, 21.0);
    }

    #[test]
    fn weather_without_temperature_is_a_decode_error() {
        assert!(matches!(
            parse_weather(&json!({"current": {}})),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn parses_newsapi_response_and_caps_headlines() {
        let articles: Vec<Value> = (0..15).map(|i| json!({"title": format!("Story {i}")})).collect();
        let digest = parse_news(&json!({"status": "ok", "articles": articles})).unwrap();
        assert_eq!(digest.headlines.len(), MAX_HEADLINES);
        assert_eq!(digest.headlines[0], "Story 0");
    }

    #[test]
    fn news_without_articles_is_a_decode_error() {
        assert!(parse_news(&json!({"status": "error"})).is_err());
    }

    #[test]
    fn url_builders_encode_parameters() {
        let url = HttpFetcher::weatherapi_url("https://api.weatherapi.com/v1/current.json", "k3y", "New York")
            .unwrap();
        assert_eq!(url.query(), Some("key=k3y&q=New+York"));
        let url = HttpFetcher::newsapi_url("https://newsapi.org/v2/top-headlines", "abc", "no").unwrap();
        assert_eq!(url.query(), Some("country=no&apiKey=abc"));
    }

    #[tokio::test]
    async fn unconfigured_feed_is_reported() {
        let fetcher = HttpFetcher::new(None, None).unwrap();
        assert!(matches!(
            fetcher.fetch(FeedKind::News).await,
            Err(FetchError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn fetches_weather_over_http() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/current.json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"current": {"temp_c": 8.0, "condition": {"text": "Overcast"}}}"#)
            .create_async()
            .await;

        let url = format!("{}/v1/current.json?key=x&q=Bergen", server.url());
        let fetcher = HttpFetcher::new(Some(&url), None).unwrap();
        let payload = fetcher.fetch(FeedKind::Weather).await.unwrap();
        assert_eq!(
            payload,
            FeedPayload::Weather(WeatherReport {
                temperature_c: 8.0,
                conditions: "Overcast".into()
            })
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_status_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/top-headlines")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let url = format!("{}/v2/top-headlines?country=us", server.url());
        let fetcher = HttpFetcher::new(None, Some(&url)).unwrap();
        assert!(matches!(
            fetcher.fetch(FeedKind::News).await,
            Err(FetchError::Status { status: 401 })
        ));
    }
}
