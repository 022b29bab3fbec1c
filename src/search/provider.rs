use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

/// Nutrient block as delivered by the provider, per 100 g. Field names vary
/// between payload versions; aliases fold them into one shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNutrients {
    #[serde(rename = "energy-kcal_100g", alias = "energy_kcal_100g", alias = "energy-kcal")]
    pub energy_kcal_100g: Option<f64>,
    #[serde(rename = "proteins_100g", alias = "proteins")]
    pub proteins_100g: Option<f64>,
    #[serde(rename = "fat_100g", alias = "fat")]
    pub fat_100g: Option<f64>,
    #[serde(rename = "carbohydrates_100g", alias = "carbohydrates")]
    pub carbohydrates_100g: Option<f64>,
}

/// Provider-shaped search hit. Everything is optional; the coordinator
/// normalizes and discards unusable candidates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProduct {
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub code: Option<String>,
    pub nutriments: Option<RawNutrients>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    products: Vec<RawProduct>,
}

/// Remote free-text product search. Implementations report every failure mode
/// (transport, HTTP status, payload shape) as an error; the caller decides
/// how to degrade. Timeouts are imposed by the caller.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<RawProduct>>;
}

/// Open Food Facts `cgi/search.pl` client.
pub struct OpenFoodFacts {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
}

impl OpenFoodFacts {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fitplan/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: 15,
        })
    }
}

#[async_trait]
impl SearchProvider for OpenFoodFacts {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<RawProduct>> {
        let url = format!("{}/cgi/search.pl", self.base_url);
        let page = self
            .client
            .get(&url)
            .query(&[
                ("search_terms", query),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", &self.page_size.to_string()),
            ])
            .send()
            .await
            .context("food api request")?
            .error_for_status()
            .context("food api status")?
            .json::<SearchPage>()
            .await
            .context("food api payload")?;
        Ok(page.products)
    }
}
