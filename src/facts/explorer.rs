use crate::core::{LowLevelClient, QueryResolver};
use crate::error::ResolutionError;
use crate::quiz::catalog::Catalog;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Country profile returned by the model. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[schemars(title = "Country Data", description = "Flag symbolism, key facts and neighbors of one country")]
pub struct CountryData {
    /// What the colors and symbols of the national flag stand for.
    pub flag_color_meaning: String,
    pub country_info: CountryInfo,
    /// Names of the countries sharing a land border.
    pub neighboring_countries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[schemars(description = "Reference facts, each as a short human-readable string")]
pub struct CountryInfo {
    pub sovereign_state: String,
    /// ISO 3166 codes, e.g. "JP, JPN, 392".
    pub country_codes: String,
    pub official_name: String,
    pub capital_city: String,
    pub continent: String,
    /// International organizations the country belongs to.
    pub member_of: String,
    pub population: String,
    pub total_area: String,
    pub highest_point: String,
    pub lowest_point: String,
    pub gdp_per_capita: String,
    pub currency: String,
    pub calling_code: String,
    #[serde(rename = "internetTLD")]
    pub internet_tld: String,
}

impl CountryInfo {
    /// Labelled rows in display order.
    pub fn rows(&self) -> [(&'static str, &str); 14] {
        [
            ("Sovereign state", self.sovereign_state.as_str()),
            ("Country codes", self.country_codes.as_str()),
            ("Official name", self.official_name.as_str()),
            ("Capital city", self.capital_city.as_str()),
            ("Continent", self.continent.as_str()),
            ("Member of", self.member_of.as_str()),
            ("Population", self.population.as_str()),
            ("Total area", self.total_area.as_str()),
            ("Highest point", self.highest_point.as_str()),
            ("Lowest point", self.lowest_point.as_str()),
            ("GDP per capita", self.gdp_per_capita.as_str()),
            ("Currency", self.currency.as_str()),
            ("Calling code", self.calling_code.as_str()),
            ("Internet TLD", self.internet_tld.as_str()),
        ]
    }
}

pub fn explorer_prompt(country: &str) -> String {
    format!("Provide detailed information for the country: {}.", country)
}

/// Looks up full country profiles for catalog countries. Profiles are cached
/// for the life of the explorer and never written to durable storage.
#[derive(Debug)]
pub struct CountryExplorer<C: LowLevelClient> {
    query: QueryResolver<C>,
    catalog: Catalog,
    cache: HashMap<String, CountryData>,
}

impl<C: LowLevelClient> CountryExplorer<C> {
    pub fn new(query: QueryResolver<C>, catalog: Catalog) -> Self {
        Self { query, catalog, cache: HashMap::new() }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[instrument(target = "flag_quiz::explorer", skip(self))]
    pub async fn explore(&mut self, country: &str) -> Result<CountryData, ResolutionError> {
        if !self.catalog.contains(country) {
            return Err(ResolutionError::UnknownSubject(country.to_string()));
        }
        if let Some(data) = self.cache.get(country) {
            debug!("explorer cache hit");
            return Ok(data.clone());
        }

        let data: CountryData = self
            .query
            .query(explorer_prompt(country))
            .await
            .map_err(|source| ResolutionError::Generation { subject: country.to_string(), source })?;

        info!(neighbors = data.neighboring_countries.len(), "country profile generated");
        self.cache.insert(country.to_string(), data.clone());
        Ok(data)
    }

    pub fn cached(&self, country: &str) -> Option<&CountryData> {
        self.cache.get(country)
    }

    pub fn search(&self, query: &str) -> Vec<&str> {
        self.catalog.search(query)
    }

    /// Neighbors with a known flag, paired with the flag URL.
    pub fn neighbors_with_flags(&self, data: &CountryData) -> Vec<(String, String)> {
        data.neighboring_countries
            .iter()
            .filter_map(|name| {
                self.catalog
                    .flag_url(name)
                    .map(|url| (name.clone(), url.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::{MockClient, MockResponse};
    use crate::core::QueryConfig;
    use crate::error::QueryResolverError;
    use serde_json::json;

    fn sample(neighbors: &[&str]) -> serde_json::Value {
        json!({
            "flagColorMeaning": "Green for forests, yellow for gold, blue for the sky.",
            "countryInfo": {
                "sovereignState": "Brazil",
                "countryCodes": "BR, BRA, 076",
                "officialName": "Federative Republic of Brazil",
                "capitalCity": "Brasília",
                "continent": "South America",
                "memberOf": "UN, Mercosur, BRICS",
                "population": "216 million",
                "totalArea": "8,515,767 km²",
                "highestPoint": "Pico da Neblina",
                "lowestPoint": "Atlantic Ocean",
                "gdpPerCapita": "$10,000",
                "currency": "Brazilian real",
                "callingCode": "+55",
                "internetTLD": ".br"
            },
            "neighboringCountries": neighbors
        })
    }

    fn explorer(responses: Vec<MockResponse>) -> (CountryExplorer<MockClient>, std::sync::Arc<crate::clients::MockHandle>) {
        let (client, handle) = MockClient::with_responses(responses);
        (CountryExplorer::new(QueryResolver::new(client, QueryConfig::default()), Catalog::builtin()), handle)
    }

    #[tokio::test]
    async fn valid_profile_is_cached() {
        let (mut explorer, handle) = explorer(vec![MockResponse::Success(sample(&["Argentina"]).to_string())]);

        let data = explorer.explore("Brazil").await.unwrap();
        assert_eq!(data.country_info.internet_tld, ".br");
        assert_eq!(explorer.explore("Brazil").await.unwrap(), data);
        assert_eq!(handle.call_count(), 1);
        assert!(handle.prompts()[0].starts_with("Provide detailed information for the country: Brazil."));
    }

    #[tokio::test]
    async fn missing_field_is_rejected_and_not_cached() {
        let mut payload = sample(&[]);
        payload["countryInfo"].as_object_mut().unwrap().remove("currency");
        let (mut explorer, _handle) = explorer(vec![MockResponse::Success(payload.to_string())]);

        let err = explorer.explore("Brazil").await.unwrap_err();
        match err {
            ResolutionError::Generation { source: QueryResolverError::JsonDeserialization(e, _), .. } => {
                assert!(e.to_string().contains("currency"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(explorer.cached("Brazil").is_none());
    }

    #[tokio::test]
    async fn unknown_country_never_reaches_the_model() {
        let (mut explorer, handle) = explorer(vec![]);
        let err = explorer.explore("Atlantis").await.unwrap_err();
        assert!(matches!(err, ResolutionError::UnknownSubject(ref c) if c == "Atlantis"));
        assert_eq!(handle.call_count(), 0);
    }

    #[test]
    fn neighbors_are_paired_with_known_flags() {
        let (explorer, _handle) = explorer(vec![]);
        let data: CountryData = serde_json::from_value(sample(&["Argentina", "Peru"])).unwrap();
        assert!(explorer.neighbors_with_flags(&data).is_empty());

        let data: CountryData = serde_json::from_value(sample(&["Russia", "Peru"])).unwrap();
        assert_eq!(
            explorer.neighbors_with_flags(&data),
            vec![("Russia".to_string(), "https://flagcdn.com/w320/ru.png".to_string())]
        );
    }

    #[test]
    fn schema_uses_wire_names() {
        let schema = crate::core::schema_value::<CountryData>().to_string();
        assert!(schema.contains("internetTLD"));
        assert!(schema.contains("neighboringCountries"));
    }
}
