use crate::api::ModelsResponse;
use crate::utils::url::construct_api_url;

/// List the models served at `base_url`. Local servers usually need no key.
pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
    api_key: Option<&str>,
) -> Result<ModelsResponse, Box<dyn std::error::Error + Send + Sync>> {
    let models_url = construct_api_url(base_url, "models");
    let mut request = client
        .get(models_url)
        .header("Content-Type", "application/json");

    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(format!("API request failed with status {status}: {error_text}").into());
    }

    let models_response = response.json::<ModelsResponse>().await?;
    Ok(models_response)
}

/// Whether `wanted` is among the served models. Servers that host a single
/// unnamed model (llama.cpp) may report any id, so an empty `wanted` or a
/// single-entry list counts as a match.
pub fn serves_model(models: &ModelsResponse, wanted: &str) -> bool {
    if wanted.is_empty() || models.data.len() == 1 {
        return !models.data.is_empty();
    }
    models.data.iter().any(|m| m.id == wanted)
}
