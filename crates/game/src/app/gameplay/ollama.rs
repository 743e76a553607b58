use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::config::GeneratorConfig;
use super::reply::{GeneratorError, ResponseGenerator};

const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Blocking client for an Ollama-compatible `/api/generate` endpoint.
pub(crate) struct OllamaGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaGenerator {
    pub(crate) fn new(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(GeneratorError::transport)?;
        Ok(Self {
            client,
            endpoint: generate_endpoint(&config.base_url),
            model: config.model.clone(),
        })
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ResponseGenerator for OllamaGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(GeneratorError::transport)?;
        let status = response.status();
        let body = response.text().map_err(GeneratorError::transport)?;
        if !status.is_success() {
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }
        decode_generate_response(&body)
    }
}

fn generate_endpoint(base_url: &str) -> String {
    format!("{}/api/generate", base_url.trim_end_matches('/'))
}

fn decode_generate_response(body: &str) -> Result<String, GeneratorError> {
    let mut deserializer = serde_json::Deserializer::from_str(body);
    match serde_path_to_error::deserialize::<_, GenerateResponse>(&mut deserializer) {
        Ok(parsed) => Ok(parsed.response),
        Err(error) => {
            let path = error.path().to_string();
            Err(GeneratorError::Decode {
                path,
                message: error.into_inner().to_string(),
            })
        }
    }
}
