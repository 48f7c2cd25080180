use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::order::Coordinates;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum DistanceError {
    /// Any missing or partial field in the upstream response shape.
    #[error("unable to get proper data from distance API")]
    MalformedResponse,

    /// Connect/send failure or a non-success status, message preserved.
    #[error("{0}")]
    Transport(String),
}

#[async_trait]
pub trait DistanceProvider: Send + Sync {
    async fn distance_meters(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<u32, DistanceError>;
}

// The distance-matrix response, `rows[0].elements[0].distance.value`. Every
// level is optional so a partial body folds into one malformed-response
// error instead of surfacing as a deserialization failure.
#[derive(Deserialize)]
struct MatrixResponse {
    rows: Option<Vec<MatrixRow>>,
}

#[derive(Deserialize)]
struct MatrixRow {
    elements: Option<Vec<MatrixElement>>,
}

#[derive(Deserialize)]
struct MatrixElement {
    distance: Option<MatrixDistance>,
}

#[derive(Deserialize)]
struct MatrixDistance {
    value: Option<u32>,
}

impl MatrixResponse {
    fn first_distance(&self) -> Option<u32> {
        self.rows
            .as_ref()?
            .first()?
            .elements
            .as_ref()?
            .first()?
            .distance
            .as_ref()?
            .value
    }
}

/// Client for a distance-matrix style HTTP API. No retries: one failed call
/// fails the operation that needed the distance.
pub struct DistanceMatrixClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DistanceMatrixClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("valid http client");

        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl DistanceProvider for DistanceMatrixClient {
    async fn distance_meters(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<u32, DistanceError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("origins", origin.joined()),
                ("destinations", destination.joined()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|err| DistanceError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| DistanceError::Transport(err.to_string()))?;

        let matrix: MatrixResponse = response.json().await.map_err(|err| {
            if err.is_decode() {
                DistanceError::MalformedResponse
            } else {
                DistanceError::Transport(err.to_string())
            }
        })?;

        matrix
            .first_distance()
            .ok_or(DistanceError::MalformedResponse)
    }
}
