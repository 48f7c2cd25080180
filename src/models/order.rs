use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Coordinates([String; 2]);

impl Coordinates {
    pub fn new(lat: String, lon: String) -> Self {
        Self([lat, lon])
    }

    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Unassigned,
    Taken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub origin: Coordinates,
    pub destination: Coordinates,
    /// Meters.
    pub distance: u32,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Uuid,
    pub origin: Coordinates,
    pub destination: Coordinates,
    pub distance: u32,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub distance: u32,
    pub status: OrderStatus,
}

impl From<&OrderRecord> for OrderSummary {
    fn from(record: &OrderRecord) -> Self {
        Self {
            id: record.id,
            distance: record.distance,
            status: record.status.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TakeReceipt {
    pub status: &'static str,
}

impl TakeReceipt {
    pub fn success() -> Self {
        Self { status: "SUCCESS" }
    }
}
