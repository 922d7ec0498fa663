//! Secret payloads returned by read and list operations.

// self
use crate::_prelude::*;

/// Secret data plus the lease metadata the service attached to it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Lease {
	/// Request identifier assigned by the service.
	#[serde(default)]
	pub request_id: String,
	/// Lease identifier; empty for non-leased secrets.
	#[serde(default)]
	pub lease_id: String,
	/// Lease duration in seconds.
	#[serde(default)]
	pub lease_duration: u64,
	/// Whether the lease can be renewed.
	#[serde(default)]
	pub renewable: bool,
	#[serde(default, deserialize_with = "null_as_empty")]
	data: serde_json::Map<String, serde_json::Value>,
}
impl Lease {
	/// Returns the value stored under `key`.
	pub fn value(&self, key: &str) -> Result<&serde_json::Value> {
		self.data.get(key).ok_or_else(|| Error::MissingLeaseKey { key: key.to_owned() })
	}

	/// Returns a copy of the secret data.
	pub fn data(&self) -> serde_json::Map<String, serde_json::Value> {
		self.data.clone()
	}

	/// Lease duration as a [`Duration`].
	pub fn duration(&self) -> Duration {
		Duration::seconds(self.lease_duration.try_into().unwrap_or(i64::MAX))
	}

	/// Whether the lease can be renewed.
	pub fn is_renewable(&self) -> bool {
		self.renewable
	}
}

fn null_as_empty<'de, D>(
	deserializer: D,
) -> Result<serde_json::Map<String, serde_json::Value>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}
