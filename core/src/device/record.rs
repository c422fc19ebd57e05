use super::reading::{DeviceId, DeviceReading, DeviceRole};
use crate::prelude::RecordError;
use serde::{Deserialize, Serialize};

/// Device snapshot as exchanged with the positioning backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub address: DeviceId,
    pub is_hedge: bool,
    pub x: f64,
    pub y: f64,
    pub q: u8,
}

impl From<DeviceRecord> for DeviceReading {
    fn from(record: DeviceRecord) -> Self {
        DeviceReading::new(
            record.address,
            DeviceRole::from_hedge_flag(record.is_hedge),
            record.x,
            record.y,
            record.q.min(100),
        )
    }
}

impl From<&DeviceReading> for DeviceRecord {
    fn from(reading: &DeviceReading) -> Self {
        Self {
            address: reading.id,
            is_hedge: reading.role.is_hedge(),
            x: reading.position.x,
            y: reading.position.y,
            q: reading.quality,
        }
    }
}

/// Parses a JSON array of device records. Records with non-finite
/// coordinates are dropped.
pub fn decode_batch(body: &[u8]) -> Result<Vec<DeviceReading>, RecordError> {
    let records: Vec<DeviceRecord> = serde_json::from_slice(body)?;
    Ok(records
        .into_iter()
        .map(DeviceReading::from)
        .filter(|reading| reading.position.is_finite())
        .collect())
}

pub fn encode_batch(readings: &[DeviceReading]) -> Result<Vec<u8>, RecordError> {
    let records: Vec<DeviceRecord> = readings.iter().map(DeviceRecord::from).collect();
    Ok(serde_json::to_vec(&records)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_field_names() {
        let body = br#"[{"address":7,"is_hedge":true,"x":1.5,"y":-2.0,"q":80},
                        {"address":2,"is_hedge":false,"x":0.0,"y":0.0,"q":100}]"#;
        let readings = decode_batch(body).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0], DeviceReading::tag(7, 1.5, -2.0, 80));
        assert_eq!(readings[1].role, DeviceRole::Anchor);
    }

    #[test]
    fn quality_above_scale_is_capped() {
        let body = br#"[{"address":1,"is_hedge":true,"x":0.0,"y":0.0,"q":250}]"#;
        assert_eq!(decode_batch(body).unwrap()[0].quality, 100);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(matches!(
            decode_batch(b"{not json"),
            Err(RecordError::Json(_))
        ));
    }

    #[test]
    fn encoded_batch_uses_backend_names() {
        let body = encode_batch(&[DeviceReading::anchor(3, 1.0, 2.0, 90)]).unwrap();
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("\"address\":3"));
        assert!(text.contains("\"is_hedge\":false"));
    }
}
