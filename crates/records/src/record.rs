use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A placement that did not make it into an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipNote {
    pub index: usize,
    pub label: String,
    pub reason: String,
}

/// Written next to each composite/mask pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub timestamp: String,
    pub living_room: String,
    pub furniture_count: usize,
    pub composite_image: String,
    pub mask_image: String,
    /// Placements exactly as submitted.
    pub furniture_details: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkipNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_blake3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_size: Option<[u32; 2]>,
}

/// Written next to each pure mask / annotated scene pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeRecord {
    pub timestamp: String,
    pub background: String,
    pub pure_mask_image: String,
    pub annotated_image: String,
    pub painted_pixels: u64,
    pub total_pixels: u64,
    pub mean_alpha: f64,
    pub most_common_alpha: Option<u8>,
    pub transparency_percentage: f64,
    pub stroke_resized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_blake3: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generation_record_keeps_client_keys() {
        let record = GenerationRecord {
            timestamp: "2024-03-09T07:05:01".into(),
            living_room: "room.jpg".into(),
            furniture_count: 1,
            composite_image: "composite_20240309_070501.jpg".into(),
            mask_image: "mask_20240309_070501.jpg".into(),
            furniture_details: json!([{ "name": "sofa.png", "x": 10 }]),
            skipped: Vec::new(),
            background_blake3: None,
            normalized_size: Some([933, 700]),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["living_room"], "room.jpg");
        assert_eq!(value["furniture_details"][0]["name"], "sofa.png");
        assert_eq!(value["normalized_size"], json!([933, 700]));
        assert!(value.get("skipped").is_none());
        assert!(value.get("background_blake3").is_none());

        let back: GenerationRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
