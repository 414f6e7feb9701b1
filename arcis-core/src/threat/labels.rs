//! Detector label mapping
//!
//! Edge devices report YOLO class ids and free-form labels. Only weapon
//! labels map to an [`ObjectType`]; everything else is `None`.

use super::types::ObjectType;

/// YOLO class id table of the deployed weapon model
const CLASS_IDS: [(u64, ObjectType); 4] = [
    (0, ObjectType::Weapon),
    (1, ObjectType::Pistol),
    (2, ObjectType::Rifle),
    (3, ObjectType::Knife),
];

/// Lowercase label aliases
const LABEL_ALIASES: [(&str, ObjectType); 8] = [
    ("weapon", ObjectType::Weapon),
    ("pistol", ObjectType::Pistol),
    ("gun", ObjectType::Pistol),
    ("firearm", ObjectType::Pistol),
    ("rifle", ObjectType::Rifle),
    ("knife", ObjectType::Knife),
    ("blade", ObjectType::Knife),
    ("sword", ObjectType::Knife),
];

/// Substring rules for Cloud Vision descriptions, checked in order
const VISION_KEYWORDS: [(&[&str], ObjectType); 4] = [
    (&["pistol", "handgun", "gun"], ObjectType::Pistol),
    (&["rifle", "assault"], ObjectType::Rifle),
    (&["knife", "blade", "sword"], ObjectType::Knife),
    (&["weapon", "firearm"], ObjectType::Weapon),
];

impl ObjectType {
    pub fn from_class_id(class_id: u64) -> Option<Self> {
        CLASS_IDS
            .iter()
            .find(|(id, _)| *id == class_id)
            .map(|(_, t)| *t)
    }

    /// Case-insensitive alias lookup
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        LABEL_ALIASES
            .iter()
            .find(|(alias, _)| *alias == label)
            .map(|(_, t)| *t)
    }

    /// Map one detector output.
    ///
    /// A numeric class id wins; otherwise the textual class, then the label.
    pub fn from_detector(class_id: Option<u64>, class_name: Option<&str>, label: Option<&str>) -> Option<Self> {
        if let Some(t) = class_id.and_then(Self::from_class_id) {
            return Some(t);
        }
        class_name
            .and_then(Self::from_label)
            .or_else(|| label.and_then(Self::from_label))
    }

    /// Map a Cloud Vision object description by keyword.
    ///
    /// Descriptions are free text ("Handgun", "Assault rifle"), so this
    /// matches substrings rather than whole labels.
    pub fn from_cloud_vision(description: &str) -> Option<Self> {
        let description = description.to_ascii_lowercase();
        VISION_KEYWORDS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| description.contains(k)))
            .map(|(_, t)| *t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_ids() {
        assert_eq!(ObjectType::from_class_id(0), Some(ObjectType::Weapon));
        assert_eq!(ObjectType::from_class_id(1), Some(ObjectType::Pistol));
        assert_eq!(ObjectType::from_class_id(2), Some(ObjectType::Rifle));
        assert_eq!(ObjectType::from_class_id(3), Some(ObjectType::Knife));
        assert_eq!(ObjectType::from_class_id(4), None);
    }

    #[test]
    fn test_label_aliases() {
        assert_eq!(ObjectType::from_label("GUN"), Some(ObjectType::Pistol));
        assert_eq!(ObjectType::from_label("Firearm"), Some(ObjectType::Pistol));
        assert_eq!(ObjectType::from_label(" sword "), Some(ObjectType::Knife));
        assert_eq!(ObjectType::from_label("Rifle"), Some(ObjectType::Rifle));
        assert_eq!(ObjectType::from_label("person"), None);
        assert_eq!(ObjectType::from_label(""), None);
    }

    #[test]
    fn test_detector_precedence() {
        assert_eq!(
            ObjectType::from_detector(Some(2), Some("knife"), None),
            Some(ObjectType::Rifle)
        );
        // unknown id falls back to the names
        assert_eq!(
            ObjectType::from_detector(Some(17), None, Some("blade")),
            Some(ObjectType::Knife)
        );
        assert_eq!(
            ObjectType::from_detector(None, Some("person"), Some("pistol")),
            Some(ObjectType::Pistol)
        );
        assert_eq!(ObjectType::from_detector(None, Some("person"), Some("car")), None);
    }

    #[test]
    fn test_cloud_vision_keywords() {
        assert_eq!(ObjectType::from_cloud_vision("Handgun"), Some(ObjectType::Pistol));
        assert_eq!(ObjectType::from_cloud_vision("Assault rifle"), Some(ObjectType::Rifle));
        assert_eq!(ObjectType::from_cloud_vision("Kitchen knife"), Some(ObjectType::Knife));
        assert_eq!(ObjectType::from_cloud_vision("Cold weapon"), Some(ObjectType::Weapon));
        assert_eq!(ObjectType::from_cloud_vision("Firearm"), Some(ObjectType::Weapon));
        // "gun" is checked first
        assert_eq!(ObjectType::from_cloud_vision("Gun barrel rifle"), Some(ObjectType::Pistol));
        assert_eq!(ObjectType::from_cloud_vision("Backpack"), None);
    }
}
